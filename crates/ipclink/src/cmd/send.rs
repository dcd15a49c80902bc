use ipclink_message::{InMessage, OutMessage};

use crate::cmd::{parse_endpoint, SendArgs};
use crate::exit::{message_error, socket_error, CliError, CliResult, SUCCESS, TRANSPORT_ERROR};
use crate::output::{print_reply, OutputFormat};

/// Send one string message and print the server's reply.
pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let endpoint = parse_endpoint(&args.address)?;
    let mut socket = endpoint
        .connect()
        .map_err(|err| socket_error("connect failed", err))?;

    let keep_going = || true;

    let mut output = OutMessage::new();
    output
        .append_str(&args.text)
        .map_err(|err| message_error("build request", err))?;
    if !socket
        .write_message(&output, &keep_going)
        .map_err(|err| socket_error("send failed", err))?
    {
        return Err(CliError::new(TRANSPORT_ERROR, "send cancelled"));
    }

    let mut input = InMessage::new();
    if !socket
        .read_message(&mut input, &keep_going)
        .map_err(|err| socket_error("receive failed", err))?
    {
        return Err(CliError::new(TRANSPORT_ERROR, "receive cancelled"));
    }
    let reply = input
        .extract_str()
        .map_err(|err| message_error("read reply", err))?;

    print_reply(&reply, format);
    Ok(SUCCESS)
}
