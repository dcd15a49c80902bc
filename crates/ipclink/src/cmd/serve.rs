use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ipclink_message::{InMessage, OutMessage};
use ipclink_socket::{PointToPoint, SocketError};
use tracing::{info, warn};

use crate::cmd::{bind_server, install_ctrlc_handler, ServeArgs};
use crate::exit::{socket_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

/// Echo message server: replies to every string request with
/// `"<text> processed"`.
pub fn run(args: ServeArgs, _format: OutputFormat) -> CliResult<i32> {
    let listener = bind_server(&args.address)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(Arc::clone(&running))?;
    let keep_going = || running.load(Ordering::SeqCst);

    info!(address = %args.address, "echo server ready");
    loop {
        let mut connection = match listener.accept(&keep_going) {
            Ok(connection) => connection,
            Err(SocketError::UserStop) => break,
            Err(err) => return Err(socket_error("accept failed", err)),
        };

        match serve_connection(&mut connection, &keep_going) {
            Ok(true) => {}
            Ok(false) => break, // stop request mid-connection
            Err(err) => warn!(error = %err, "request failed"),
        }
        connection.close();
    }

    info!("echo server stopped");
    Ok(SUCCESS)
}

/// Returns `Ok(false)` when the stop predicate interrupted the exchange.
fn serve_connection<P: Fn() -> bool>(
    connection: &mut PointToPoint,
    keep_going: &P,
) -> Result<bool, Box<dyn std::error::Error>> {
    let mut input = InMessage::new();
    if !connection.read_message(&mut input, keep_going)? {
        return Ok(false);
    }
    let text = input.extract_str()?;

    let mut output = OutMessage::new();
    output.append_str(&format!("{text} processed"))?;
    if !connection.write_message(&output, keep_going)? {
        return Ok(false);
    }

    // Let the client close first so TIME_WAIT lands on its side.
    Ok(connection.wait_for_shutdown(keep_going)?)
}
