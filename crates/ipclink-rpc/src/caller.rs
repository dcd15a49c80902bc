use ipclink_message::{InMessage, OutMessage, WireValue};
use ipclink_socket::{Endpoint, PointToPoint, SocketError};
use tracing::debug;

use crate::error::{Result, RpcError};
use crate::DONE_TAG;

/// Serves callback requests arriving while a call is outstanding.
///
/// Receives the callback id and the partly-consumed incoming message (the
/// id is already extracted); must leave the reply in the out message and
/// return `Ok(true)`, or `Ok(false)` for an unrecognized id.
pub type CallbackDispatcher<'a> =
    dyn FnMut(u32, &mut InMessage, &mut OutMessage) -> Result<bool> + 'a;

/// Originate a call over a fresh connection to `endpoint`.
///
/// The connection is dropped (client closes first) when the call completes.
pub fn call_by_link<Args, R, D, P>(
    endpoint: &Endpoint,
    id: u32,
    dispatch: D,
    keep_going: &P,
    args: Args,
) -> Result<R>
where
    Args: WireValue,
    R: WireValue,
    D: FnMut(u32, &mut InMessage, &mut OutMessage) -> Result<bool>,
    P: Fn() -> bool,
{
    let mut socket = endpoint.connect()?;
    let mut input = InMessage::new();
    let mut output = OutMessage::new();
    call_by_channel(&mut socket, &mut input, &mut output, id, dispatch, keep_going, args)
}

/// Originate a call over an existing connection.
///
/// This is also how a service fetches arguments through reverse callbacks
/// while serving a request: it reuses the connection its own request arrived
/// on, with scratch messages of its own.
///
/// Protocol: send `[id, args…]`, then loop reading messages. A first field
/// equal to [`DONE_TAG`] carries the return value and ends the call; any
/// other first field is a callback request handed to `dispatch`, whose reply
/// is written straight back on the same socket. Callback requests and
/// replies are strictly interleaved — this side never writes two replies
/// without an intervening request.
pub fn call_by_channel<Args, R, D, P>(
    socket: &mut PointToPoint,
    input: &mut InMessage,
    output: &mut OutMessage,
    id: u32,
    mut dispatch: D,
    keep_going: &P,
    args: Args,
) -> Result<R>
where
    Args: WireValue,
    R: WireValue,
    D: FnMut(u32, &mut InMessage, &mut OutMessage) -> Result<bool>,
    P: Fn() -> bool,
{
    output.clear();
    output.append_u32(id)?;
    args.append(output)?;
    if !socket.write_message(output, keep_going)? {
        return Err(SocketError::UserStop.into());
    }

    loop {
        if !socket.read_message(input, keep_going)? {
            return Err(SocketError::UserStop.into());
        }

        let head = input.extract_u32()?;
        if head == DONE_TAG {
            return Ok(R::extract(input)?);
        }

        debug!(callback = head, "serving reverse callback");
        if !dispatch(head, input, output)? {
            return Err(RpcError::UnknownCallback { id: head });
        }
        if !socket.write_message(output, keep_going)? {
            return Err(SocketError::UserStop.into());
        }
    }
}

/// A dispatcher for callers that serve no callbacks: rejects every id, which
/// turns any callback request into [`RpcError::UnknownCallback`].
pub fn no_callbacks(_id: u32, _input: &mut InMessage, _output: &mut OutMessage) -> Result<bool> {
    Ok(false)
}
