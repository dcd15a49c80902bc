#[cfg(unix)]
use std::path::Path;

use ipclink_message::{InMessage, OutMessage};
use ipclink_socket::{PointToPoint, ServerSocket, SocketError};
use tracing::debug;

use crate::error::{Result, RpcError};

/// Server-side collaborator: routes function ids to implementations.
///
/// The core owns no handler registry — `invoke` is expected to switch on the
/// numeric id (typically selecting a [`crate::FunctionInvoker`] per
/// function) and leave the reply in `output`. The socket is handed in so a
/// service can originate reverse callbacks on the same connection via
/// [`crate::call_by_channel`] while it runs.
pub trait Dispatcher {
    /// Serve one request. `input` is positioned after the function id.
    fn invoke(
        &self,
        id: u32,
        input: &mut InMessage,
        output: &mut OutMessage,
        socket: &mut PointToPoint,
    ) -> Result<()>;

    /// Called with every per-connection failure; the loop then moves on to
    /// the next connection.
    fn report_error(&self, error: &RpcError);

    /// Called once, after the listening socket is ready to accept.
    fn ready(&self) {}
}

/// Long-running accept-serve loop.
///
/// Connections are served sequentially: one top-level request each, plus any
/// reverse callbacks the service initiates while handling it. Horizontal
/// scaling is the caller's concern — run more servers.
pub struct RpcServer {
    socket: ServerSocket,
}

impl RpcServer {
    /// Listen on an IPv4 TCP port.
    pub fn bind_tcp(port: u16) -> Result<Self> {
        Ok(Self {
            socket: ServerSocket::bind_tcp(port)?,
        })
    }

    /// Listen on a Unix-domain socket path.
    #[cfg(unix)]
    pub fn bind_unix(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            socket: ServerSocket::bind_unix(path)?,
        })
    }

    /// Wrap an already-bound listening socket.
    pub fn from_socket(socket: ServerSocket) -> Self {
        Self { socket }
    }

    /// The underlying listener, e.g. to learn an OS-assigned TCP port.
    pub fn socket(&self) -> &ServerSocket {
        &self.socket
    }

    /// Run until the predicate turns false.
    ///
    /// Per connection: read the request, extract the function id, hand off
    /// to the dispatcher, send the reply, then drain until the client closes
    /// (so TIME_WAIT lands client-side). Any error inside that block goes to
    /// [`Dispatcher::report_error`] and the loop continues; the cooperative
    /// stop unwinds as a clean `Ok(())` from wherever it strikes.
    pub fn run<D: Dispatcher, P: Fn() -> bool>(&self, dispatcher: &D, keep_going: &P) -> Result<()> {
        dispatcher.ready();

        let mut input = InMessage::new();
        let mut output = OutMessage::new();
        loop {
            let mut connection = match self.socket.accept(keep_going) {
                Ok(connection) => connection,
                Err(SocketError::UserStop) => {
                    debug!("rpc server stopped");
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            };

            match serve_connection(&mut connection, dispatcher, keep_going, &mut input, &mut output)
            {
                Ok(()) => {}
                Err(err) if err.is_user_stop() => {
                    debug!("rpc server stopped");
                    return Ok(());
                }
                Err(err) => dispatcher.report_error(&err),
            }
            connection.close();
        }
    }
}

fn serve_connection<D: Dispatcher, P: Fn() -> bool>(
    connection: &mut PointToPoint,
    dispatcher: &D,
    keep_going: &P,
    input: &mut InMessage,
    output: &mut OutMessage,
) -> Result<()> {
    if !connection.read_message(input, keep_going)? {
        return Err(SocketError::UserStop.into());
    }

    let id = input.extract_u32()?;
    debug!(id, "serving request");
    dispatcher.invoke(id, input, output, connection)?;

    if !connection.write_message(output, keep_going)? {
        return Err(SocketError::UserStop.into());
    }
    if !connection.wait_for_shutdown(keep_going)? {
        return Err(SocketError::UserStop.into());
    }
    Ok(())
}
