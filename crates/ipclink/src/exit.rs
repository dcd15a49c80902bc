use std::fmt;

use ipclink_message::MessageError;
use ipclink_rpc::RpcError;
use ipclink_socket::SocketError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PROTOCOL_ERROR: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn socket_error(context: &str, err: SocketError) -> CliError {
    let code = match &err {
        SocketError::Transport { .. } | SocketError::OversizedMessage { .. } => TRANSPORT_ERROR,
        SocketError::PassivePrepare { .. } | SocketError::ActivePrepare { .. } => FAILURE,
        SocketError::Resolve { .. } | SocketError::BadHostname { .. } => USAGE,
        SocketError::UserStop => SUCCESS,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn message_error(context: &str, err: MessageError) -> CliError {
    CliError::new(PROTOCOL_ERROR, format!("{context}: {err}"))
}

pub fn rpc_error(context: &str, err: RpcError) -> CliError {
    match err {
        RpcError::Socket(err) => socket_error(context, err),
        RpcError::Message(err) => message_error(context, err),
        other @ RpcError::UnknownCallback { .. } => {
            CliError::new(PROTOCOL_ERROR, format!("{context}: {other}"))
        }
    }
}
