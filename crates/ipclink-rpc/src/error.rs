use ipclink_message::MessageError;
use ipclink_socket::SocketError;

/// Errors that can occur while making or serving RPC calls.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Codec failure while marshalling a request, reply or callback.
    #[error(transparent)]
    Message(#[from] MessageError),

    /// Socket failure (or cooperative stop) underneath the call.
    #[error(transparent)]
    Socket(#[from] SocketError),

    /// The peer sent a callback id the dispatcher does not recognize.
    #[error("no callback handler for function id {id:#010x}")]
    UnknownCallback { id: u32 },
}

impl RpcError {
    /// True when this error is the cooperative stop predicate unwinding,
    /// which server loops treat as a clean exit rather than a failure.
    pub fn is_user_stop(&self) -> bool {
        matches!(self, RpcError::Socket(SocketError::UserStop))
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_stop_is_recognized_through_the_socket_layer() {
        let err = RpcError::from(SocketError::UserStop);
        assert!(err.is_user_stop());

        let err = RpcError::UnknownCallback { id: 7 };
        assert!(!err.is_user_stop());
    }
}
