use std::io;

/// Errors that can occur in socket operations.
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    /// Failed to set up a listening socket (bind/listen/non-blocking mode).
    #[error("failed to prepare listening socket ({op}): {source}")]
    PassivePrepare { op: &'static str, source: io::Error },

    /// Failed to set up a client socket (connect/non-blocking mode).
    #[error("failed to prepare client socket ({op}): {source}")]
    ActivePrepare { op: &'static str, source: io::Error },

    /// Host-name resolution failed.
    #[error("failed to resolve host {host:?}: {source}")]
    Resolve { host: String, source: io::Error },

    /// The host resolved, but to no IPv4 address.
    #[error("host {host:?} has no IPv4 address")]
    BadHostname { host: String },

    /// Read/write/shutdown failed on an established connection.
    #[error("transport failure during {op}: {source}")]
    Transport { op: &'static str, source: io::Error },

    /// The peer declared a message larger than the codec allows.
    #[error("incoming message of {declared} bytes exceeds limit of {max} bytes")]
    OversizedMessage { declared: usize, max: usize },

    /// The cooperative stop predicate requested cancellation.
    #[error("operation stopped by caller")]
    UserStop,
}

pub type Result<T> = std::result::Result<T, SocketError>;
