/// Errors that can occur while building or walking a message.
///
/// Every variant names the failing operation; size mismatches carry the
/// required and available/limit byte counts.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// Operation attempted on a message whose sticky fail flag is set.
    #[error("{op}: fail flag is set")]
    BadMessage { op: &'static str },

    /// An append would push the message past its maximum size.
    #[error("{op}: required space {required} exceeds limit of {limit} bytes")]
    MessageOverflow {
        op: &'static str,
        required: usize,
        limit: usize,
    },

    /// An extract would read past the header-declared message length.
    #[error("{op}: required space {required} exceeds message length of {available} bytes")]
    MessageTooShort {
        op: &'static str,
        required: usize,
        available: usize,
    },

    /// The extract target is smaller than the on-wire field.
    #[error("{op}: required space {required} exceeds container limit of {limit} bytes")]
    ContainerOverflow {
        op: &'static str,
        required: usize,
        limit: usize,
    },

    /// A string field has no terminating zero within the declared remainder.
    #[error("{op}: terminating zero not found")]
    UnterminatedString { op: &'static str },

    /// The on-wire type tag differs from the expected one (`tags` feature).
    #[error("{op}: data type mismatch (got {got}, expected {expected})")]
    TypeMismatch {
        op: &'static str,
        got: &'static str,
        expected: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, MessageError>;
