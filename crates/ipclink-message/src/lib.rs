//! Length-prefixed, tagged message codec for IPC.
//!
//! This is the serialization layer of ipclink. Every message is a contiguous
//! byte buffer whose leading bytes are a little-endian length prefix counting
//! the whole message, header included:
//!
//! ```text
//! ┌─────────────┬───────────────────────────────┐
//! │ Length (LE) │ Field*                         │
//! │ L bytes     │ [tag:1] payload  (per field)   │
//! └─────────────┴───────────────────────────────┘
//! ```
//!
//! `L` is 2 by default (messages up to 65,535 bytes) and 4 with the
//! `wide-length` feature. With the default `tags` feature every field carries
//! a one-byte type tag and extraction verifies it; without it the framing is
//! positional and both peers must agree on the schema out of band.

pub mod error;
pub mod reader;
pub mod tag;
pub mod value;
pub mod writer;

pub use error::{MessageError, Result};
pub use reader::InMessage;
pub use tag::TypeTag;
pub use value::{RemotePtr, WireValue};
pub use writer::OutMessage;

/// Width type of the message length header.
#[cfg(not(feature = "wide-length"))]
pub type LengthField = u16;
/// Width type of the message length header.
#[cfg(feature = "wide-length")]
pub type LengthField = u32;

/// Byte width of the length header (and of blob length fields).
pub const LENGTH_SIZE: usize = std::mem::size_of::<LengthField>();

/// Maximum total message size, header included.
pub const MAX_MESSAGE_SIZE: usize = LengthField::MAX as usize;

/// Bytes a type tag occupies in front of each field payload.
pub const TAG_SIZE: usize = if cfg!(feature = "tags") { 1 } else { 0 };
