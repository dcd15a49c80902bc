use bytes::{BufMut, BytesMut};

use crate::error::{MessageError, Result};
use crate::tag::TypeTag;
use crate::value::{RemotePtr, WireValue};
use crate::{LengthField, LENGTH_SIZE, MAX_MESSAGE_SIZE, TAG_SIZE};

const INITIAL_CAPACITY: usize = 256;

/// Append-only message builder.
///
/// Owns a contiguous buffer whose first [`LENGTH_SIZE`] bytes are the live
/// length prefix; the prefix is rewritten after every successful append, so
/// the buffer is ready to transmit at all times.
///
/// A failed append (overflow, or use after a failure) sets a sticky fail
/// flag; every later operation short-circuits with
/// [`MessageError::BadMessage`] until [`OutMessage::clear`] is called. An
/// append that fails leaves the buffer byte-identical to before the attempt.
pub struct OutMessage {
    buf: BytesMut,
    ok: bool,
}

impl OutMessage {
    /// Create an empty message (header only).
    pub fn new() -> Self {
        let mut msg = Self {
            buf: BytesMut::with_capacity(INITIAL_CAPACITY),
            ok: true,
        };
        msg.buf.resize(LENGTH_SIZE, 0);
        msg.write_header();
        msg
    }

    /// Reset to an empty message and clear the fail flag.
    pub fn clear(&mut self) {
        self.buf.truncate(0);
        self.buf.resize(LENGTH_SIZE, 0);
        self.write_header();
        self.ok = true;
    }

    /// The wire bytes, header included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Total message length in bytes, header included.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True when no field has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.buf.len() == LENGTH_SIZE
    }

    /// Append any wire-serializable value.
    pub fn append<T: WireValue>(&mut self, value: &T) -> Result<()> {
        value.append(self)
    }

    pub fn append_u32(&mut self, value: u32) -> Result<()> {
        self.append_scalar("append_u32", TypeTag::U32, &value.to_le_bytes())
    }

    pub fn append_i32(&mut self, value: i32) -> Result<()> {
        self.append_scalar("append_i32", TypeTag::I32, &value.to_le_bytes())
    }

    pub fn append_u64(&mut self, value: u64) -> Result<()> {
        self.append_scalar("append_u64", TypeTag::U64, &value.to_le_bytes())
    }

    pub fn append_i64(&mut self, value: i64) -> Result<()> {
        self.append_scalar("append_i64", TypeTag::I64, &value.to_le_bytes())
    }

    pub fn append_f64(&mut self, value: f64) -> Result<()> {
        self.append_scalar("append_f64", TypeTag::Fp64, &value.to_le_bytes())
    }

    /// Append a single character byte.
    pub fn append_chr(&mut self, value: u8) -> Result<()> {
        self.append_scalar("append_chr", TypeTag::Chr, &[value])
    }

    /// Append an opaque remote handle.
    pub fn append_remote_ptr(&mut self, value: RemotePtr) -> Result<()> {
        self.append_scalar("append_remote_ptr", TypeTag::RemotePtr, &value.raw().to_le_bytes())
    }

    /// Append a string field: the input bytes followed by a terminating zero.
    ///
    /// The input need not be NUL-terminated; one terminator is always added.
    /// An embedded NUL is written as-is, but extraction stops at the first
    /// zero byte, so everything past it is silently truncated on the reader
    /// side.
    pub fn append_str(&mut self, value: &str) -> Result<()> {
        let bytes = value.as_bytes();
        self.guard("append_str", TAG_SIZE + bytes.len() + 1)?;
        self.put_tag(TypeTag::Str);
        self.buf.put_slice(bytes);
        self.buf.put_u8(0);
        self.write_header();
        Ok(())
    }

    /// Append a binary field: an `L`-byte length followed by the raw bytes.
    pub fn append_blob(&mut self, value: &[u8]) -> Result<()> {
        self.guard("append_blob", TAG_SIZE + LENGTH_SIZE + value.len())?;
        self.put_tag(TypeTag::Blob);
        self.buf
            .put_slice(&(value.len() as LengthField).to_le_bytes());
        self.buf.put_slice(value);
        self.write_header();
        Ok(())
    }

    fn append_scalar(&mut self, op: &'static str, tag: TypeTag, payload: &[u8]) -> Result<()> {
        self.guard(op, TAG_SIZE + payload.len())?;
        self.put_tag(tag);
        self.buf.put_slice(payload);
        self.write_header();
        Ok(())
    }

    fn guard(&mut self, op: &'static str, field_cost: usize) -> Result<()> {
        if !self.ok {
            return Err(MessageError::BadMessage { op });
        }
        let required = self.buf.len() + field_cost;
        if required > MAX_MESSAGE_SIZE {
            self.ok = false;
            return Err(MessageError::MessageOverflow {
                op,
                required,
                limit: MAX_MESSAGE_SIZE,
            });
        }
        Ok(())
    }

    fn put_tag(&mut self, tag: TypeTag) {
        #[cfg(feature = "tags")]
        self.buf.put_u8(tag as u8);
        #[cfg(not(feature = "tags"))]
        let _ = tag;
    }

    fn write_header(&mut self) {
        let len = self.buf.len() as LengthField;
        self.buf[..LENGTH_SIZE].copy_from_slice(&len.to_le_bytes());
    }
}

impl Default for OutMessage {
    fn default() -> Self {
        Self::new()
    }
}
