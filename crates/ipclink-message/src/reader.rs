use bytes::BytesMut;

use crate::error::{MessageError, Result};
use crate::tag::TypeTag;
use crate::value::{RemotePtr, WireValue};
use crate::{LengthField, LENGTH_SIZE, TAG_SIZE};

/// Cursor-based message reader.
///
/// Walks a received buffer field by field. The cursor never advances past the
/// header-declared length, and every extraction validates the remaining space
/// (and, with the `tags` feature, the field's type tag) before consuming
/// anything.
///
/// Failures set a sticky fail flag, mirroring [`crate::OutMessage`]: once an
/// extraction has failed the message is considered corrupt and every later
/// operation returns [`MessageError::BadMessage`] until [`InMessage::reset`].
pub struct InMessage {
    buf: BytesMut,
    offset: usize,
    ok: bool,
}

impl InMessage {
    /// Create an empty message.
    pub fn new() -> Self {
        let mut msg = Self {
            buf: BytesMut::new(),
            offset: LENGTH_SIZE,
            ok: true,
        };
        msg.reset();
        msg
    }

    /// Build a reader over a complete wire message (header included).
    ///
    /// Inputs shorter than a header fall back to an empty message.
    pub fn from_bytes(wire: impl AsRef<[u8]>) -> Self {
        let mut msg = Self::new();
        let wire = wire.as_ref();
        if wire.len() >= LENGTH_SIZE {
            msg.buf.clear();
            msg.buf.extend_from_slice(wire);
        }
        msg
    }

    /// Clear the buffer, move the cursor back to the first field and clear
    /// the fail flag.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.buf.resize(LENGTH_SIZE, 0);
        self.buf[..LENGTH_SIZE]
            .copy_from_slice(&(LENGTH_SIZE as LengthField).to_le_bytes());
        self.offset = LENGTH_SIZE;
        self.ok = true;
    }

    /// True when the cursor has consumed every declared field byte.
    pub fn is_empty(&self) -> bool {
        self.offset >= self.declared()
    }

    /// Message length declared by the header.
    pub fn declared_len(&self) -> usize {
        self.declared()
    }

    /// Raw buffer access for the transport layer to fill a received message.
    ///
    /// The transport must leave a complete message behind (declared length
    /// equal to the buffer length) and then call [`InMessage::rewind`].
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    /// Move the cursor back to the first field after a transport fill.
    pub fn rewind(&mut self) {
        self.offset = LENGTH_SIZE;
        self.ok = true;
    }

    /// Extract any wire-serializable value.
    pub fn extract<T: WireValue>(&mut self) -> Result<T> {
        T::extract(self)
    }

    pub fn extract_u32(&mut self) -> Result<u32> {
        self.take_scalar::<4>("extract_u32", TypeTag::U32)
            .map(u32::from_le_bytes)
    }

    pub fn extract_i32(&mut self) -> Result<i32> {
        self.take_scalar::<4>("extract_i32", TypeTag::I32)
            .map(i32::from_le_bytes)
    }

    pub fn extract_u64(&mut self) -> Result<u64> {
        self.take_scalar::<8>("extract_u64", TypeTag::U64)
            .map(u64::from_le_bytes)
    }

    pub fn extract_i64(&mut self) -> Result<i64> {
        self.take_scalar::<8>("extract_i64", TypeTag::I64)
            .map(i64::from_le_bytes)
    }

    pub fn extract_f64(&mut self) -> Result<f64> {
        self.take_scalar::<8>("extract_f64", TypeTag::Fp64)
            .map(f64::from_le_bytes)
    }

    /// Extract a single character byte.
    pub fn extract_chr(&mut self) -> Result<u8> {
        self.take_scalar::<1>("extract_chr", TypeTag::Chr)
            .map(|[byte]| byte)
    }

    /// Extract an opaque remote handle. The value is identity only and must
    /// never be interpreted as an address by the receiving side.
    pub fn extract_remote_ptr(&mut self) -> Result<RemotePtr> {
        self.take_scalar::<8>("extract_remote_ptr", TypeTag::RemotePtr)
            .map(|raw| RemotePtr::new(u64::from_le_bytes(raw)))
    }

    /// Extract a string field.
    ///
    /// Stops at the first zero byte; if the sender embedded a NUL in the
    /// string, everything past it stays in the buffer unconsumed.
    pub fn extract_str(&mut self) -> Result<String> {
        const OP: &str = "extract_str";
        self.need(OP, TAG_SIZE + 1)?;
        self.take_tag(OP, TypeTag::Str)?;

        let limit = self.limit();
        let payload = &self.buf[self.offset..limit];
        let Some(terminator) = payload.iter().position(|&byte| byte == 0) else {
            self.ok = false;
            return Err(MessageError::UnterminatedString { op: OP });
        };

        let text = String::from_utf8_lossy(&payload[..terminator]).into_owned();
        self.offset += terminator + 1;
        Ok(text)
    }

    /// Extract a binary field into an owned vector.
    pub fn extract_blob(&mut self) -> Result<Vec<u8>> {
        const OP: &str = "extract_blob";
        let len = self.take_blob_len(OP)?;
        let blob = self.buf[self.offset..self.offset + len].to_vec();
        self.offset += len;
        Ok(blob)
    }

    /// Extract a binary field into a caller buffer, returning the actual
    /// length. Fails with a container overflow when the on-wire length
    /// exceeds the buffer capacity.
    pub fn extract_blob_into(&mut self, dst: &mut [u8]) -> Result<usize> {
        const OP: &str = "extract_blob_into";
        let len = self.take_blob_len(OP)?;
        if len > dst.len() {
            self.ok = false;
            return Err(MessageError::ContainerOverflow {
                op: OP,
                required: len,
                limit: dst.len(),
            });
        }
        dst[..len].copy_from_slice(&self.buf[self.offset..self.offset + len]);
        self.offset += len;
        Ok(len)
    }

    fn take_blob_len(&mut self, op: &'static str) -> Result<usize> {
        self.need(op, TAG_SIZE + LENGTH_SIZE)?;
        self.take_tag(op, TypeTag::Blob)?;

        let mut raw = [0u8; LENGTH_SIZE];
        raw.copy_from_slice(&self.buf[self.offset..self.offset + LENGTH_SIZE]);
        self.offset += LENGTH_SIZE;

        let len = LengthField::from_le_bytes(raw) as usize;
        self.need(op, len)?;
        Ok(len)
    }

    fn take_scalar<const N: usize>(&mut self, op: &'static str, tag: TypeTag) -> Result<[u8; N]> {
        self.need(op, TAG_SIZE + N)?;
        self.take_tag(op, tag)?;

        let mut raw = [0u8; N];
        raw.copy_from_slice(&self.buf[self.offset..self.offset + N]);
        self.offset += N;
        Ok(raw)
    }

    #[cfg(feature = "tags")]
    fn take_tag(&mut self, op: &'static str, expected: TypeTag) -> Result<()> {
        let byte = self.buf[self.offset];
        if TypeTag::from_byte(byte) != Some(expected) {
            self.ok = false;
            return Err(MessageError::TypeMismatch {
                op,
                got: TypeTag::from_byte(byte).map_or("unknown", TypeTag::name),
                expected: expected.name(),
            });
        }
        self.offset += 1;
        Ok(())
    }

    #[cfg(not(feature = "tags"))]
    fn take_tag(&mut self, _op: &'static str, _expected: TypeTag) -> Result<()> {
        Ok(())
    }

    fn need(&mut self, op: &'static str, delta: usize) -> Result<()> {
        if !self.ok {
            return Err(MessageError::BadMessage { op });
        }
        let required = self.offset + delta;
        if required > self.limit() {
            self.ok = false;
            return Err(MessageError::MessageTooShort {
                op,
                required,
                available: self.declared(),
            });
        }
        Ok(())
    }

    fn declared(&self) -> usize {
        let mut raw = [0u8; LENGTH_SIZE];
        raw.copy_from_slice(&self.buf[..LENGTH_SIZE]);
        LengthField::from_le_bytes(raw) as usize
    }

    // Guards against a header declaring more than was actually received.
    fn limit(&self) -> usize {
        self.declared().min(self.buf.len())
    }
}

impl Default for InMessage {
    fn default() -> Self {
        Self::new()
    }
}
