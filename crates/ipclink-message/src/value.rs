use crate::error::Result;
use crate::reader::InMessage;
use crate::writer::OutMessage;

/// An opaque 8-byte handle exchanged between peers.
///
/// The value is only meaningful to the peer that produced it; the receiving
/// side must treat it as identity to echo back, never as an address. Nothing
/// in this type allows dereferencing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RemotePtr(u64);

impl RemotePtr {
    /// Wrap a raw handle value.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw handle value, for lookup on the side that produced it.
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// A value that can be appended to and extracted from a message.
///
/// This is the seam the RPC layer monomorphizes over: argument lists are
/// tuples of `WireValue`s extracted in declaration order, return values are a
/// single `WireValue` (with `()` for void).
pub trait WireValue: Sized {
    fn append(&self, out: &mut OutMessage) -> Result<()>;
    fn extract(input: &mut InMessage) -> Result<Self>;
}

impl WireValue for u32 {
    fn append(&self, out: &mut OutMessage) -> Result<()> {
        out.append_u32(*self)
    }

    fn extract(input: &mut InMessage) -> Result<Self> {
        input.extract_u32()
    }
}

impl WireValue for i32 {
    fn append(&self, out: &mut OutMessage) -> Result<()> {
        out.append_i32(*self)
    }

    fn extract(input: &mut InMessage) -> Result<Self> {
        input.extract_i32()
    }
}

impl WireValue for u64 {
    fn append(&self, out: &mut OutMessage) -> Result<()> {
        out.append_u64(*self)
    }

    fn extract(input: &mut InMessage) -> Result<Self> {
        input.extract_u64()
    }
}

impl WireValue for i64 {
    fn append(&self, out: &mut OutMessage) -> Result<()> {
        out.append_i64(*self)
    }

    fn extract(input: &mut InMessage) -> Result<Self> {
        input.extract_i64()
    }
}

impl WireValue for f64 {
    fn append(&self, out: &mut OutMessage) -> Result<()> {
        out.append_f64(*self)
    }

    fn extract(input: &mut InMessage) -> Result<Self> {
        input.extract_f64()
    }
}

impl WireValue for u8 {
    fn append(&self, out: &mut OutMessage) -> Result<()> {
        out.append_chr(*self)
    }

    fn extract(input: &mut InMessage) -> Result<Self> {
        input.extract_chr()
    }
}

impl WireValue for String {
    fn append(&self, out: &mut OutMessage) -> Result<()> {
        out.append_str(self)
    }

    fn extract(input: &mut InMessage) -> Result<Self> {
        input.extract_str()
    }
}

impl WireValue for Vec<u8> {
    fn append(&self, out: &mut OutMessage) -> Result<()> {
        out.append_blob(self)
    }

    fn extract(input: &mut InMessage) -> Result<Self> {
        input.extract_blob()
    }
}

impl WireValue for RemotePtr {
    fn append(&self, out: &mut OutMessage) -> Result<()> {
        out.append_remote_ptr(*self)
    }

    fn extract(input: &mut InMessage) -> Result<Self> {
        input.extract_remote_ptr()
    }
}

/// Void: appends nothing, extracts nothing.
impl WireValue for () {
    fn append(&self, _out: &mut OutMessage) -> Result<()> {
        Ok(())
    }

    fn extract(_input: &mut InMessage) -> Result<Self> {
        Ok(())
    }
}

macro_rules! tuple_wire_value {
    ($($field:ident : $index:tt),+) => {
        impl<$($field: WireValue),+> WireValue for ($($field,)+) {
            fn append(&self, out: &mut OutMessage) -> Result<()> {
                $(self.$index.append(out)?;)+
                Ok(())
            }

            fn extract(input: &mut InMessage) -> Result<Self> {
                Ok(($($field::extract(input)?,)+))
            }
        }
    };
}

tuple_wire_value!(A: 0);
tuple_wire_value!(A: 0, B: 1);
tuple_wire_value!(A: 0, B: 1, C: 2);
tuple_wire_value!(A: 0, B: 1, C: 2, D: 3);
tuple_wire_value!(A: 0, B: 1, C: 2, D: 3, E: 4);
tuple_wire_value!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuple_roundtrip_in_declaration_order() {
        let mut out = OutMessage::new();
        (7u32, -3i32, String::from("mix"), RemotePtr::new(11))
            .append(&mut out)
            .unwrap();

        let mut input = InMessage::from_bytes(out.as_bytes());
        let (a, b, c, d) = <(u32, i32, String, RemotePtr)>::extract(&mut input).unwrap();
        assert_eq!((a, b, c.as_str(), d), (7, -3, "mix", RemotePtr::new(11)));
        assert!(input.is_empty());
    }

    #[test]
    fn unit_is_invisible_on_the_wire() {
        let mut out = OutMessage::new();
        ().append(&mut out).unwrap();
        assert!(out.is_empty());

        let mut input = InMessage::from_bytes(out.as_bytes());
        <()>::extract(&mut input).unwrap();
        assert!(input.is_empty());
    }

    #[test]
    fn remote_ptr_is_echoed_by_identity() {
        let handle = RemotePtr::new(u64::MAX);

        let mut out = OutMessage::new();
        handle.append(&mut out).unwrap();

        let mut input = InMessage::from_bytes(out.as_bytes());
        assert_eq!(RemotePtr::extract(&mut input).unwrap(), handle);
    }
}
