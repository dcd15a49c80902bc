//! One-byte field type tags.
//!
//! Discriminants start at 1 so a stray NUL byte never reads as a valid tag.

/// Kind of a serialized field, written in front of the payload when the
/// `tags` feature is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TypeTag {
    U32 = 1,
    I32 = 2,
    U64 = 3,
    I64 = 4,
    Fp64 = 5,
    Chr = 6,
    Str = 7,
    RemotePtr = 8,
    Blob = 9,
}

impl TypeTag {
    /// Decode a wire byte back into a tag.
    #[cfg(feature = "tags")]
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::U32),
            2 => Some(Self::I32),
            3 => Some(Self::U64),
            4 => Some(Self::I64),
            5 => Some(Self::Fp64),
            6 => Some(Self::Chr),
            7 => Some(Self::Str),
            8 => Some(Self::RemotePtr),
            9 => Some(Self::Blob),
            _ => None,
        }
    }

    /// Human-readable tag name for error text.
    #[cfg(feature = "tags")]
    pub fn name(self) -> &'static str {
        match self {
            Self::U32 => "u32",
            Self::I32 => "i32",
            Self::U64 => "u64",
            Self::I64 => "i64",
            Self::Fp64 => "fp64",
            Self::Chr => "chr",
            Self::Str => "str",
            Self::RemotePtr => "remote_ptr",
            Self::Blob => "blob",
        }
    }
}
