//! Tagged cell values: `Value` owns its bytes, `ValueRef` borrows them from a value buffer.
//!
//! Scalars are carried as their little-endian byte representation, so the same tagged value
//! can be stored in fixed-size, boolean or variable-size payloads.

use num_traits::ToBytes;
use tinyvec::TinyVec;

use crate::segment::MissingReason;

/// Inline capacity of owned byte values before spilling to the heap.
pub const INLINE_VALUE_BYTES: usize = 16;

#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Null(MissingReason),
    Bool(bool),
    Bytes(TinyVec<[u8; INLINE_VALUE_BYTES]>),
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueRef<'a> {
    Null(MissingReason),
    Bool(bool),
    Bytes(&'a [u8]),
}

impl Value {
    pub fn null(reason: MissingReason) -> Value {
        Value::Null(reason)
    }

    pub fn from_bytes(bytes: &[u8]) -> Value {
        Value::Bytes(TinyVec::from(bytes))
    }

    /// Creates a value holding the little-endian bytes of a numeric scalar.
    pub fn from_scalar<T: ToBytes>(value: T) -> Value {
        Value::from_bytes(value.to_le_bytes().as_ref())
    }

    #[inline]
    pub fn as_ref(&self) -> ValueRef<'_> {
        match self {
            Value::Null(reason) => ValueRef::Null(*reason),
            Value::Bool(b) => ValueRef::Bool(*b),
            Value::Bytes(bytes) => ValueRef::Bytes(bytes.as_slice()),
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    pub fn missing_reason(&self) -> Option<MissingReason> {
        self.as_ref().missing_reason()
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.as_ref().as_bytes()
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_ref().as_bool()
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_ref().as_i64()
    }
}

impl<'a> ValueRef<'a> {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, ValueRef::Null(_))
    }

    #[inline]
    pub fn missing_reason(&self) -> Option<MissingReason> {
        match self {
            ValueRef::Null(reason) => Some(*reason),
            _ => None,
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        match self {
            ValueRef::Bytes(bytes) => Some(*bytes),
            _ => None,
        }
    }

    /// Boolean view of the value. A single byte is interpreted as a boolean as well.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ValueRef::Bool(b) => Some(*b),
            ValueRef::Bytes([b]) => Some(*b != 0),
            _ => None,
        }
    }

    /// Interprets up to eight little-endian bytes as a sign-extended integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ValueRef::Bool(b) => Some(*b as i64),
            ValueRef::Bytes(bytes) if !bytes.is_empty() && bytes.len() <= 8 => {
                let fill = if bytes[bytes.len() - 1] & 0x80 != 0 {
                    0xFF
                } else {
                    0
                };
                let mut buf = [fill; 8];
                buf[..bytes.len()].copy_from_slice(bytes);
                Some(i64::from_le_bytes(buf))
            }
            _ => None,
        }
    }

    pub fn to_owned(&self) -> Value {
        match self {
            ValueRef::Null(reason) => Value::Null(*reason),
            ValueRef::Bool(b) => Value::Bool(*b),
            ValueRef::Bytes(bytes) => Value::from_bytes(bytes),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::from_bytes(value.as_bytes())
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::from_bytes(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::from_bytes(&value)
    }
}

impl<'a> From<ValueRef<'a>> for Value {
    fn from(value: ValueRef<'a>) -> Self {
        value.to_owned()
    }
}

macro_rules! impl_from_scalar {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    Value::from_scalar(value)
                }
            }
        )*
    };
}

impl_from_scalar!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl PartialEq<ValueRef<'_>> for Value {
    fn eq(&self, other: &ValueRef<'_>) -> bool {
        self.as_ref() == *other
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_ref().fmt(f)
    }
}

impl std::fmt::Debug for ValueRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueRef::Null(reason) => write!(f, "null({reason})"),
            ValueRef::Bool(b) => write!(f, "{b}"),
            ValueRef::Bytes(bytes) => write!(f, "{bytes:02x?}"),
        }
    }
}
