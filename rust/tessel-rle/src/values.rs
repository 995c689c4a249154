//! Value buffers of a payload: the read-only `ValueSlice` over encoded bytes and the growable
//! `ValueBuffer` used while building.

use tessel_common::{Result, error::Error, verify_data};

use crate::{
    element::ElementKind,
    value::ValueRef,
    var_part::{self, VAR_OFFSET_SIZE},
};

/// Read-only view of an encoded value buffer: the fixed part (records, bits or offsets)
/// followed by the variable part.
#[derive(Clone, Copy)]
pub struct ValueSlice<'a> {
    kind: ElementKind,
    data: &'a [u8],
    var_offset: usize,
}

impl<'a> ValueSlice<'a> {
    /// Creates a view without validating it, see [`ValueSlice::validate`].
    ///
    /// # Panics
    ///
    /// Panics if `var_offset` is past the end of `data`.
    pub fn new(kind: ElementKind, data: &'a [u8], var_offset: usize) -> ValueSlice<'a> {
        assert!(var_offset <= data.len());
        ValueSlice {
            kind,
            data,
            var_offset,
        }
    }

    #[inline]
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    #[inline]
    pub fn var_offset(&self) -> usize {
        self.var_offset
    }

    #[inline]
    pub fn fixed_part(&self) -> &'a [u8] {
        &self.data[..self.var_offset]
    }

    #[inline]
    pub fn var_part(&self) -> &'a [u8] {
        &self.data[self.var_offset..]
    }

    /// Number of values the fixed part has room for. For booleans this counts every bit of
    /// the last byte.
    pub fn capacity(&self) -> usize {
        match self.kind {
            ElementKind::Fixed(size) => self.var_offset / (size as usize).max(1),
            ElementKind::Boolean => self.var_offset * 8,
            ElementKind::Variable => self.var_offset / VAR_OFFSET_SIZE,
        }
    }

    /// Checks that the first `count` values can be read.
    pub fn validate(&self, count: usize) -> Result<()> {
        verify_data!(value_count, count <= self.capacity());
        if self.kind.is_variable() {
            let var_part = self.var_part();
            for i in 0..count {
                let offset = var_part::read_offset(self.fixed_part(), i);
                var_part::decode_datum(var_part, offset)?;
            }
        }
        Ok(())
    }

    /// Value stored at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds or the variable part is corrupted.
    #[inline]
    pub fn get(&self, index: usize) -> ValueRef<'a> {
        match self.kind {
            ElementKind::Fixed(size) => {
                let size = size as usize;
                ValueRef::Bytes(&self.data[index * size..(index + 1) * size])
            }
            ElementKind::Boolean => ValueRef::Bool(self.bit(index)),
            ElementKind::Variable => ValueRef::Bytes(self.datum(index)),
        }
    }

    /// Boolean value at `index`.
    #[inline]
    pub fn bit(&self, index: usize) -> bool {
        self.data[index >> 3] & (1 << (index & 7)) != 0
    }

    fn datum(&self, index: usize) -> &'a [u8] {
        let offset = var_part::read_offset(self.fixed_part(), index);
        match var_part::decode_datum(self.var_part(), offset) {
            Ok((datum, _)) => datum,
            Err(e) => panic!("corrupted variable part at value {index}: {e}"),
        }
    }

    /// Offset of the datum `index` within the variable part and its encoded size.
    pub fn datum_span(&self, index: usize) -> Result<(usize, usize)> {
        debug_assert!(self.kind.is_variable());
        let offset = var_part::read_offset(self.fixed_part(), index);
        let (_, size) = var_part::decode_datum(self.var_part(), offset)?;
        Ok((offset, size))
    }

    /// Number of set bits among the boolean values `[start, start + count)`.
    pub fn count_ones(&self, start: usize, count: usize) -> usize {
        (start..start + count).filter(|&i| self.bit(i)).count()
    }
}

/// Growable value buffer filled by the payload builders.
///
/// Variable-size datums are staged in a separate buffer and spliced after the offsets when
/// the buffer is turned into payload data.
#[derive(Clone)]
pub struct ValueBuffer {
    kind: ElementKind,
    fixed: Vec<u8>,
    var: Vec<u8>,
    count: usize,
}

impl ValueBuffer {
    /// # Panics
    ///
    /// Panics on a zero-sized fixed element kind.
    pub fn new(kind: ElementKind) -> ValueBuffer {
        assert_ne!(kind, ElementKind::Fixed(0), "fixed elements need a size");
        ValueBuffer {
            kind,
            fixed: Vec::new(),
            var: Vec::new(),
            count: 0,
        }
    }

    #[inline]
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn reserve(&mut self, additional: usize) {
        match self.kind {
            ElementKind::Boolean => self.fixed.reserve(additional.div_ceil(8)),
            kind => self.fixed.reserve(additional * kind.slot_size()),
        }
    }

    pub fn clear(&mut self) {
        self.fixed.clear();
        self.var.clear();
        self.count = 0;
    }

    /// Appends one value.
    ///
    /// A value longer than a fixed element is rejected with a truncation error and leaves the
    /// buffer unchanged.
    pub fn push(&mut self, value: ValueRef<'_>) -> Result<()> {
        match (self.kind, value) {
            (_, ValueRef::Null(_)) => {
                return Err(Error::invalid_arg(
                    "value",
                    "null cells are encoded as segments, not values",
                ));
            }
            (ElementKind::Boolean, value) => {
                let bit = match value {
                    ValueRef::Bool(b) => b,
                    ValueRef::Bytes([b]) => *b != 0,
                    ValueRef::Bytes(bytes) => return Err(Error::truncation(bytes.len(), 1)),
                    ValueRef::Null(_) => unreachable!(),
                };
                self.push_bit(bit);
            }
            (ElementKind::Fixed(size), value) => {
                let size = size as usize;
                let bool_byte;
                let bytes = match value {
                    ValueRef::Bytes(bytes) => bytes,
                    ValueRef::Bool(b) => {
                        bool_byte = [b as u8];
                        &bool_byte[..]
                    }
                    ValueRef::Null(_) => unreachable!(),
                };
                if bytes.len() > size {
                    return Err(Error::truncation(bytes.len(), size));
                }
                self.fixed.extend_from_slice(bytes);
                self.fixed.resize(self.fixed.len() + size - bytes.len(), 0);
                self.count += 1;
            }
            (ElementKind::Variable, value) => {
                let bool_byte;
                let bytes = match value {
                    ValueRef::Bytes(bytes) => bytes,
                    ValueRef::Bool(b) => {
                        bool_byte = [b as u8];
                        &bool_byte[..]
                    }
                    ValueRef::Null(_) => unreachable!(),
                };
                self.push_datum(bytes);
            }
        }
        Ok(())
    }

    fn push_bit(&mut self, bit: bool) {
        let i = self.count;
        if i & 7 == 0 {
            self.fixed.push(0);
        }
        if bit {
            self.fixed[i >> 3] |= 1 << (i & 7);
        }
        self.count += 1;
    }

    fn push_datum(&mut self, datum: &[u8]) {
        let offset = self.var.len() as u32;
        self.fixed.extend_from_slice(&offset.to_le_bytes());
        var_part::encode_datum(&mut self.var, datum);
        self.count += 1;
    }

    /// Value stored at `index`.
    pub fn get(&self, index: usize) -> ValueRef<'_> {
        assert!(index < self.count, "value index {index} out of bounds");
        match self.kind {
            ElementKind::Variable => {
                let offset = var_part::read_offset(&self.fixed, index);
                match var_part::decode_datum(&self.var, offset) {
                    Ok((datum, _)) => ValueRef::Bytes(datum),
                    Err(e) => panic!("corrupted staged datum {index}: {e}"),
                }
            }
            kind => ValueSlice::new(kind, &self.fixed, self.fixed.len()).get(index),
        }
    }

    /// Returns `true` if the value at `index` equals `value` once padded to the element size.
    pub fn matches(&self, index: usize, value: ValueRef<'_>) -> bool {
        match (self.get(index), value) {
            (ValueRef::Bool(a), v) => v.as_bool() == Some(a),
            (ValueRef::Bytes(stored), ValueRef::Bytes(bytes)) => {
                if self.kind.is_variable() {
                    stored == bytes
                } else {
                    bytes.len() <= stored.len()
                        && stored[..bytes.len()] == *bytes
                        && stored[bytes.len()..].iter().all(|b| *b == 0)
                }
            }
            (ValueRef::Bytes(stored), ValueRef::Bool(b)) => {
                !stored.is_empty()
                    && stored[0] == b as u8
                    && stored[1..].iter().all(|b| *b == 0)
            }
            _ => false,
        }
    }

    /// Drops the values from `len` onwards.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.count {
            return;
        }
        match self.kind {
            ElementKind::Fixed(size) => self.fixed.truncate(len * size as usize),
            ElementKind::Boolean => {
                self.fixed.truncate(len.div_ceil(8));
                if len & 7 != 0 {
                    let last = self.fixed.len() - 1;
                    self.fixed[last] &= (1u8 << (len & 7)) - 1;
                }
            }
            ElementKind::Variable => {
                let offset = var_part::read_offset(&self.fixed, len);
                self.var.truncate(offset);
                self.fixed.truncate(len * VAR_OFFSET_SIZE);
            }
        }
        self.count = len;
    }

    /// Appends the values `[start, start + count)` of an encoded value buffer. Fixed-size and
    /// boolean values are copied in bulk, variable-size datums one by one.
    pub fn extend_from_slice(&mut self, src: &ValueSlice<'_>, start: usize, count: usize) {
        assert_eq!(src.kind(), self.kind, "value buffer kinds differ");
        match self.kind {
            ElementKind::Fixed(size) => {
                let size = size as usize;
                self.fixed
                    .extend_from_slice(&src.data()[start * size..(start + count) * size]);
                self.count += count;
            }
            ElementKind::Boolean => {
                if self.count & 7 == 0 && start & 7 == 0 {
                    let bytes = &src.data()[start >> 3..(start + count).div_ceil(8)];
                    self.fixed.extend_from_slice(bytes);
                    self.count += count;
                    if count & 7 != 0 {
                        let last = self.fixed.len() - 1;
                        self.fixed[last] &= (1u8 << (count & 7)) - 1;
                    }
                } else {
                    for i in start..start + count {
                        self.push_bit(src.bit(i));
                    }
                }
            }
            ElementKind::Variable => {
                for i in start..start + count {
                    self.push_datum(src.datum(i));
                }
            }
        }
    }

    /// Read-only view over the fixed part. For variable-size values the datums are only
    /// reachable through [`ValueBuffer::get`] until the buffer is finished.
    pub fn fixed_part(&self) -> &[u8] {
        &self.fixed
    }

    /// Splices the staged variable part after the fixed part and returns the payload data
    /// together with the variable part offset.
    pub fn into_data(self) -> (Vec<u8>, usize) {
        let ValueBuffer {
            mut fixed, var, ..
        } = self;
        let var_offset = fixed.len();
        fixed.extend_from_slice(&var);
        (fixed, var_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_fixed_padding_and_truncation() {
        let mut buf = ValueBuffer::new(ElementKind::Fixed(4));
        buf.push(Value::from(1u16).as_ref()).unwrap();
        buf.push(Value::from(2u32).as_ref()).unwrap();
        assert_eq!(buf.fixed_part(), &[1, 0, 0, 0, 2, 0, 0, 0]);

        let err = buf.push(Value::from(3u64).as_ref()).unwrap_err();
        assert!(matches!(
            err.kind(),
            tessel_common::error::ErrorKind::Truncation {
                size: 8,
                capacity: 4
            }
        ));
        assert_eq!(buf.len(), 2);
        assert!(buf.matches(0, Value::from(1u32).as_ref()));
        assert!(buf.matches(0, Value::from(1u8).as_ref()));
        assert!(!buf.matches(1, Value::from(1u32).as_ref()));
    }

    #[test]
    fn test_boolean_bits() {
        let mut buf = ValueBuffer::new(ElementKind::Boolean);
        for i in 0..10 {
            buf.push(ValueRef::Bool(i % 3 == 0)).unwrap();
        }
        assert_eq!(buf.fixed_part(), &[0b0100_1001, 0b0000_0010]);
        buf.truncate(7);
        assert_eq!(buf.fixed_part(), &[0b0100_1001]);
        buf.truncate(3);
        assert_eq!(buf.fixed_part(), &[0b0000_0001]);
        assert!(buf.matches(0, ValueRef::Bool(true)));
        assert!(buf.matches(1, ValueRef::Bytes(&[0])));
    }

    #[test]
    fn test_variable_staging() {
        let mut buf = ValueBuffer::new(ElementKind::Variable);
        buf.push(ValueRef::Bytes(b"ab")).unwrap();
        buf.push(ValueRef::Bytes(b"")).unwrap();
        buf.push(ValueRef::Bytes(b"xyz")).unwrap();
        assert_eq!(buf.get(2), ValueRef::Bytes(b"xyz"));
        buf.truncate(2);
        let (data, var_offset) = buf.into_data();
        assert_eq!(var_offset, 8);
        assert_eq!(&data[8..], &[2, b'a', b'b', 0, 0, 0, 0, 0]);

        let slice = ValueSlice::new(ElementKind::Variable, &data, var_offset);
        slice.validate(2).unwrap();
        assert_eq!(slice.get(0), ValueRef::Bytes(b"ab"));
        assert_eq!(slice.get(1), ValueRef::Bytes(b""));
        assert!(slice.validate(3).is_err());
    }

    #[test]
    fn test_extend_booleans() {
        let mut src = ValueBuffer::new(ElementKind::Boolean);
        for i in 0..20 {
            src.push(ValueRef::Bool(i % 2 == 1)).unwrap();
        }
        let (data, var_offset) = src.into_data();
        let slice = ValueSlice::new(ElementKind::Boolean, &data, var_offset);

        let mut aligned = ValueBuffer::new(ElementKind::Boolean);
        aligned.extend_from_slice(&slice, 8, 5);
        assert_eq!(aligned.len(), 5);
        assert_eq!(aligned.fixed_part(), &[0b0000_1010]);

        let mut unaligned = ValueBuffer::new(ElementKind::Boolean);
        unaligned.push(ValueRef::Bool(true)).unwrap();
        unaligned.extend_from_slice(&slice, 3, 4);
        assert_eq!(unaligned.fixed_part(), &[0b0000_1011]);
        assert_eq!(slice.count_ones(0, 20), 10);
    }

    #[test]
    fn test_rejects_null() {
        let mut buf = ValueBuffer::new(ElementKind::Variable);
        assert!(buf.push(ValueRef::Null(1)).is_err());
        assert!(buf.is_empty());
    }
}
