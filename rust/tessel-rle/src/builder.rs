use tessel_common::Result;

use crate::{
    element::ElementKind,
    payload::Payload,
    segment::{MissingReason, Position},
    value::ValueRef,
    values::ValueBuffer,
    writer::{CellRef, RunLengthWriter, WriterState},
};

/// Builds a [`Payload`] from values pushed one at a time.
///
/// Consecutive equal values are turned into run segments as soon as the run is long enough to
/// pay for its segment record, see [`ElementKind::max_run_len`].
#[derive(Clone)]
pub struct PayloadBuilder {
    writer: RunLengthWriter,
    values: ValueBuffer,
}

impl PayloadBuilder {
    pub fn new(kind: ElementKind) -> PayloadBuilder {
        PayloadBuilder {
            writer: RunLengthWriter::new(kind.max_run_len()),
            values: ValueBuffer::new(kind),
        }
    }

    /// Creates a builder with room for `capacity` values.
    pub fn with_capacity(kind: ElementKind, capacity: usize) -> PayloadBuilder {
        let mut builder = PayloadBuilder::new(kind);
        builder.values.reserve(capacity);
        builder
    }

    #[inline]
    pub fn kind(&self) -> ElementKind {
        self.values.kind()
    }

    /// Number of cells pushed so far.
    #[inline]
    pub fn len(&self) -> Position {
        self.writer.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.writer.is_empty()
    }

    /// Number of values stored so far.
    #[inline]
    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn state(&self) -> WriterState {
        self.writer.state()
    }

    /// Appends one cell. A [`ValueRef::Null`] appends a missing cell.
    ///
    /// Returns a truncation error, leaving the builder unchanged, if the value does not fit
    /// into a fixed-size element.
    pub fn push(&mut self, value: ValueRef<'_>) -> Result<()> {
        match value {
            ValueRef::Null(reason) => self.writer.push_null(reason),
            value => self.writer.push_value(&mut self.values, &value),
        }
    }

    /// Appends `count` copies of one cell.
    pub fn push_repeated(&mut self, value: ValueRef<'_>, count: u64) -> Result<()> {
        match value {
            ValueRef::Null(reason) => self.writer.push_nulls(reason, count),
            value => self
                .writer
                .push_repeated(&mut self.values, &value, count),
        }
    }

    pub fn push_null(&mut self, reason: MissingReason) -> Result<()> {
        self.writer.push_null(reason)
    }

    pub fn push_nulls(&mut self, reason: MissingReason, count: u64) -> Result<()> {
        self.writer.push_nulls(reason, count)
    }

    /// Reserves room for `additional` more values.
    pub fn reserve(&mut self, additional: usize) {
        self.values.reserve(additional);
    }

    pub fn clear(&mut self) {
        self.writer.clear();
        self.values.clear();
    }

    /// Cell at `pos` among the cells pushed so far, `None` past the end.
    pub fn value_at(&self, pos: Position) -> Option<ValueRef<'_>> {
        Some(match self.writer.cell(pos)? {
            CellRef::Missing(reason) => ValueRef::Null(reason),
            CellRef::Value(index) => self.values.get(index),
        })
    }

    /// Appends the terminal segment and returns the payload.
    pub fn finish(self) -> Payload {
        let kind = self.values.kind();
        let segments = self.writer.finish();
        let (data, var_offset) = self.values.into_data();
        Payload {
            kind,
            segments,
            data,
            var_offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{segment::Segment, value::Value};

    #[test]
    fn test_boolean_packing() {
        let mut builder = PayloadBuilder::new(ElementKind::Boolean);
        let input: Vec<bool> = std::iter::repeat_n(true, 9)
            .chain(std::iter::repeat_n(false, 8))
            .collect();
        for b in &input {
            builder.push(ValueRef::Bool(*b)).unwrap();
        }
        let p = builder.finish();
        assert_eq!(p.data().len(), 3);
        let decoded: Vec<bool> = p.view().values().map(|v| v.as_bool().unwrap()).collect();
        assert_eq!(decoded, input);
    }

    #[test]
    fn test_null_runs() {
        let mut builder = PayloadBuilder::new(ElementKind::Fixed(4));
        builder.push(Value::from(5i32).as_ref()).unwrap();
        builder.push_null(3).unwrap();
        builder.push(ValueRef::Null(3)).unwrap();
        builder.push(Value::from(7i32).as_ref()).unwrap();
        let p = builder.finish();
        assert_eq!(
            p.segments(),
            &[
                Segment::literal(0, 0),
                Segment::null_run(1, 3),
                Segment::literal(3, 1)
            ]
        );
        assert_eq!(p.value_at(1), Some(ValueRef::Null(3)));
        assert_eq!(p.value_at(2), Some(ValueRef::Null(3)));
    }

    #[test]
    fn test_truncation_keeps_builder() {
        let mut builder = PayloadBuilder::new(ElementKind::Fixed(2));
        builder.push(Value::from(1i16).as_ref()).unwrap();
        assert!(builder.push(Value::from(1i64).as_ref()).is_err());
        builder.push(Value::from(2i16).as_ref()).unwrap();
        let p = builder.finish();
        assert_eq!(p.len(), 2);
        assert_eq!(p.value_at(1).and_then(|v| v.as_i64()), Some(2));
    }

    #[test]
    fn test_variable_runs() {
        let mut builder = PayloadBuilder::new(ElementKind::Variable);
        builder.push(ValueRef::Bytes(b"x")).unwrap();
        builder.push_repeated(ValueRef::Bytes(b"hello"), 10).unwrap();
        builder.push(ValueRef::Bytes(b"")).unwrap();
        let p = builder.finish();
        assert_eq!(p.segment_count(), 3);
        assert_eq!(p.view().value_count(), 3);
        let values = p.to_values();
        assert_eq!(values[0], Value::from("x"));
        assert!(values[1..11].iter().all(|v| *v == Value::from("hello")));
        assert_eq!(values[11], Value::from(""));
    }

    #[test]
    fn test_clear() {
        let mut builder = PayloadBuilder::with_capacity(ElementKind::Fixed(1), 16);
        builder.push(Value::from(1u8).as_ref()).unwrap();
        builder.clear();
        assert!(builder.is_empty());
        assert_eq!(builder.value_count(), 0);
        assert_eq!(builder.state(), WriterState::Empty);
    }

    #[test]
    fn test_value_at_while_building() {
        let mut builder = PayloadBuilder::new(ElementKind::Fixed(2));
        builder.push(Value::from(7i16).as_ref()).unwrap();
        builder.push_repeated(Value::from(9i16).as_ref(), 30).unwrap();
        builder.push_null(5).unwrap();
        assert_eq!(builder.value_at(0).and_then(|v| v.as_i64()), Some(7));
        assert_eq!(builder.value_at(30).and_then(|v| v.as_i64()), Some(9));
        assert_eq!(builder.value_at(31), Some(ValueRef::Null(5)));
        assert_eq!(builder.value_at(32), None);
    }
}
