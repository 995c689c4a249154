//! Run-length encoded value payloads.
//!
//! A payload is an ordered list of [`Segment`]s terminated by a data-free terminal segment,
//! plus a value buffer holding the values of the literal and run segments. [`Payload`] owns its
//! buffers; [`PayloadView`] borrows them, either from a `Payload` or from an encoded byte buffer
//! received from elsewhere.
//!
//! Encoded layout (little-endian):
//!
//! ```text
//! header   magic u64 | segment count u64 | element size u64 | data size u64 |
//!          var offset u64 | boolean flag u8 | 7 padding bytes
//! segments (segment count + 1) x 12 bytes
//! data     data size bytes
//! ```

use std::fmt;

use tessel_common::{Result, error::Error, verify_arg, verify_data};

use crate::{
    builder::PayloadBuilder,
    element::ElementKind,
    scalar::{ValueReader, ValueWriter},
    segment::{MissingReason, Position, SEGMENT_SIZE, Segment},
    value::{Value, ValueRef},
    values::ValueSlice,
};

/// Magic number opening an encoded value payload.
pub const PAYLOAD_MAGIC: u64 = 0xDDDD_AAAA_000E_AAAC;

/// Size of the encoded payload header.
pub const PAYLOAD_HEADER_SIZE: usize = 48;

/// Fixed-size header of an encoded payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadHeader {
    /// Number of segments, not counting the terminal segment.
    pub segment_count: u64,
    /// Element size in bytes, zero for variable-size values.
    pub element_size: u64,
    /// Size of the value buffer in bytes.
    pub data_size: u64,
    /// Offset of the variable part within the value buffer.
    pub var_offset: u64,
    pub is_boolean: bool,
}

impl PayloadHeader {
    pub fn read_from(buffer: &[u8]) -> Result<(PayloadHeader, &[u8])> {
        if buffer.len() < PAYLOAD_HEADER_SIZE {
            return Err(Error::invalid_format(
                "payload header",
                format!("buffer of {} bytes is too small", buffer.len()),
            ));
        }
        let magic = buffer.read_value::<u64>(0);
        if magic != PAYLOAD_MAGIC {
            return Err(Error::invalid_format(
                "payload header",
                format!("unexpected magic {magic:#018x}"),
            ));
        }
        let header = PayloadHeader {
            segment_count: buffer.read_value::<u64>(8),
            element_size: buffer.read_value::<u64>(16),
            data_size: buffer.read_value::<u64>(24),
            var_offset: buffer.read_value::<u64>(32),
            is_boolean: buffer[40] != 0,
        };
        Ok((header, &buffer[PAYLOAD_HEADER_SIZE..]))
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.write_value(PAYLOAD_MAGIC);
        out.write_value(self.segment_count);
        out.write_value(self.element_size);
        out.write_value(self.data_size);
        out.write_value(self.var_offset);
        out.push(self.is_boolean as u8);
        out.extend_from_slice(&[0u8; 7]);
    }
}

/// Borrowed, read-only payload.
#[derive(Clone, Copy)]
pub struct PayloadView<'a> {
    segments: &'a [Segment],
    values: ValueSlice<'a>,
}

impl<'a> PayloadView<'a> {
    /// Validates the segment list and value buffer and wraps them into a view.
    ///
    /// `segments` must end with the terminal segment. The check covers segment ordering, data
    /// index bounds and, for variable-size values, every offset and datum header.
    pub fn new(segments: &'a [Segment], values: ValueSlice<'a>) -> Result<PayloadView<'a>> {
        let view = PayloadView { segments, values };
        view.validate()?;
        Ok(view)
    }

    /// Creates a view over segments and values produced by the builders of this crate.
    pub(crate) fn new_unchecked(segments: &'a [Segment], values: ValueSlice<'a>) -> Self {
        debug_assert!(!segments.is_empty());
        PayloadView { segments, values }
    }

    /// Decodes a payload view from an encoded buffer. The view borrows `buffer`.
    pub fn from_bytes(buffer: &'a [u8]) -> Result<PayloadView<'a>> {
        let (header, body) = PayloadHeader::read_from(buffer)?;
        let kind = ElementKind::from_header(header.element_size, header.is_boolean)
            .ok_or_else(|| Error::invalid_format("payload header", "invalid element size"))?;
        let segment_bytes = usize::try_from(header.segment_count)
            .ok()
            .and_then(|n| n.checked_add(1))
            .and_then(|n| n.checked_mul(SEGMENT_SIZE))
            .ok_or_else(|| Error::invalid_format("payload header", "segment count overflow"))?;
        let data_size = usize::try_from(header.data_size)
            .map_err(|_| Error::invalid_format("payload header", "data size overflow"))?;
        verify_data!(payload, body.len() >= segment_bytes);
        verify_data!(payload, body.len() - segment_bytes >= data_size);
        verify_data!(payload, header.var_offset <= header.data_size);

        let segments: &[Segment] = bytemuck::try_cast_slice(&body[..segment_bytes])
            .map_err(|e| Error::invalid_format("payload segments", e.to_string()))?;
        let data = &body[segment_bytes..segment_bytes + data_size];
        let var_offset = if kind.is_variable() {
            header.var_offset as usize
        } else {
            data.len()
        };
        log::trace!(
            "decoding payload: {} segments, {kind:?}, {data_size} data bytes",
            header.segment_count
        );
        PayloadView::new(segments, ValueSlice::new(kind, data, var_offset))
    }

    fn validate(&self) -> Result<()> {
        let Some((terminal, segments)) = self.segments.split_last() else {
            return Err(Error::invalid_format("payload segments", "missing terminal"));
        };
        if let Some(first) = segments.first() {
            verify_data!(payload_segments, first.start_position() == 0);
        } else {
            verify_data!(payload_segments, terminal.start_position() == 0);
        }
        let mut value_count = 0u64;
        for (i, s) in segments.iter().enumerate() {
            let next = self.segments[i + 1].start_position();
            if s.start_position() >= next {
                return Err(Error::invalid_format(
                    "payload segments",
                    format!("segment {i} does not start before its successor"),
                ));
            }
            let end = s.value_end(next - s.start_position());
            value_count = value_count.max(end);
        }
        if value_count > self.values.capacity() as u64 {
            return Err(Error::invalid_format(
                "payload values",
                format!(
                    "segments reference {value_count} values, buffer holds {}",
                    self.values.capacity()
                ),
            ));
        }
        self.values.validate(value_count as usize)
    }

    /// Number of cells.
    #[inline]
    pub fn len(&self) -> Position {
        self.segments[self.segments.len() - 1].start_position()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn kind(&self) -> ElementKind {
        self.values.kind()
    }

    /// Number of segments, the terminal segment excluded.
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.segments.len() - 1
    }

    /// Segments without the terminal segment.
    #[inline]
    pub fn segments(&self) -> &'a [Segment] {
        &self.segments[..self.segments.len() - 1]
    }

    /// Segments including the terminal segment.
    #[inline]
    pub fn segments_with_terminal(&self) -> &'a [Segment] {
        self.segments
    }

    #[inline]
    pub fn segment(&self, i: usize) -> Segment {
        self.segments[i]
    }

    /// Length in cells of the segment `i`.
    #[inline]
    pub fn segment_len(&self, i: usize) -> u64 {
        self.segments[i + 1].start_position() - self.segments[i].start_position()
    }

    #[inline]
    pub fn value_slice(&self) -> ValueSlice<'a> {
        self.values
    }

    /// Number of values referenced by the segments.
    pub fn value_count(&self) -> usize {
        (0..self.segment_count())
            .map(|i| self.segments[i].value_end(self.segment_len(i)))
            .max()
            .unwrap_or(0) as usize
    }

    /// Index of the segment containing `pos`, or `None` past the end.
    pub fn find_segment(&self, pos: Position) -> Option<usize> {
        if pos >= self.len() {
            return None;
        }
        let segments = self.segments();
        Some(segments.partition_point(|s| s.start_position() <= pos) - 1)
    }

    /// Value of the cell at `pos`, or `None` past the end. Missing cells are returned as
    /// [`ValueRef::Null`] carrying their reason.
    pub fn value_at(&self, pos: Position) -> Option<ValueRef<'a>> {
        self.find_segment(pos).map(|i| self.value_in_segment(i, pos))
    }

    #[inline]
    fn value_in_segment(&self, i: usize, pos: Position) -> ValueRef<'a> {
        let s = self.segments[i];
        if s.is_null() {
            ValueRef::Null(s.data_index())
        } else if s.is_run() {
            self.values.get(s.data_index() as usize)
        } else {
            self.values
                .get(s.data_index() as usize + (pos - s.start_position()) as usize)
        }
    }

    pub fn cursor(&self) -> PayloadCursor<'a> {
        PayloadCursor {
            view: *self,
            current: 0,
        }
    }

    pub fn iter(&self) -> PayloadIter<'a> {
        PayloadIter::new(*self)
    }

    /// Every cell in position order.
    pub fn values(&self) -> Values<'a> {
        Values { iter: self.iter() }
    }

    /// Segments with their position and length.
    pub fn spans(&self) -> impl ExactSizeIterator<Item = Span> + use<'a> {
        let segments = self.segments;
        (0..segments.len() - 1).map(move |i| Span {
            position: segments[i].start_position(),
            length: segments[i + 1].start_position() - segments[i].start_position(),
            segment: segments[i],
        })
    }

    pub fn header(&self) -> PayloadHeader {
        let kind = self.kind();
        let data_size = self.values.data().len() as u64;
        PayloadHeader {
            segment_count: self.segment_count() as u64,
            element_size: kind.element_size(),
            data_size,
            var_offset: if kind.is_variable() {
                self.values.var_offset() as u64
            } else {
                data_size
            },
            is_boolean: kind.is_boolean(),
        }
    }

    /// Size of the encoded payload in bytes.
    pub fn packed_size(&self) -> usize {
        PAYLOAD_HEADER_SIZE + self.segments.len() * SEGMENT_SIZE + self.values.data().len()
    }

    /// Appends the encoded payload to `out`.
    pub fn pack(&self, out: &mut Vec<u8>) {
        out.reserve(self.packed_size());
        self.header().write_to(out);
        out.extend_from_slice(bytemuck::cast_slice(self.segments));
        out.extend_from_slice(self.values.data());
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.packed_size());
        self.pack(&mut out);
        out
    }

    /// Copies the view into an owned payload.
    pub fn to_payload(&self) -> Payload {
        Payload {
            kind: self.kind(),
            segments: self.segments.to_vec(),
            data: self.values.data().to_vec(),
            var_offset: self.values.var_offset(),
        }
    }

    /// Decodes every cell into owned values.
    pub fn to_values(&self) -> Vec<Value> {
        self.values().map(|v| v.to_owned()).collect()
    }

    /// Writes a human-readable listing of the segments to `sink`.
    pub fn dump(&self, sink: &mut impl fmt::Write) -> fmt::Result {
        writeln!(
            sink,
            "payload: {} cells, {} segments, {:?}, {} data bytes",
            self.len(),
            self.segment_count(),
            self.kind(),
            self.values.data().len()
        )?;
        for span in self.spans() {
            let s = span.segment;
            if let Some(reason) = s.missing_reason() {
                writeln!(sink, "  [{}; {}) null({reason})", span.position, span.end())?;
            } else if s.is_run() {
                writeln!(
                    sink,
                    "  [{}; {}) run {:?}",
                    span.position,
                    span.end(),
                    self.values.get(s.data_index() as usize)
                )?;
            } else {
                writeln!(
                    sink,
                    "  [{}; {}) literal @{}",
                    span.position,
                    span.end(),
                    s.data_index()
                )?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for PayloadView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadView")
            .field("len", &self.len())
            .field("kind", &self.kind())
            .field("segments", &self.segments())
            .finish()
    }
}

/// One segment with its position and length in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub position: Position,
    pub length: u64,
    pub segment: Segment,
}

impl Span {
    #[inline]
    pub fn end(&self) -> Position {
        self.position + self.length
    }
}

/// Owned payload, immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct Payload {
    pub(crate) kind: ElementKind,
    pub(crate) segments: Vec<Segment>,
    pub(crate) data: Vec<u8>,
    pub(crate) var_offset: usize,
}

impl Payload {
    /// Payload of zero cells.
    pub fn empty(kind: ElementKind) -> Payload {
        Payload {
            kind,
            segments: vec![Segment::terminal(0)],
            data: Vec::new(),
            var_offset: 0,
        }
    }

    /// Assembles a payload from its parts, validating them like a decoded buffer.
    ///
    /// `segments` must end with the terminal segment.
    pub fn from_parts(
        kind: ElementKind,
        segments: Vec<Segment>,
        data: Vec<u8>,
        var_offset: usize,
    ) -> Result<Payload> {
        verify_arg!(var_offset, var_offset <= data.len());
        let var_offset = if kind.is_variable() {
            var_offset
        } else {
            data.len()
        };
        PayloadView::new(&segments, ValueSlice::new(kind, &data, var_offset))?;
        Ok(Payload {
            kind,
            segments,
            data,
            var_offset,
        })
    }

    /// Payload of `len` copies of `value`, encoded as a single run (or a null run).
    pub fn filled(kind: ElementKind, value: ValueRef<'_>, len: u64) -> Result<Payload> {
        let mut builder = PayloadBuilder::new(kind);
        builder.push_repeated(value, len)?;
        Ok(builder.finish())
    }

    /// Payload with one literal segment over `count` raw values.
    pub fn from_dense(
        kind: ElementKind,
        data: Vec<u8>,
        var_offset: usize,
        count: u64,
    ) -> Result<Payload> {
        let segments = if count == 0 {
            vec![Segment::terminal(0)]
        } else {
            vec![Segment::literal(0, 0), Segment::terminal(count)]
        };
        Payload::from_parts(kind, segments, data, var_offset)
    }

    /// Payload of `len` cells built from `(position, value)` pairs in increasing position
    /// order. Positions without a value get `default`.
    pub fn from_sparse<'v, I>(
        kind: ElementKind,
        cells: I,
        len: u64,
        default: ValueRef<'_>,
    ) -> Result<Payload>
    where
        I: IntoIterator<Item = (Position, ValueRef<'v>)>,
    {
        let mut builder = PayloadBuilder::new(kind);
        for (pos, value) in cells {
            verify_arg!(cells, pos >= builder.len() && pos < len);
            builder.push_repeated(default, pos - builder.len())?;
            builder.push(value)?;
        }
        builder.push_repeated(default, len - builder.len())?;
        Ok(builder.finish())
    }

    pub fn view(&self) -> PayloadView<'_> {
        PayloadView::new_unchecked(
            &self.segments,
            ValueSlice::new(self.kind, &self.data, self.var_offset),
        )
    }

    /// Decodes an encoded payload into an owned copy.
    pub fn from_bytes(buffer: &[u8]) -> Result<Payload> {
        PayloadView::from_bytes(buffer).map(|view| view.to_payload())
    }

    #[inline]
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    #[inline]
    pub fn len(&self) -> Position {
        self.view().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn segment_count(&self) -> usize {
        self.segments.len() - 1
    }

    #[inline]
    pub fn segments(&self) -> &[Segment] {
        &self.segments[..self.segments.len() - 1]
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn value_at(&self, pos: Position) -> Option<ValueRef<'_>> {
        self.view().value_at(pos)
    }

    pub fn to_values(&self) -> Vec<Value> {
        self.view().to_values()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.view().to_bytes()
    }

    /// Shortens the payload to `len` cells by moving the terminal segment.
    ///
    /// # Panics
    ///
    /// Panics if `len` would drop a whole segment or extend the payload.
    pub fn trim(&mut self, len: Position) {
        assert!(len <= self.len(), "trim cannot extend a payload");
        let n = self.segment_count();
        if n > 0 {
            assert!(
                len > self.segments[n - 1].start_position(),
                "trim cannot drop segments"
            );
        } else {
            assert_eq!(len, 0);
        }
        self.segments[n].set_start_position(len);
    }

    /// Missing reason of the cell at `pos`, `None` if the cell has a value.
    pub fn missing_reason_at(&self, pos: Position) -> Option<MissingReason> {
        self.value_at(pos).and_then(|v| v.missing_reason())
    }

    pub fn into_parts(self) -> (ElementKind, Vec<Segment>, Vec<u8>, usize) {
        (self.kind, self.segments, self.data, self.var_offset)
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.view().fmt(f)
    }
}

/// Random-access reader that remembers the last located segment.
///
/// Reads at nondecreasing positions resolve in constant time; any other access falls back to
/// a binary search.
#[derive(Clone)]
pub struct PayloadCursor<'a> {
    view: PayloadView<'a>,
    current: usize,
}

impl<'a> PayloadCursor<'a> {
    fn locate(&mut self, pos: Position) -> Option<usize> {
        let n = self.view.segment_count();
        let segments = self.view.segments;
        let within = |i: usize| {
            i < n && segments[i].start_position() <= pos && pos < segments[i + 1].start_position()
        };
        if within(self.current) {
            return Some(self.current);
        }
        if within(self.current + 1) {
            self.current += 1;
            return Some(self.current);
        }
        let found = self.view.find_segment(pos)?;
        self.current = found;
        Some(found)
    }

    pub fn value_at(&mut self, pos: Position) -> Option<ValueRef<'a>> {
        self.locate(pos)
            .map(|i| self.view.value_in_segment(i, pos))
    }

    /// Index of the segment containing `pos`.
    pub fn segment_index(&mut self, pos: Position) -> Option<usize> {
        self.locate(pos)
    }
}

/// Cell-level cursor over a payload.
#[derive(Clone)]
pub struct PayloadIter<'a> {
    view: PayloadView<'a>,
    seg: usize,
    pos: Position,
}

impl<'a> PayloadIter<'a> {
    pub fn new(view: PayloadView<'a>) -> PayloadIter<'a> {
        PayloadIter {
            view,
            seg: 0,
            pos: 0,
        }
    }

    #[inline]
    pub fn view(&self) -> PayloadView<'a> {
        self.view
    }

    #[inline]
    pub fn is_end(&self) -> bool {
        self.seg >= self.view.segment_count()
    }

    #[inline]
    pub fn position(&self) -> Position {
        self.pos
    }

    #[inline]
    pub fn segment_index(&self) -> usize {
        self.seg
    }

    #[inline]
    pub fn segment(&self) -> Segment {
        self.view.segments[self.seg]
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.segment().is_null()
    }

    #[inline]
    pub fn is_run(&self) -> bool {
        self.segment().is_run()
    }

    #[inline]
    pub fn missing_reason(&self) -> Option<MissingReason> {
        self.segment().missing_reason()
    }

    /// Number of cells left in the current segment.
    #[inline]
    pub fn available(&self) -> u64 {
        self.view.segments[self.seg + 1].start_position() - self.pos
    }

    /// Index in the value buffer of the current cell's value.
    ///
    /// # Panics
    ///
    /// Panics on a null cell.
    #[inline]
    pub fn value_index(&self) -> usize {
        let s = self.segment();
        assert!(!s.is_null(), "null cells have no value index");
        if s.is_run() {
            s.data_index() as usize
        } else {
            s.data_index() as usize + (self.pos - s.start_position()) as usize
        }
    }

    #[inline]
    pub fn value(&self) -> ValueRef<'a> {
        self.view.value_in_segment(self.seg, self.pos)
    }

    /// Moves `count` cells forward, crossing segment boundaries as needed.
    pub fn advance(&mut self, count: u64) {
        self.pos += count;
        assert!(self.pos <= self.view.len(), "advanced past the end");
        let n = self.view.segment_count();
        while self.seg < n && self.pos >= self.view.segments[self.seg + 1].start_position() {
            self.seg += 1;
        }
    }

    /// Moves to the first cell of the next segment.
    pub fn next_segment(&mut self) {
        self.pos = self.view.segments[self.seg + 1].start_position();
        self.seg += 1;
    }

    /// Moves to `pos`. Returns `false` and moves to the end if `pos` is past the end.
    pub fn seek(&mut self, pos: Position) -> bool {
        match self.view.find_segment(pos) {
            Some(seg) => {
                self.seg = seg;
                self.pos = pos;
                true
            }
            None => {
                self.seg = self.view.segment_count();
                self.pos = self.view.len();
                false
            }
        }
    }

    pub fn reset(&mut self) {
        self.seg = 0;
        self.pos = 0;
    }
}

/// Iterator over every cell of a payload.
#[derive(Clone)]
pub struct Values<'a> {
    iter: PayloadIter<'a>,
}

impl<'a> Iterator for Values<'a> {
    type Item = ValueRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.iter.is_end() {
            return None;
        }
        let value = self.iter.value();
        self.iter.advance(1);
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.iter.view.len() - self.iter.pos) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Values<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[Option<i64>]) -> Payload {
        let mut builder = PayloadBuilder::new(ElementKind::Fixed(8));
        for v in values {
            match v {
                Some(v) => builder.push(Value::from(*v).as_ref()).unwrap(),
                None => builder.push_null(3).unwrap(),
            }
        }
        builder.finish()
    }

    #[test]
    fn test_value_at() {
        let p = ints(&[Some(5), None, None, Some(7)]);
        assert_eq!(p.segment_count(), 3);
        assert_eq!(p.len(), 4);
        assert_eq!(p.value_at(0).and_then(|v| v.as_i64()), Some(5));
        assert_eq!(p.value_at(1), Some(ValueRef::Null(3)));
        assert_eq!(p.value_at(2), Some(ValueRef::Null(3)));
        assert_eq!(p.missing_reason_at(2), Some(3));
        assert_eq!(p.value_at(3).and_then(|v| v.as_i64()), Some(7));
        assert_eq!(p.value_at(4), None);
    }

    #[test]
    fn test_empty_payload() {
        let p = Payload::empty(ElementKind::Variable);
        assert!(p.is_empty());
        assert_eq!(p.segment_count(), 0);
        assert_eq!(p.view().value_count(), 0);
        assert_eq!(p.value_at(0), None);
        let bytes = p.to_bytes();
        assert_eq!(bytes.len(), PAYLOAD_HEADER_SIZE + SEGMENT_SIZE);
        assert_eq!(Payload::from_bytes(&bytes).unwrap(), p);
    }

    #[test]
    fn test_null_reasons_do_not_count_as_values() {
        let p = ints(&[Some(5), None, None, Some(7)]);
        assert_eq!(p.view().value_count(), 2);
        let decoded = Payload::from_bytes(&p.to_bytes()).unwrap();
        assert_eq!(decoded, p);
        assert_eq!(decoded.value_at(2), Some(ValueRef::Null(3)));

        let nulls = Payload::filled(ElementKind::Fixed(4), ValueRef::Null(1), 4).unwrap();
        assert_eq!(nulls.view().value_count(), 0);
        let decoded = Payload::from_bytes(&nulls.to_bytes()).unwrap();
        assert_eq!(decoded.len(), 4);
        assert_eq!(decoded.value_at(3), Some(ValueRef::Null(1)));

        let wide = Payload::filled(ElementKind::Variable, ValueRef::Null(1 << 20), 9).unwrap();
        assert_eq!(Payload::from_bytes(&wide.to_bytes()).unwrap(), wide);
    }

    #[test]
    fn test_header_layout() {
        let p = ints(&[Some(1), Some(2)]);
        let bytes = p.to_bytes();
        assert_eq!(bytes.read_value::<u64>(0), PAYLOAD_MAGIC);
        assert_eq!(bytes.read_value::<u64>(8), 1);
        assert_eq!(bytes.read_value::<u64>(16), 8);
        assert_eq!(bytes.read_value::<u64>(24), 16);
        assert_eq!(bytes.read_value::<u64>(32), 16);
        assert_eq!(bytes[40], 0);
        assert_eq!(bytes.len(), 48 + 2 * 12 + 16);
    }

    #[test]
    fn test_cursor_matches_binary_search() {
        let values: Vec<_> = (0..200)
            .map(|i| if i % 17 == 0 { None } else { Some(i / 5) })
            .collect();
        let p = ints(&values);
        let view = p.view();
        let mut cursor = view.cursor();
        for pos in (0..200).chain((0..200).rev()).chain([150, 3, 199, 0]) {
            assert_eq!(cursor.value_at(pos), view.value_at(pos));
        }
        assert_eq!(cursor.value_at(200), None);
    }

    #[test]
    fn test_iter_walks_segments() {
        let p = ints(&[Some(1), Some(1), Some(1), None, Some(2), Some(3)]);
        let mut iter = p.view().iter();
        assert!(!iter.is_end());
        assert!(iter.is_run());
        assert_eq!(iter.available(), 3);
        iter.advance(2);
        assert_eq!(iter.available(), 1);
        assert_eq!(iter.value_index(), 0);
        iter.next_segment();
        assert!(iter.is_null());
        assert_eq!(iter.position(), 3);
        iter.advance(2);
        assert_eq!(iter.value().as_i64(), Some(3));
        iter.advance(1);
        assert!(iter.is_end());
        assert!(iter.seek(4));
        assert_eq!(iter.value().as_i64(), Some(2));
        assert!(!iter.seek(6));
        assert!(iter.is_end());
    }

    #[test]
    fn test_filled_and_sparse() {
        let p = Payload::filled(ElementKind::Fixed(4), Value::from(9i32).as_ref(), 1000).unwrap();
        assert_eq!(p.segment_count(), 1);
        assert_eq!(p.data().len(), 4);
        assert_eq!(p.value_at(999).and_then(|v| v.as_i64()), Some(9));

        let nulls = Payload::filled(ElementKind::Variable, ValueRef::Null(4), 10).unwrap();
        assert_eq!(nulls.segments(), &[Segment::null_run(0, 4)]);

        let cells = [(2u64, ValueRef::Bytes(b"a")), (5, ValueRef::Bytes(b"b"))];
        let sparse =
            Payload::from_sparse(ElementKind::Variable, cells, 7, ValueRef::Null(0)).unwrap();
        let decoded = sparse.to_values();
        assert_eq!(decoded.len(), 7);
        assert_eq!(decoded[2], Value::from("a"));
        assert_eq!(decoded[5], Value::from("b"));
        assert!(decoded[6].is_null());

        let unordered = [(5u64, ValueRef::Bytes(b"b")), (2, ValueRef::Bytes(b"a"))];
        assert!(
            Payload::from_sparse(ElementKind::Variable, unordered, 7, ValueRef::Null(0)).is_err()
        );
    }

    #[test]
    fn test_from_dense() {
        let data: Vec<u8> = [1i16, 2, 3].iter().flat_map(|v| v.to_le_bytes()).collect();
        let p = Payload::from_dense(ElementKind::Fixed(2), data, 0, 3).unwrap();
        assert_eq!(p.segments(), &[Segment::literal(0, 0)]);
        assert_eq!(p.value_at(2).and_then(|v| v.as_i64()), Some(3));
        assert!(Payload::from_dense(ElementKind::Fixed(2), vec![0; 4], 0, 3).is_err());
    }

    #[test]
    fn test_trim() {
        let mut p = ints(&[Some(1), Some(2), Some(3), Some(4)]);
        p.trim(2);
        assert_eq!(p.len(), 2);
        assert_eq!(p.to_values().len(), 2);
    }

    #[test]
    fn test_dump() {
        let p = ints(&[Some(1), None]);
        let mut out = String::new();
        p.view().dump(&mut out).unwrap();
        assert!(out.starts_with("payload: 2 cells, 2 segments"));
        assert!(out.contains("[1; 2) null(3)"));
    }
}
