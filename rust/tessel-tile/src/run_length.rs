use std::fmt;

use tessel_common::{Result, verify_arg};
use tessel_rle::{
    ElementKind, MissingReason, Payload, PayloadView, Position, Segment,
    range::extract_range,
    scalar::{Scalar, ValueReader, ValueWriter},
    writer::{CellRef, RunLengthWriter, RunStore},
};

use crate::{config::EncodingKind, datum::Datum, encoding::Encoding};

/// Typed values backing a [`RunLengthEncoding`].
#[derive(Debug, Clone, Default)]
struct ScalarStore<T>(Vec<T>);

impl<T: Scalar> RunStore<T> for ScalarStore<T> {
    #[inline]
    fn value_count(&self) -> usize {
        self.0.len()
    }

    #[inline]
    fn push_value(&mut self, value: &T) -> Result<()> {
        self.0.push(*value);
        Ok(())
    }

    #[inline]
    fn truncate_values(&mut self, len: usize) {
        self.0.truncate(len);
    }

    #[inline]
    fn matches(&self, index: usize, value: &T) -> bool {
        self.0[index].same_as(value)
    }
}

/// Run-length encoded storage of fixed-width scalars.
///
/// Uses the same segment layout as a fixed-size [`Payload`], so a finished encoding converts
/// to a payload without re-encoding.
#[derive(Debug, Clone)]
pub struct RunLengthEncoding<T> {
    writer: RunLengthWriter,
    values: ScalarStore<T>,
}

impl<T: Scalar> RunLengthEncoding<T> {
    pub fn new() -> RunLengthEncoding<T> {
        RunLengthEncoding {
            writer: RunLengthWriter::new(Self::element_kind().max_run_len()),
            values: ScalarStore(Vec::new()),
        }
    }

    /// Element kind of the payloads this encoding converts to and from.
    pub fn element_kind() -> ElementKind {
        ElementKind::Fixed(T::SIZE as u32)
    }

    /// Stored distinct values.
    pub fn values(&self) -> &[T] {
        &self.values.0
    }

    pub fn segment_count(&self) -> usize {
        self.writer
            .segments()
            .len()
            .saturating_sub(self.writer.is_finalized() as usize)
    }

    /// Appends `count` copies of `value`.
    pub fn push_repeated(&mut self, value: T, count: u64) -> Result<()> {
        self.writer
            .push_repeated(&mut self.values, &value, count)
    }

    /// Cursor for reads in increasing index order.
    pub fn cursor(&self) -> RunLengthCursor<'_, T> {
        RunLengthCursor {
            encoding: self,
            seg: 0,
        }
    }

    /// Decodes the cells `[offset, offset + count)` of a fixed-size payload of `T`. The
    /// resulting encoding is finalized.
    pub fn from_payload(view: &PayloadView<'_>, offset: Position, count: u64) -> Result<Self> {
        verify_arg!(view, view.kind() == Self::element_kind());
        let mut encoding = RunLengthEncoding::new();
        let extract = extract_range(view, offset, count)?;
        let fixed = view.value_slice().fixed_part();
        encoding.values.0 = extract
            .values
            .map(|i| fixed.read_value::<T>(i * T::SIZE))
            .collect();
        encoding.writer =
            RunLengthWriter::from_segments(extract.segments, Self::element_kind().max_run_len());
        Ok(encoding)
    }

    /// Encodes the cells into a payload. An open encoding stays open.
    pub fn to_payload(&self) -> Result<Payload> {
        let mut segments = self.writer.segments().to_vec();
        if !self.writer.is_finalized() {
            segments.push(Segment::terminal(self.writer.len()));
        }
        let mut data = Vec::with_capacity(self.values.0.len() * T::SIZE);
        for value in &self.values.0 {
            data.write_value(*value);
        }
        let var_offset = data.len();
        Payload::from_parts(Self::element_kind(), segments, data, var_offset)
    }

    fn datum(&self, cell: CellRef) -> Datum<T> {
        match cell {
            CellRef::Missing(reason) => Datum::missing(reason),
            CellRef::Value(index) => Datum::present(self.values.0[index]),
        }
    }
}

impl<T: Scalar> Default for RunLengthEncoding<T> {
    fn default() -> Self {
        RunLengthEncoding::new()
    }
}

impl<T: Scalar> Encoding<T> for RunLengthEncoding<T> {
    fn kind(&self) -> EncodingKind {
        EncodingKind::RunLength
    }

    fn len(&self) -> u64 {
        self.writer.len()
    }

    fn push(&mut self, value: T) -> Result<()> {
        self.writer.push_value(&mut self.values, &value)
    }

    fn push_null(&mut self, reason: MissingReason) -> Result<()> {
        self.writer.push_null(reason)
    }

    fn get(&self, index: u64) -> Datum<T> {
        let Some(cell) = self.writer.cell(index) else {
            panic!("index {index} out of range for {} cells", self.writer.len());
        };
        self.datum(cell)
    }

    fn reserve(&mut self, additional: usize) {
        self.values.0.reserve(additional);
    }

    fn finalize(&mut self) {
        self.writer.finalize();
    }

    fn is_finalized(&self) -> bool {
        self.writer.is_finalized()
    }

    fn clear(&mut self) {
        self.writer.clear();
        self.values.0.clear();
    }

    fn dump(&self, sink: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(
            sink,
            "run-length: {} cells, {} segments, {} values",
            self.writer.len(),
            self.segment_count(),
            self.values.0.len()
        )?;
        let segments = &self.writer.segments()[..self.segment_count()];
        for (i, s) in segments.iter().enumerate() {
            let start = s.start_position();
            let end = self.writer.segment_end(i);
            if let Some(reason) = s.missing_reason() {
                writeln!(sink, "  [{start}; {end}) null({reason})")?;
            } else if s.is_run() {
                writeln!(
                    sink,
                    "  [{start}; {end}) run {:?}",
                    self.values.0[s.data_index() as usize]
                )?;
            } else {
                let first = s.data_index() as usize;
                let values = &self.values.0[first..first + (end - start) as usize];
                writeln!(sink, "  [{start}; {end}) literal {values:?}")?;
            }
        }
        Ok(())
    }
}

/// Reader that remembers the segment of the last lookup.
///
/// Reading the same segment again, or the one after it, skips the binary search.
pub struct RunLengthCursor<'a, T> {
    encoding: &'a RunLengthEncoding<T>,
    seg: usize,
}

impl<T: Scalar> RunLengthCursor<'_, T> {
    /// Reads the cell at `index`, `None` past the end.
    pub fn get(&mut self, index: u64) -> Option<Datum<T>> {
        let writer = &self.encoding.writer;
        if index >= writer.len() {
            return None;
        }
        let in_segment = |seg: usize| {
            seg < writer.segments().len()
                && writer.segments()[seg].start_position() <= index
                && index < writer.segment_end(seg)
        };
        if !in_segment(self.seg) {
            self.seg = if in_segment(self.seg + 1) {
                self.seg + 1
            } else {
                writer.find_segment(index)?
            };
        }
        Some(self.encoding.datum(writer.cell_in_segment(self.seg, index)))
    }

    /// Index of the segment of the last lookup.
    #[inline]
    pub fn segment_index(&self) -> usize {
        self.seg
    }
}
