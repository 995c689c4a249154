//! The single-value append state machine shared by every run-length builder.
//!
//! Values are pushed one at a time. Each value first extends the current literal segment; once
//! the tail of the literal repeats the same value `max_run_len` times, the repeated tail is
//! stripped from the value buffer and replaced by a run segment. Nulls are encoded as null run
//! segments that carry the missing reason instead of a value.

use tessel_common::{Result, error::Error};

use crate::segment::{MAX_DATA_INDEX, MissingReason, Position, Segment};

/// Value storage driven by [`RunLengthWriter`].
pub trait RunStore<V: ?Sized> {
    /// Number of stored values.
    fn value_count(&self) -> usize;

    /// Appends a value. On error the store must be left unchanged.
    fn push_value(&mut self, value: &V) -> Result<()>;

    /// Drops the values from `len` onwards.
    fn truncate_values(&mut self, len: usize);

    /// Returns `true` if the value stored at `index` is the same as `value`.
    fn matches(&self, index: usize, value: &V) -> bool;
}

/// State of the segment currently being appended to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// Nothing has been pushed yet.
    Empty,
    /// The last segment is a literal that may still turn its tail into a run.
    OpenLiteral,
    /// The last segment is a run of the last distinct value.
    OpenRun,
    /// The last segment is a null run with the given reason.
    OpenNull(MissingReason),
    /// The terminal segment was appended, no more pushes are accepted.
    Finalized,
}

#[derive(Debug, Clone)]
pub struct RunLengthWriter {
    segments: Vec<Segment>,
    state: WriterState,
    next_position: Position,
    last_distinct: usize,
    max_run_len: usize,
}

impl RunLengthWriter {
    /// Creates a writer that converts `max_run_len` repeated values into a run.
    pub fn new(max_run_len: usize) -> RunLengthWriter {
        assert!(max_run_len >= 1);
        RunLengthWriter {
            segments: Vec::new(),
            state: WriterState::Empty,
            next_position: 0,
            last_distinct: 0,
            max_run_len,
        }
    }

    #[inline]
    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Number of cells pushed so far.
    #[inline]
    pub fn len(&self) -> Position {
        self.next_position
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.next_position == 0
    }

    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.state == WriterState::Finalized
    }

    #[inline]
    pub fn max_run_len(&self) -> usize {
        self.max_run_len
    }

    /// Segments written so far. Once finalized, the last one is the terminal segment.
    #[inline]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn reserve(&mut self, additional: usize) {
        self.segments.reserve(additional);
    }

    pub fn clear(&mut self) {
        self.segments.clear();
        self.state = WriterState::Empty;
        self.next_position = 0;
        self.last_distinct = 0;
    }

    #[inline]
    fn check_open(&self) {
        assert_ne!(
            self.state,
            WriterState::Finalized,
            "push into a finalized encoder"
        );
    }

    fn data_index(index: usize) -> Result<u32> {
        u32::try_from(index)
            .ok()
            .filter(|&i| i <= MAX_DATA_INDEX)
            .ok_or_else(|| Error::invalid_operation("value buffer exceeds the data index range"))
    }

    /// Appends one non-null value.
    ///
    /// # Panics
    ///
    /// Panics if the writer is finalized.
    pub fn push_value<V, S>(&mut self, store: &mut S, value: &V) -> Result<()>
    where
        V: ?Sized,
        S: RunStore<V>,
    {
        self.check_open();
        match self.state {
            WriterState::Empty | WriterState::OpenNull(_) => {
                let index = Self::data_index(store.value_count())?;
                store.push_value(value)?;
                self.segments
                    .push(Segment::literal(self.next_position, index));
                self.last_distinct = index as usize;
                self.state = WriterState::OpenLiteral;
            }
            WriterState::OpenLiteral if store.matches(self.last_distinct, value) => {
                let repeats = store.value_count() - self.last_distinct;
                if repeats >= self.max_run_len {
                    self.close_repeated_tail(store);
                } else {
                    Self::data_index(store.value_count())?;
                    store.push_value(value)?;
                }
            }
            WriterState::OpenRun if store.matches(self.last_distinct, value) => {}
            WriterState::OpenLiteral | WriterState::OpenRun => {
                let index = Self::data_index(store.value_count())?;
                store.push_value(value)?;
                self.last_distinct = index as usize;
                if self.state == WriterState::OpenRun {
                    self.segments
                        .push(Segment::literal(self.next_position, index));
                    self.state = WriterState::OpenLiteral;
                }
            }
            WriterState::Finalized => unreachable!(),
        }
        self.next_position += 1;
        Ok(())
    }

    /// Replaces the `max_run_len` trailing copies of the last distinct value (the one being
    /// pushed included) by a run segment.
    fn close_repeated_tail<V: ?Sized, S: RunStore<V>>(&mut self, store: &mut S) {
        let kept = store.value_count() - (self.max_run_len - 1);
        store.truncate_values(kept);
        let run_len = self.max_run_len as u64;
        let current = self.segments.len() - 1;
        let literal_len = self.next_position - self.segments[current].start_position();
        if literal_len > run_len {
            self.segments.push(Segment::run(
                self.next_position - run_len,
                (kept - 1) as u32,
            ));
        } else {
            self.segments[current].set_run(true);
        }
        self.state = WriterState::OpenRun;
    }

    /// Appends `count` copies of a non-null value.
    pub fn push_repeated<V, S>(&mut self, store: &mut S, value: &V, count: u64) -> Result<()>
    where
        V: ?Sized,
        S: RunStore<V>,
    {
        if count == 0 {
            return Ok(());
        }
        self.push_value(store, value)?;
        let mut remaining = count - 1;
        while remaining > 0 && self.state != WriterState::OpenRun {
            self.push_value(store, value)?;
            remaining -= 1;
        }
        self.next_position += remaining;
        Ok(())
    }

    /// Appends one missing cell.
    ///
    /// # Panics
    ///
    /// Panics if the writer is finalized.
    pub fn push_null(&mut self, reason: MissingReason) -> Result<()> {
        self.check_open();
        if reason > MAX_DATA_INDEX {
            return Err(Error::invalid_arg(
                "reason",
                format!("missing reason {reason} exceeds {MAX_DATA_INDEX}"),
            ));
        }
        if self.state != WriterState::OpenNull(reason) {
            self.segments
                .push(Segment::null_run(self.next_position, reason));
            self.state = WriterState::OpenNull(reason);
        }
        self.next_position += 1;
        Ok(())
    }

    /// Appends `count` missing cells sharing one reason.
    pub fn push_nulls(&mut self, reason: MissingReason, count: u64) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        self.push_null(reason)?;
        self.next_position += count - 1;
        Ok(())
    }

    /// Appends the terminal segment. Finalizing twice is a no-op.
    pub fn finalize(&mut self) {
        if self.state != WriterState::Finalized {
            self.segments.push(Segment::terminal(self.next_position));
            self.state = WriterState::Finalized;
        }
    }

    /// Finalizes the writer and returns the segments, terminal segment included.
    pub fn finish(mut self) -> Vec<Segment> {
        self.finalize();
        self.segments
    }

    /// Creates a finalized writer over decoded segments, terminal segment included.
    ///
    /// # Panics
    ///
    /// Panics if `segments` is empty.
    pub fn from_segments(segments: Vec<Segment>, max_run_len: usize) -> RunLengthWriter {
        assert!(!segments.is_empty(), "segment list without terminal");
        let len = segments.last().map_or(0, |s| s.start_position());
        RunLengthWriter {
            segments,
            state: WriterState::Finalized,
            next_position: len,
            last_distinct: 0,
            max_run_len,
        }
    }

    /// Segments holding cells, the terminal segment excluded.
    #[inline]
    fn data_segments(&self) -> &[Segment] {
        match self.state {
            WriterState::Finalized => &self.segments[..self.segments.len() - 1],
            _ => &self.segments,
        }
    }

    /// Index of the segment holding the cell at `pos`.
    pub fn find_segment(&self, pos: Position) -> Option<usize> {
        if pos >= self.next_position {
            return None;
        }
        let segments = self.data_segments();
        Some(segments.partition_point(|s| s.start_position() <= pos) - 1)
    }

    /// Position just past the last cell of segment `seg`.
    pub fn segment_end(&self, seg: usize) -> Position {
        self.data_segments()
            .get(seg + 1)
            .map_or(self.next_position, |s| s.start_position())
    }

    /// Content of the cell at `pos`, which must lie in segment `seg`.
    pub fn cell_in_segment(&self, seg: usize, pos: Position) -> CellRef {
        let s = self.segments[seg];
        debug_assert!(s.start_position() <= pos && pos < self.segment_end(seg));
        match s.missing_reason() {
            Some(reason) => CellRef::Missing(reason),
            None if s.is_run() => CellRef::Value(s.data_index() as usize),
            None => CellRef::Value(s.data_index() as usize + (pos - s.start_position()) as usize),
        }
    }

    /// Content of the cell at `pos`, `None` past the end.
    pub fn cell(&self, pos: Position) -> Option<CellRef> {
        let seg = self.find_segment(pos)?;
        Some(self.cell_in_segment(seg, pos))
    }
}

/// Location of a cell's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellRef {
    /// The cell is missing for the given reason.
    Missing(MissingReason),
    /// The cell holds the value stored at this index.
    Value(usize),
}

impl<'v> RunStore<crate::value::ValueRef<'v>> for crate::values::ValueBuffer {
    #[inline]
    fn value_count(&self) -> usize {
        self.len()
    }

    #[inline]
    fn push_value(&mut self, value: &crate::value::ValueRef<'v>) -> Result<()> {
        self.push(*value)
    }

    #[inline]
    fn truncate_values(&mut self, len: usize) {
        self.truncate(len)
    }

    #[inline]
    fn matches(&self, index: usize, value: &crate::value::ValueRef<'v>) -> bool {
        crate::values::ValueBuffer::matches(self, index, *value)
    }
}
