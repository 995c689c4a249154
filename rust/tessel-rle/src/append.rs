//! Streaming construction of a payload from other payloads.
//!
//! [`AppendIterator`] pulls whole stretches of cells out of a source [`PayloadIter`] instead of
//! pushing values one by one: a run of the source costs a single value copy, a literal stretch
//! is copied in bulk.

use tessel_common::{Result, error::Error, verify_arg};

use crate::{
    element::ElementKind,
    payload::{Payload, PayloadIter, PayloadView},
    segment::{MAX_DATA_INDEX, Position, Segment},
    value::ValueRef,
    values::ValueBuffer,
};

#[derive(Debug, Clone, Copy)]
struct OpenSegment {
    position: Position,
    is_run: bool,
    is_null: bool,
    data_index: u32,
}

impl OpenSegment {
    fn to_segment(self) -> Segment {
        match (self.is_null, self.is_run) {
            (true, _) => Segment::null_run(self.position, self.data_index),
            (false, true) => Segment::run(self.position, self.data_index),
            (false, false) => Segment::literal(self.position, self.data_index),
        }
    }
}

pub struct AppendIterator {
    segments: Vec<Segment>,
    values: ValueBuffer,
    open: OpenSegment,
    open_len: u64,
    prev_value: Option<usize>,
}

impl AppendIterator {
    pub fn new(kind: ElementKind) -> AppendIterator {
        AppendIterator {
            segments: Vec::new(),
            values: ValueBuffer::new(kind),
            open: OpenSegment {
                position: 0,
                is_run: false,
                is_null: false,
                data_index: 0,
            },
            open_len: 0,
            prev_value: None,
        }
    }

    #[inline]
    pub fn kind(&self) -> ElementKind {
        self.values.kind()
    }

    /// Number of cells appended so far.
    #[inline]
    pub fn len(&self) -> Position {
        self.open.position + self.open_len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn close_segment(&mut self) {
        if self.open_len != 0 {
            self.segments.push(self.open.to_segment());
            self.open.position += self.open_len;
            self.open_len = 0;
        }
    }

    fn next_index(&self) -> Result<u32> {
        let index = self.values.len();
        if index > MAX_DATA_INDEX as usize {
            return Err(Error::invalid_operation(
                "value buffer exceeds the data index range",
            ));
        }
        Ok(index as u32)
    }

    fn repeats_prev(&self, value: ValueRef<'_>) -> bool {
        self.open_len != 0
            && !self.open.is_null
            && self
                .prev_value
                .is_some_and(|i| self.values.matches(i, value))
    }

    /// Continues the open segment with `count` more copies of the last copied value.
    fn repeat_prev(&mut self, count: u64) {
        if self.open.is_run {
            self.open_len += count;
        } else {
            // the last literal cell becomes the first cell of the run
            let last = self.values.len() - 1;
            self.segments.push(self.open.to_segment());
            self.open.position += self.open_len - 1;
            self.open.is_run = true;
            self.open.data_index = last as u32;
            self.open_len = 1 + count;
        }
    }

    fn add_nulls(&mut self, reason: u32, count: u64) {
        if self.open_len != 0 && !(self.open.is_null && self.open.data_index == reason) {
            self.close_segment();
        }
        if self.open_len == 0 {
            self.open.is_null = true;
            self.open.is_run = true;
            self.open.data_index = reason;
        }
        self.open_len += count;
    }

    /// Copies up to `limit` cells from the current segment of `src` and advances `src` past
    /// them. Returns the number of cells copied, zero once `src` is exhausted.
    ///
    /// A source run or single cell equal to the last copied value continues the open segment.
    pub fn add(&mut self, src: &mut PayloadIter<'_>, limit: u64) -> Result<u64> {
        if src.is_end() || limit == 0 {
            return Ok(0);
        }
        verify_arg!(src, src.view().kind() == self.kind());
        let count = src.available().min(limit);
        if let Some(reason) = src.missing_reason() {
            self.add_nulls(reason, count);
        } else if (count == 1 || src.is_run()) && self.repeats_prev(src.value()) {
            self.repeat_prev(count);
        } else {
            let index = self.next_index()?;
            let incoming_run = src.is_run();
            if self.open_len != 0
                && (self.open.is_null
                    || (self.open.is_run && self.open_len > 1)
                    || (incoming_run && count > 1))
            {
                self.close_segment();
            }
            if self.open_len == 0 {
                self.open.is_null = false;
                self.open.is_run = count == 1 || incoming_run;
                self.open.data_index = index;
            } else {
                self.open.is_run = false;
            }
            self.open_len += count;
            let copied = if self.open.is_run { 1 } else { count as usize };
            self.values
                .extend_from_slice(&src.view().value_slice(), src.value_index(), copied);
            self.prev_value = Some(self.values.len() - 1);
        }
        src.advance(count);
        Ok(count)
    }

    /// Copies every remaining cell of `src`.
    pub fn add_all(&mut self, src: &mut PayloadIter<'_>) -> Result<u64> {
        let mut total = 0;
        while !src.is_end() {
            total += self.add(src, u64::MAX)?;
        }
        Ok(total)
    }

    /// Appends every cell of `view`.
    pub fn append_view(&mut self, view: &PayloadView<'_>) -> Result<u64> {
        self.add_all(&mut view.iter())
    }

    /// Appends `count` copies of `value`. A value equal to the previously appended one extends
    /// the current run, or splits the last cell of the current literal off into a new run.
    ///
    /// Returns a truncation error, leaving the iterator unchanged, if the value does not fit.
    pub fn add_value(&mut self, value: ValueRef<'_>, count: u64) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        if let ValueRef::Null(reason) = value {
            verify_arg!(reason, reason <= MAX_DATA_INDEX);
            self.add_nulls(reason, count);
            return Ok(());
        }

        if self.repeats_prev(value) {
            self.repeat_prev(count);
            return Ok(());
        }

        let index = self.next_index()?;
        self.values.push(value)?;
        if self.open_len == 0 || self.open.is_null || count > 1 {
            self.close_segment();
            self.open.is_null = false;
            self.open.is_run = true;
            self.open.data_index = index;
        } else if self.open.is_run && self.open_len > 1 {
            self.close_segment();
            self.open.data_index = index;
        } else {
            self.open.is_run = false;
        }
        self.open_len += count;
        self.prev_value = Some(index as usize);
        Ok(())
    }

    /// Closes the open segment, appends the terminal segment and splices the staged variable
    /// part after the fixed part.
    pub fn finish(mut self) -> Payload {
        self.close_segment();
        let len = self.open.position;
        self.segments.push(Segment::terminal(len));
        let kind = self.values.kind();
        let (data, var_offset) = self.values.into_data();
        Payload {
            kind,
            segments: self.segments,
            data,
            var_offset,
        }
    }
}
