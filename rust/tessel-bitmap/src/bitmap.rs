//! Position bitmaps.
//!
//! A position bitmap marks which logical positions of a chunk are populated, and maps each
//! populated position to the physical position of its value in a dense value payload.
//!
//! Encoded layout (little-endian):
//!
//! ```text
//! header   magic u64 | segment count u64 | populated count u64
//! segments segment count x (logical u64 | physical u64 | length u64)
//! ```

use std::fmt;

use tessel_common::{Result, error::Error, verify_data};
use tessel_rle::{
    Position,
    scalar::{ValueReader, ValueWriter},
};

use crate::{
    builder::BitmapBuilder,
    segment::{BITMAP_SEGMENT_SIZE, BitmapSegment},
};

/// Magic number opening an encoded position bitmap.
pub const BITMAP_MAGIC: u64 = 0xEEEE_AAAA_00EE_BAAC;

/// Size of the encoded bitmap header.
pub const BITMAP_HEADER_SIZE: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapHeader {
    pub segment_count: u64,
    /// Number of populated positions.
    pub count: u64,
}

impl BitmapHeader {
    pub fn read_from(buffer: &[u8]) -> Result<(BitmapHeader, &[u8])> {
        if buffer.len() < BITMAP_HEADER_SIZE {
            return Err(Error::invalid_format(
                "bitmap header",
                format!("buffer of {} bytes is too small", buffer.len()),
            ));
        }
        let magic = buffer.read_value::<u64>(0);
        if magic != BITMAP_MAGIC {
            return Err(Error::invalid_format(
                "bitmap header",
                format!("unexpected magic {magic:#018x}"),
            ));
        }
        let header = BitmapHeader {
            segment_count: buffer.read_value::<u64>(8),
            count: buffer.read_value::<u64>(16),
        };
        Ok((header, &buffer[BITMAP_HEADER_SIZE..]))
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.write_value(BITMAP_MAGIC);
        out.write_value(self.segment_count);
        out.write_value(self.count);
    }
}

/// Borrowed, read-only position bitmap.
#[derive(Clone, Copy)]
pub struct BitmapView<'a> {
    segments: &'a [BitmapSegment],
    count: u64,
}

impl<'a> BitmapView<'a> {
    /// Validates `segments` against the populated `count` and wraps them into a view.
    ///
    /// Segments must be non-empty, ordered by logical position without overlap, with
    /// non-decreasing, non-overlapping physical ranges. Their lengths must add up to `count`.
    pub fn new(segments: &'a [BitmapSegment], count: u64) -> Result<BitmapView<'a>> {
        let view = BitmapView { segments, count };
        view.validate()?;
        Ok(view)
    }

    pub(crate) fn new_unchecked(segments: &'a [BitmapSegment], count: u64) -> BitmapView<'a> {
        BitmapView { segments, count }
    }

    /// Decodes a bitmap view from an encoded buffer. The view borrows `buffer`.
    pub fn from_bytes(buffer: &'a [u8]) -> Result<BitmapView<'a>> {
        let (header, body) = BitmapHeader::read_from(buffer)?;
        let segment_bytes = usize::try_from(header.segment_count)
            .ok()
            .and_then(|n| n.checked_mul(BITMAP_SEGMENT_SIZE))
            .ok_or_else(|| Error::invalid_format("bitmap header", "segment count overflow"))?;
        verify_data!(bitmap, body.len() >= segment_bytes);
        let segments: &[BitmapSegment] = bytemuck::try_cast_slice(&body[..segment_bytes])
            .map_err(|e| Error::invalid_format("bitmap segments", e.to_string()))?;
        log::trace!(
            "decoding bitmap: {} segments, {} populated",
            header.segment_count,
            header.count
        );
        BitmapView::new(segments, header.count)
    }

    fn validate(&self) -> Result<()> {
        let mut total = 0u64;
        let mut prev: Option<&BitmapSegment> = None;
        for (i, s) in self.segments.iter().enumerate() {
            if s.length() == 0 {
                return Err(Error::invalid_format(
                    "bitmap segments",
                    format!("segment {i} is empty"),
                ));
            }
            if let Some(prev) = prev {
                if s.logical_position() < prev.logical_end()
                    || s.physical_position() < prev.physical_end()
                {
                    return Err(Error::invalid_format(
                        "bitmap segments",
                        format!("segment {i} overlaps its predecessor"),
                    ));
                }
            }
            s.logical_position()
                .checked_add(s.length())
                .and_then(|_| s.physical_position().checked_add(s.length()))
                .ok_or_else(|| {
                    Error::invalid_format("bitmap segments", format!("segment {i} overflows"))
                })?;
            total += s.length();
            prev = Some(s);
        }
        if total != self.count {
            return Err(Error::invalid_format(
                "bitmap header",
                format!("count {} does not match the segments ({total})", self.count),
            ));
        }
        Ok(())
    }

    /// Number of populated positions.
    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    pub fn segments(&self) -> &'a [BitmapSegment] {
        self.segments
    }

    #[inline]
    pub fn segment(&self, i: usize) -> BitmapSegment {
        self.segments[i]
    }

    /// Logical position just past the last populated position.
    pub fn logical_end(&self) -> Position {
        self.segments.last().map_or(0, |s| s.logical_end())
    }

    /// Returns `true` when the physical positions are numbered densely from zero.
    pub fn is_dense(&self) -> bool {
        let mut next = 0;
        for s in self.segments {
            if s.physical_position() != next {
                return false;
            }
            next = s.physical_end();
        }
        true
    }

    /// Index of the first segment ending after `pos`, which either contains `pos` or is the
    /// first segment past it. `None` if no segment ends after `pos`.
    pub fn find_segment(&self, pos: Position) -> Option<usize> {
        let i = self.segments.partition_point(|s| s.logical_end() <= pos);
        (i < self.segments.len()).then_some(i)
    }

    /// Physical position of the value at logical position `pos`, `None` if `pos` is empty.
    pub fn physical_position(&self, pos: Position) -> Option<Position> {
        let s = self.segments[self.find_segment(pos)?];
        s.contains(pos)
            .then(|| s.physical_position() + (pos - s.logical_position()))
    }

    #[inline]
    pub fn contains(&self, pos: Position) -> bool {
        self.physical_position(pos).is_some()
    }

    /// Iterates over the `(logical, physical)` positions of every populated cell.
    pub fn positions(&self) -> impl Iterator<Item = (Position, Position)> + use<'a> {
        self.segments.iter().flat_map(|s| {
            let (l, p) = (s.logical_position(), s.physical_position());
            (0..s.length()).map(move |i| (l + i, p + i))
        })
    }

    pub fn cursor(&self) -> BitmapCursor<'a> {
        BitmapCursor::new(*self)
    }

    pub fn header(&self) -> BitmapHeader {
        BitmapHeader {
            segment_count: self.segments.len() as u64,
            count: self.count,
        }
    }

    pub fn packed_size(&self) -> usize {
        BITMAP_HEADER_SIZE + self.segments.len() * BITMAP_SEGMENT_SIZE
    }

    /// Appends the encoded bitmap to `out`.
    pub fn pack(&self, out: &mut Vec<u8>) {
        out.reserve(self.packed_size());
        self.header().write_to(out);
        out.extend_from_slice(bytemuck::cast_slice(self.segments));
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.packed_size());
        self.pack(&mut out);
        out
    }

    pub fn to_bitmap(&self) -> PositionBitmap {
        PositionBitmap {
            segments: self.segments.to_vec(),
            count: self.count,
        }
    }

    /// Same populated positions with physical positions renumbered densely from zero.
    pub fn renumbered(&self) -> PositionBitmap {
        let mut builder = BitmapBuilder::with_capacity(self.segments.len());
        for s in self.segments {
            builder.add_range(s.logical_position(), builder.count(), s.length());
        }
        builder.finish()
    }

    /// Writes a human-readable listing of the segments to `sink`.
    pub fn dump(&self, sink: &mut impl fmt::Write) -> fmt::Result {
        writeln!(
            sink,
            "bitmap: {} populated, {} segments",
            self.count,
            self.segments.len()
        )?;
        for s in self.segments {
            writeln!(
                sink,
                "  [{}; {}) -> {}",
                s.logical_position(),
                s.logical_end(),
                s.physical_position()
            )?;
        }
        Ok(())
    }
}

impl fmt::Debug for BitmapView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitmapView")
            .field("count", &self.count)
            .field("segments", &self.segments)
            .finish()
    }
}

impl PartialEq for BitmapView<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.count == other.count && self.segments == other.segments
    }
}

/// Owned position bitmap.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PositionBitmap {
    pub(crate) segments: Vec<BitmapSegment>,
    pub(crate) count: u64,
}

impl PositionBitmap {
    /// A bitmap with no populated positions.
    pub fn empty() -> PositionBitmap {
        PositionBitmap::default()
    }

    /// Builds a bitmap from validated segments.
    pub fn from_segments(segments: Vec<BitmapSegment>) -> Result<PositionBitmap> {
        let count = segments.iter().map(|s| s.length()).sum();
        BitmapView::new(&segments, count)?;
        Ok(PositionBitmap { segments, count })
    }

    pub fn from_bytes(buffer: &[u8]) -> Result<PositionBitmap> {
        Ok(BitmapView::from_bytes(buffer)?.to_bitmap())
    }

    #[inline]
    pub fn view(&self) -> BitmapView<'_> {
        BitmapView::new_unchecked(&self.segments, self.count)
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    pub fn segments(&self) -> &[BitmapSegment] {
        &self.segments
    }

    pub fn physical_position(&self, pos: Position) -> Option<Position> {
        self.view().physical_position(pos)
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.view().contains(pos)
    }

    pub fn renumbered(&self) -> PositionBitmap {
        self.view().renumbered()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.view().to_bytes()
    }

    pub fn into_segments(self) -> Vec<BitmapSegment> {
        self.segments
    }
}

impl fmt::Debug for PositionBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.view().fmt(f)
    }
}

/// Cell-level cursor over the populated positions of a bitmap.
#[derive(Clone)]
pub struct BitmapCursor<'a> {
    view: BitmapView<'a>,
    seg: usize,
    pos: Position,
}

impl<'a> BitmapCursor<'a> {
    /// Creates a cursor at the first populated position.
    pub fn new(view: BitmapView<'a>) -> BitmapCursor<'a> {
        let pos = view.segments.first().map_or(0, |s| s.logical_position());
        BitmapCursor { view, seg: 0, pos }
    }

    #[inline]
    pub fn is_end(&self) -> bool {
        self.seg >= self.view.segments.len()
    }

    #[inline]
    pub fn segment_index(&self) -> usize {
        self.seg
    }

    #[inline]
    pub fn logical_position(&self) -> Position {
        self.pos
    }

    #[inline]
    pub fn physical_position(&self) -> Position {
        let s = &self.view.segments[self.seg];
        s.physical_position() + (self.pos - s.logical_position())
    }

    /// Moves to the next populated position.
    pub fn advance(&mut self) {
        self.pos += 1;
        if self.pos >= self.view.segments[self.seg].logical_end() {
            self.enter_segment(self.seg + 1);
        }
    }

    /// Moves to logical position `pos`. If `pos` is empty, moves to the next populated
    /// position after it and returns `false`.
    pub fn seek(&mut self, pos: Position) -> bool {
        match self.view.find_segment(pos) {
            Some(i) if self.view.segments[i].contains(pos) => {
                self.seg = i;
                self.pos = pos;
                true
            }
            Some(i) => {
                self.enter_segment(i);
                false
            }
            None => {
                self.enter_segment(self.view.segments.len());
                false
            }
        }
    }

    /// Moves `n` populated positions forward. Returns `false` if that runs past the end.
    pub fn skip(&mut self, mut n: u64) -> bool {
        while !self.is_end() {
            let available = self.view.segments[self.seg].logical_end() - self.pos;
            if n < available {
                self.pos += n;
                return true;
            }
            n -= available;
            self.enter_segment(self.seg + 1);
        }
        false
    }

    pub fn reset(&mut self) {
        self.enter_segment(0);
    }

    fn enter_segment(&mut self, seg: usize) {
        self.seg = seg;
        self.pos = match self.view.segments.get(seg) {
            Some(s) => s.logical_position(),
            None => self.view.logical_end(),
        };
    }
}

impl Iterator for BitmapCursor<'_> {
    type Item = (Position, Position);

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_end() {
            return None;
        }
        let item = (self.pos, self.physical_position());
        self.advance();
        Some(item)
    }
}
