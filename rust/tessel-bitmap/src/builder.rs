//! Incremental construction of position bitmaps.

use tessel_common::{Result, error::Error, verify_arg};
use tessel_rle::{PayloadIter, PayloadView, Position};

use crate::{bitmap::PositionBitmap, segment::BitmapSegment};

/// Appends bitmap segments in logical order.
#[derive(Debug, Clone, Default)]
pub struct BitmapBuilder {
    segments: Vec<BitmapSegment>,
    count: u64,
}

impl BitmapBuilder {
    pub fn new() -> BitmapBuilder {
        BitmapBuilder::default()
    }

    pub fn with_capacity(segments: usize) -> BitmapBuilder {
        BitmapBuilder {
            segments: Vec::with_capacity(segments),
            count: 0,
        }
    }

    /// Number of populated positions appended so far.
    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn segments(&self) -> &[BitmapSegment] {
        &self.segments
    }

    pub fn logical_end(&self) -> Position {
        self.segments.last().map_or(0, |s| s.logical_end())
    }

    pub fn physical_end(&self) -> Position {
        self.segments.last().map_or(0, |s| s.physical_end())
    }

    /// Appends a segment as is. Empty segments are ignored.
    ///
    /// # Panics
    ///
    /// Panics if the segment starts before the end of the previous one, logically or
    /// physically.
    pub fn add_segment(&mut self, segment: BitmapSegment) {
        if segment.length() == 0 {
            return;
        }
        self.check_order(segment.logical_position(), segment.physical_position());
        self.count += segment.length();
        self.segments.push(segment);
    }

    /// Appends `length` populated positions, extending the last segment when both the logical
    /// and the physical ranges continue it.
    ///
    /// # Panics
    ///
    /// Panics if the range starts before the end of the previous segment.
    pub fn add_range(&mut self, logical: Position, physical: Position, length: u64) {
        if length == 0 {
            return;
        }
        self.check_order(logical, physical);
        self.count += length;
        if let Some(last) = self.segments.last_mut() {
            if last.logical_end() == logical && last.physical_end() == physical {
                last.set_length(last.length() + length);
                return;
            }
        }
        self.segments
            .push(BitmapSegment::new(logical, physical, length));
    }

    /// Appends a single populated position.
    pub fn add_position_pair(&mut self, logical: Position, physical: Position) {
        self.add_range(logical, physical, 1);
    }

    /// Appends `length` populated positions at `logical`, numbered densely after the
    /// positions appended so far.
    pub fn add_dense(&mut self, logical: Position, length: u64) {
        let physical = self.physical_end();
        self.add_range(logical, physical, length);
    }

    pub fn clear(&mut self) {
        self.segments.clear();
        self.count = 0;
    }

    pub fn finish(self) -> PositionBitmap {
        PositionBitmap {
            segments: self.segments,
            count: self.count,
        }
    }

    fn check_order(&self, logical: Position, physical: Position) {
        if let Some(last) = self.segments.last() {
            assert!(
                logical >= last.logical_end(),
                "bitmap segment at {logical} starts before {}",
                last.logical_end()
            );
            assert!(
                physical >= last.physical_end(),
                "bitmap segment physical position {physical} precedes {}",
                last.physical_end()
            );
        }
    }
}

impl PositionBitmap {
    /// All positions in `[0, len)` populated.
    pub fn full(len: u64) -> PositionBitmap {
        let mut builder = BitmapBuilder::with_capacity(1);
        builder.add_range(0, 0, len);
        builder.finish()
    }

    /// Positions of the set bits among the first `len` bits of `bits`, least significant bit
    /// first.
    ///
    /// # Panics
    ///
    /// Panics if `bits` holds fewer than `len` bits.
    pub fn from_bits(bits: &[u8], len: u64) -> PositionBitmap {
        assert!(bits.len() as u64 * 8 >= len, "bit buffer is too short");
        let mut builder = BitmapBuilder::new();
        let mut pos = 0;
        while pos < len {
            if !test_bit(bits, pos) {
                pos += 1;
                continue;
            }
            let start = pos;
            while pos < len && test_bit(bits, pos) {
                pos += 1;
            }
            builder.add_dense(start, pos - start);
        }
        builder.finish()
    }

    /// Bitmap populated at the given strictly increasing positions.
    pub fn from_positions<I>(positions: I) -> Result<PositionBitmap>
    where
        I: IntoIterator<Item = Position>,
    {
        let mut builder = BitmapBuilder::new();
        let mut prev: Option<Position> = None;
        for pos in positions {
            if prev.is_some_and(|prev| pos <= prev) {
                return Err(Error::invalid_arg(
                    "positions",
                    format!("{pos} does not follow {}", prev.unwrap_or_default()),
                ));
            }
            builder.add_dense(pos, 1);
            prev = Some(pos);
        }
        Ok(builder.finish())
    }

    /// Bitmap populated at the `true` cells of a boolean payload. Null and `false` cells are
    /// empty.
    pub fn from_boolean_payload(view: &PayloadView<'_>) -> Result<PositionBitmap> {
        verify_arg!(view, view.kind().is_boolean());
        let mut builder = BitmapBuilder::with_capacity(view.segment_count());
        let mut iter = PayloadIter::new(*view);
        while !iter.is_end() {
            if iter.is_null() {
                iter.next_segment();
            } else if iter.is_run() {
                if iter.value().as_bool() == Some(true) {
                    builder.add_dense(iter.position(), iter.available());
                }
                iter.next_segment();
            } else {
                if iter.value().as_bool() == Some(true) {
                    builder.add_dense(iter.position(), 1);
                }
                iter.advance(1);
            }
        }
        Ok(builder.finish())
    }

    /// Bitmap of a chunk whose cells span the box `[origin_low, origin_high]` in row-major
    /// order, populated at the sub-box `[first, last]`.
    pub fn from_box(
        origin_low: &[i64],
        origin_high: &[i64],
        first: &[i64],
        last: &[i64],
    ) -> Result<PositionBitmap> {
        let dims = origin_low.len();
        verify_arg!(origin_low, dims > 0);
        verify_arg!(origin_high, origin_high.len() == dims);
        verify_arg!(first, first.len() == dims);
        verify_arg!(last, last.len() == dims);
        for d in 0..dims {
            if !(origin_low[d] <= first[d] && first[d] <= last[d] && last[d] <= origin_high[d]) {
                return Err(Error::invalid_arg(
                    "first",
                    format!("dimension {d}: sub-box is not within the chunk box"),
                ));
            }
        }
        let volume = (0..dims)
            .map(|d| (origin_high[d] - origin_low[d] + 1) as u64)
            .try_fold(1u64, u64::checked_mul)
            .ok_or_else(|| Error::invalid_arg("origin_high", "chunk volume overflow"))?;

        let boxed = SubBox {
            origin_low,
            origin_high,
            first,
            last,
        };
        let mut builder = BitmapBuilder::new();
        boxed.add(&mut builder, 0, volume, 0);
        Ok(builder.finish())
    }

    /// Keeps the populated positions whose ordinal has its bit set in `bits`, least
    /// significant bit first. Physical positions are renumbered densely.
    ///
    /// # Panics
    ///
    /// Panics if `bits` holds fewer bits than the bitmap has populated positions.
    pub fn select(&self, bits: &[u8]) -> PositionBitmap {
        assert!(bits.len() as u64 * 8 >= self.count, "bit buffer is too short");
        let mut builder = BitmapBuilder::new();
        let mut ordinal = 0;
        for s in &self.segments {
            let mut i = 0;
            while i < s.length() {
                if !test_bit(bits, ordinal + i) {
                    i += 1;
                    continue;
                }
                let start = i;
                while i < s.length() && test_bit(bits, ordinal + i) {
                    i += 1;
                }
                builder.add_dense(s.logical_position() + start, i - start);
            }
            ordinal += s.length();
        }
        builder.finish()
    }
}

#[inline]
fn test_bit(bits: &[u8], i: u64) -> bool {
    bits[(i >> 3) as usize] & (1 << (i & 7)) != 0
}

struct SubBox<'a> {
    origin_low: &'a [i64],
    origin_high: &'a [i64],
    first: &'a [i64],
    last: &'a [i64],
}

impl SubBox<'_> {
    fn add(&self, builder: &mut BitmapBuilder, level: usize, slice: u64, pos: Position) {
        let slice = slice / (self.origin_high[level] - self.origin_low[level] + 1) as u64;
        let pos = pos + (self.first[level] - self.origin_low[level]) as u64 * slice;
        let extent = (self.last[level] - self.first[level] + 1) as u64;
        if level + 1 == self.origin_low.len() {
            builder.add_dense(pos, extent);
        } else {
            for i in 0..extent {
                self.add(builder, level + 1, slice, pos + i * slice);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tessel_rle::{ElementKind, PayloadBuilder, ValueRef};

    use super::*;

    #[test]
    fn test_add_range_coalesces() {
        let mut builder = BitmapBuilder::new();
        builder.add_position_pair(0, 0);
        builder.add_position_pair(1, 1);
        builder.add_position_pair(3, 2);
        builder.add_range(4, 3, 2);
        builder.add_range(6, 10, 1);
        builder.add_segment(BitmapSegment::new(7, 11, 1));
        assert_eq!(builder.count(), 7);
        let bitmap = builder.finish();
        assert_eq!(
            bitmap.segments(),
            &[
                BitmapSegment::new(0, 0, 2),
                BitmapSegment::new(3, 2, 3),
                BitmapSegment::new(6, 10, 1),
                BitmapSegment::new(7, 11, 1),
            ]
        );
    }

    #[test]
    #[should_panic(expected = "starts before")]
    fn test_out_of_order_segment() {
        let mut builder = BitmapBuilder::new();
        builder.add_range(10, 0, 5);
        builder.add_range(12, 5, 1);
    }

    #[test]
    fn test_full_and_bits() {
        assert!(PositionBitmap::full(0).is_empty());
        assert_eq!(
            PositionBitmap::full(9).segments(),
            &[BitmapSegment::new(0, 0, 9)]
        );

        let bitmap = PositionBitmap::from_bits(&[0b1100_1110, 0b0000_0001], 10);
        assert_eq!(
            bitmap.segments(),
            &[BitmapSegment::new(1, 0, 3), BitmapSegment::new(6, 3, 3)]
        );
        assert_eq!(bitmap.count(), 6);
    }

    #[test]
    fn test_from_positions() {
        let bitmap = PositionBitmap::from_positions([0, 1, 2, 5, 7, 8]).unwrap();
        assert_eq!(bitmap.segment_count(), 3);
        assert_eq!(bitmap.physical_position(7), Some(4));
        assert!(PositionBitmap::from_positions([3, 3]).is_err());
        assert!(PositionBitmap::from_positions(std::iter::empty()).unwrap().is_empty());
    }

    #[test]
    fn test_from_boolean_payload() {
        let mut builder = PayloadBuilder::new(ElementKind::Boolean);
        for v in [true, false, true, true] {
            builder.push(ValueRef::Bool(v)).unwrap();
        }
        builder.push_nulls(1, 2).unwrap();
        builder.push_repeated(ValueRef::Bool(true), 20).unwrap();
        builder.push_repeated(ValueRef::Bool(false), 20).unwrap();
        builder.push(ValueRef::Bool(true)).unwrap();
        let payload = builder.finish();

        let bitmap = PositionBitmap::from_boolean_payload(&payload.view()).unwrap();
        assert_eq!(
            bitmap.segments(),
            &[
                BitmapSegment::new(0, 0, 1),
                BitmapSegment::new(2, 1, 2),
                BitmapSegment::new(6, 3, 20),
                BitmapSegment::new(46, 23, 1),
            ]
        );

        let ints = PayloadBuilder::new(ElementKind::Fixed(4)).finish();
        assert!(PositionBitmap::from_boolean_payload(&ints.view()).is_err());
    }

    #[test]
    fn test_from_box() {
        let bitmap = PositionBitmap::from_box(&[0, 0], &[3, 4], &[1, 1], &[2, 3]).unwrap();
        assert_eq!(
            bitmap.segments(),
            &[BitmapSegment::new(6, 0, 3), BitmapSegment::new(11, 3, 3)]
        );

        let whole = PositionBitmap::from_box(&[5, 5], &[6, 7], &[5, 5], &[6, 7]).unwrap();
        assert_eq!(whole, PositionBitmap::full(6));

        assert!(PositionBitmap::from_box(&[0], &[3], &[2], &[4]).is_err());
        assert!(PositionBitmap::from_box(&[0, 0], &[3], &[0], &[1]).is_err());
    }

    #[test]
    fn test_select() {
        let bitmap = PositionBitmap::from_positions([1, 2, 3, 10, 11]).unwrap();
        let selected = bitmap.select(&[0b0001_1010]);
        assert_eq!(
            selected.segments(),
            &[BitmapSegment::new(2, 0, 1), BitmapSegment::new(10, 1, 2)]
        );
    }
}
