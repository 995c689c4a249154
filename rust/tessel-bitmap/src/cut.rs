//! Restriction of a bitmap to a sub-box of its chunk.
//!
//! A chunk stores its cells in row-major order over an origin box (usually the chunk box with
//! its overlap). [`Cut`] walks the bitmap segments of such a chunk and keeps only the positions
//! falling into a result box, one dimension at a time, without computing cell coordinates.

use std::cmp::min;

use tessel_common::{Result, error::Error, verify_arg};
use tessel_rle::Position;

use crate::{
    bitmap::{BitmapView, PositionBitmap},
    builder::BitmapBuilder,
    segment::BitmapSegment,
};

/// Source of position ranges walked by a [`Cut`].
pub trait Replicator {
    /// Logical position where the current source range starts.
    fn position(&self) -> Position;

    /// Number of positions left in the current source range.
    fn length(&self) -> u64;

    /// Drops `count` positions from the front of the current source range.
    fn skip(&mut self, count: u64);

    /// Moves `count` positions from the front of the current source range to the result.
    fn copy(&mut self, count: u64);
}

/// Per-dimension cutter, in units of the row-major stride of the dimension.
///
/// Within one `interval` of a dimension, the first `prefix` positions precede the result box,
/// the next `main` positions are inside it (subject to the inner dimensions) and the last
/// `suffix` positions follow it.
#[derive(Debug, Clone)]
pub struct Cut {
    prefix: u64,
    suffix: u64,
    interval: u64,
    main: u64,
    nested: Option<Box<Cut>>,
}

impl Cut {
    /// Creates the cutter of the result box `[lower_result, upper_result]` within the origin
    /// box `[lower_origin, upper_origin]`.
    pub fn new(
        lower_origin: &[i64],
        upper_origin: &[i64],
        lower_result: &[i64],
        upper_result: &[i64],
    ) -> Result<Cut> {
        let dims = lower_origin.len();
        verify_arg!(lower_origin, dims > 0);
        verify_arg!(upper_origin, upper_origin.len() == dims);
        verify_arg!(lower_result, lower_result.len() == dims);
        verify_arg!(upper_result, upper_result.len() == dims);
        for d in 0..dims {
            if !(lower_origin[d] <= lower_result[d]
                && lower_result[d] <= upper_result[d]
                && upper_result[d] <= upper_origin[d])
            {
                return Err(Error::invalid_arg(
                    "lower_result",
                    format!("dimension {d}: result box is not within the origin box"),
                ));
            }
        }
        let bounds = Bounds {
            lower_origin,
            upper_origin,
            lower_result,
            upper_result,
        };
        let cut = bounds.build(0)?;
        log::debug!("cut over {dims} dimensions: {cut:?}");
        Ok(cut)
    }

    #[inline]
    pub fn prefix(&self) -> u64 {
        self.prefix
    }

    #[inline]
    pub fn suffix(&self) -> u64 {
        self.suffix
    }

    #[inline]
    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn nested(&self) -> Option<&Cut> {
        self.nested.as_deref()
    }

    fn is_identity(&self) -> bool {
        self.prefix == 0 && self.suffix == 0 && self.nested.is_none()
    }

    /// Consumes the current source range of `replicator` up to the end of the interval it
    /// starts in, copying the positions inside the result box. Returns the number of positions
    /// consumed; zero when the source range is exhausted.
    pub fn process<R: Replicator + ?Sized>(&self, replicator: &mut R) -> u64 {
        if replicator.length() == 0 {
            return 0;
        }
        let mut result = 0;
        let mut source = replicator.position() % self.interval;

        let skip_main = if source < self.prefix {
            let skip = min(self.prefix - source, replicator.length());
            replicator.skip(skip);
            source += skip;
            result += skip;
            if replicator.length() == 0 {
                return result;
            }
            0
        } else {
            source - self.prefix
        };

        if skip_main < self.main {
            let mut copy = min(self.main - skip_main, replicator.length());
            match &self.nested {
                Some(nested) => {
                    while copy > 0 {
                        let step = nested.process(replicator);
                        debug_assert!(step > 0 && step <= copy);
                        copy -= step;
                        source += step;
                        result += step;
                    }
                }
                None => {
                    replicator.copy(copy);
                    source += copy;
                    result += copy;
                }
            }
        }

        if replicator.length() == 0 {
            return result;
        }
        let suffix = min(self.interval - source, replicator.length());
        replicator.skip(suffix);
        result + suffix
    }
}

struct Bounds<'a> {
    lower_origin: &'a [i64],
    upper_origin: &'a [i64],
    lower_result: &'a [i64],
    upper_result: &'a [i64],
}

impl Bounds<'_> {
    fn build(&self, d: usize) -> Result<Cut> {
        let nested = if d + 1 < self.lower_origin.len() {
            Some(self.build(d + 1)?)
        } else {
            None
        };
        let multiplier = nested.as_ref().map_or(1, |c| c.interval);
        let nested = nested.filter(|c| !c.is_identity()).map(Box::new);

        let scale = |v: i64| {
            (v as u64)
                .checked_mul(multiplier)
                .ok_or_else(|| Error::invalid_arg("upper_origin", "origin box volume overflow"))
        };
        let prefix = scale(self.lower_result[d] - self.lower_origin[d])?;
        let suffix = scale(self.upper_origin[d] - self.upper_result[d])?;
        let interval = scale(self.upper_origin[d] + 1 - self.lower_origin[d])?;
        Ok(Cut {
            prefix,
            suffix,
            interval,
            main: interval - prefix - suffix,
            nested,
        })
    }
}

/// Replicator over the segments of a bitmap, collecting the copied positions into a new
/// bitmap. Copied positions keep their source physical positions.
pub struct BitmapReplicator<'a> {
    source: &'a [BitmapSegment],
    index: usize,
    logical: Position,
    physical: Position,
    length: u64,
    result: BitmapBuilder,
}

impl<'a> BitmapReplicator<'a> {
    pub fn new(view: &BitmapView<'a>) -> BitmapReplicator<'a> {
        let mut replicator = BitmapReplicator {
            source: view.segments(),
            index: 0,
            logical: 0,
            physical: 0,
            length: 0,
            result: BitmapBuilder::new(),
        };
        replicator.load();
        replicator
    }

    /// Returns `true` when every source segment has been consumed.
    #[inline]
    pub fn is_end(&self) -> bool {
        self.index >= self.source.len()
    }

    /// Moves to the next source segment.
    ///
    /// # Panics
    ///
    /// Panics if the current segment is not fully consumed.
    pub fn next_segment(&mut self) {
        assert_eq!(self.length, 0, "source segment is not consumed");
        self.index += 1;
        self.load();
    }

    pub fn finish(self) -> PositionBitmap {
        self.result.finish()
    }

    fn load(&mut self) {
        if let Some(s) = self.source.get(self.index) {
            self.logical = s.logical_position();
            self.physical = s.physical_position();
            self.length = s.length();
        }
    }
}

impl Replicator for BitmapReplicator<'_> {
    #[inline]
    fn position(&self) -> Position {
        self.logical
    }

    #[inline]
    fn length(&self) -> u64 {
        self.length
    }

    fn skip(&mut self, count: u64) {
        assert!(count <= self.length, "skip past the source segment");
        self.logical += count;
        self.physical += count;
        self.length -= count;
    }

    fn copy(&mut self, count: u64) {
        self.result.add_range(self.logical, self.physical, count);
        self.skip(count);
    }
}

impl BitmapView<'_> {
    /// Restricts the bitmap of a chunk laid out over `[lower_origin, upper_origin]` to the
    /// positions inside `[lower_result, upper_result]`.
    ///
    /// Logical positions stay relative to the origin box and physical positions keep pointing
    /// into the source payload; use [`PositionBitmap::renumbered`] for a dense numbering.
    pub fn cut(
        &self,
        lower_origin: &[i64],
        upper_origin: &[i64],
        lower_result: &[i64],
        upper_result: &[i64],
    ) -> Result<PositionBitmap> {
        let cut = Cut::new(lower_origin, upper_origin, lower_result, upper_result)?;
        let mut replicator = BitmapReplicator::new(self);
        while !replicator.is_end() {
            while cut.process(&mut replicator) > 0 {}
            replicator.next_segment();
        }
        Ok(replicator.finish())
    }
}

impl PositionBitmap {
    pub fn cut(
        &self,
        lower_origin: &[i64],
        upper_origin: &[i64],
        lower_result: &[i64],
        upper_result: &[i64],
    ) -> Result<PositionBitmap> {
        self.view()
            .cut(lower_origin, upper_origin, lower_result, upper_result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Row-major positions of the cells of `[low, high]` inside `[origin_low, origin_high]`.
    fn enumerate_box(
        origin_low: &[i64],
        origin_high: &[i64],
        low: &[i64],
        high: &[i64],
    ) -> Vec<Position> {
        let dims = origin_low.len();
        let extent = |d: usize| (origin_high[d] - origin_low[d] + 1) as u64;
        let volume: u64 = (0..dims).map(extent).product();
        (0..volume)
            .filter(|&pos| {
                let mut rest = pos;
                (0..dims).rev().all(|d| {
                    let c = origin_low[d] + (rest % extent(d)) as i64;
                    rest /= extent(d);
                    low[d] <= c && c <= high[d]
                })
            })
            .collect()
    }

    #[test]
    fn test_cut_dense_grid() {
        let full = PositionBitmap::full(100);
        let cut = full.cut(&[0, 0], &[9, 9], &[2, 2], &[7, 7]).unwrap();
        assert_eq!(cut.count(), 36);
        assert_eq!(cut.segment_count(), 6);
        let logical: Vec<Position> = cut.view().positions().map(|(l, _)| l).collect();
        assert_eq!(logical, enumerate_box(&[0, 0], &[9, 9], &[2, 2], &[7, 7]));
        for (l, p) in cut.view().positions() {
            assert_eq!(l, p);
        }
    }

    #[test]
    fn test_cut_keeps_physical_positions() {
        let bitmap = PositionBitmap::from_positions([1, 5, 6, 7, 12]).unwrap();
        let cut = bitmap.cut(&[0, 0], &[3, 3], &[1, 1], &[2, 3]).unwrap();
        assert_eq!(
            cut.view().positions().collect::<Vec<_>>(),
            vec![(5, 1), (6, 2), (7, 3)]
        );
        assert_eq!(
            cut.renumbered().view().positions().collect::<Vec<_>>(),
            vec![(5, 0), (6, 1), (7, 2)]
        );
    }

    #[test]
    fn test_identity_cut() {
        let bitmap = PositionBitmap::from_positions([0, 3, 4, 8, 9, 10, 23]).unwrap();
        let cut = bitmap.cut(&[0, 0, 0], &[1, 2, 3], &[0, 0, 0], &[1, 2, 3]).unwrap();
        assert_eq!(cut, bitmap);
    }

    #[test]
    fn test_fully_included_inner_dimension_is_dropped() {
        let cut = Cut::new(&[0, 0, 0], &[4, 4, 4], &[1, 1, 0], &[3, 3, 4]).unwrap();
        assert_eq!(cut.interval(), 125);
        assert_eq!(cut.prefix(), 25);
        let nested = cut.nested().unwrap();
        assert_eq!((nested.prefix(), nested.suffix(), nested.interval()), (5, 5, 25));
        assert!(nested.nested().is_none());
    }

    #[test]
    fn test_cut_matches_enumeration() {
        let boxes: [(&[i64], &[i64], &[i64], &[i64]); 4] = [
            (&[0], &[19], &[3], &[11]),
            (&[-2, 5], &[3, 9], &[-1, 6], &[3, 8]),
            (&[0, 0, 0], &[3, 4, 5], &[1, 0, 2], &[2, 4, 3]),
            (&[0, 0, 0], &[2, 2, 2], &[1, 1, 1], &[1, 1, 1]),
        ];
        for seed in 0..8u64 {
            let mut rng = fastrand::Rng::with_seed(seed);
            for (origin_low, origin_high, low, high) in boxes {
                let volume: u64 = origin_low
                    .iter()
                    .zip(origin_high)
                    .map(|(l, h)| (h - l + 1) as u64)
                    .product();
                let populated: Vec<Position> =
                    (0..volume).filter(|_| rng.u8(0..4) != 0).collect();
                let bitmap = PositionBitmap::from_positions(populated.iter().copied()).unwrap();
                let cut = bitmap.cut(origin_low, origin_high, low, high).unwrap();

                let inside = enumerate_box(origin_low, origin_high, low, high);
                let expected: Vec<(Position, Position)> = bitmap
                    .view()
                    .positions()
                    .filter(|(l, _)| inside.binary_search(l).is_ok())
                    .collect();
                assert_eq!(cut.view().positions().collect::<Vec<_>>(), expected);
            }
        }
    }

    #[test]
    fn test_cut_empty_and_invalid() {
        let empty = PositionBitmap::empty();
        assert!(empty.cut(&[0], &[9], &[2], &[5]).unwrap().is_empty());
        assert!(empty.cut(&[0], &[9], &[2], &[10]).is_err());
        assert!(Cut::new(&[0, 0], &[9], &[0], &[9]).is_err());
        assert!(Cut::new(&[], &[], &[], &[]).is_err());
        assert!(Cut::new(&[0], &[9], &[5], &[4]).is_err());
    }

    #[test]
    fn test_process_exhausted_source() {
        let cut = Cut::new(&[0], &[9], &[2], &[5]).unwrap();
        let bitmap = PositionBitmap::full(3);
        let mut replicator = BitmapReplicator::new(&bitmap.view());
        assert_eq!(cut.process(&mut replicator), 3);
        assert_eq!(cut.process(&mut replicator), 0);
        replicator.next_segment();
        assert!(replicator.is_end());
        let result = replicator.finish();
        assert_eq!(result.segments(), &[BitmapSegment::new(2, 2, 1)]);
    }
}
