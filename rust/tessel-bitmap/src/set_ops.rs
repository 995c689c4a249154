//! Union and intersection of position bitmaps.
//!
//! Both operations work on the logical positions only and number the physical positions of
//! the result densely from zero.

use std::cmp::{max, min};

use itertools::Itertools;
use tessel_rle::Position;

use crate::{
    bitmap::{BitmapView, PositionBitmap},
    builder::BitmapBuilder,
};

impl BitmapView<'_> {
    /// Positions populated in either bitmap.
    pub fn union(&self, other: &BitmapView<'_>) -> PositionBitmap {
        let mut builder =
            BitmapBuilder::with_capacity(self.segment_count() + other.segment_count());
        self.segments()
            .iter()
            .merge_by(other.segments(), |a, b| {
                a.logical_position() <= b.logical_position()
            })
            .map(|s| (s.logical_position(), s.logical_end()))
            .coalesce(|a, b| {
                if b.0 <= a.1 {
                    Ok((a.0, max(a.1, b.1)))
                } else {
                    Err((a, b))
                }
            })
            .for_each(|(start, end)| builder.add_dense(start, end - start));
        builder.finish()
    }

    /// Positions populated in both bitmaps.
    pub fn intersect(&self, other: &BitmapView<'_>) -> PositionBitmap {
        let mut builder = BitmapBuilder::new();
        let (a, b) = (self.segments(), other.segments());
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            let start: Position = max(a[i].logical_position(), b[j].logical_position());
            let end = min(a[i].logical_end(), b[j].logical_end());
            if start < end {
                builder.add_dense(start, end - start);
            }
            if a[i].logical_end() <= b[j].logical_end() {
                i += 1;
            } else {
                j += 1;
            }
        }
        builder.finish()
    }
}

impl PositionBitmap {
    pub fn union(&self, other: &PositionBitmap) -> PositionBitmap {
        self.view().union(&other.view())
    }

    pub fn intersect(&self, other: &PositionBitmap) -> PositionBitmap {
        self.view().intersect(&other.view())
    }
}
