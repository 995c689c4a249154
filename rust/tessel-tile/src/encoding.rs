use std::fmt;

use tessel_common::Result;
use tessel_rle::MissingReason;

use crate::{config::EncodingKind, datum::Datum};

/// Storage of the cells of a tile.
///
/// Cells are appended with [`push`](Encoding::push) and [`push_null`](Encoding::push_null)
/// and read back by index. After [`finalize`](Encoding::finalize) the encoding is read-only
/// until it is cleared; pushing into a finalized encoding panics.
pub trait Encoding<T>: Send {
    fn kind(&self) -> EncodingKind;

    /// Number of cells.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, value: T) -> Result<()>;

    fn push_null(&mut self, reason: MissingReason) -> Result<()>;

    /// Reads the cell at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    fn get(&self, index: u64) -> Datum<T>;

    /// Reserves room for `additional` more cells.
    fn reserve(&mut self, additional: usize);

    fn finalize(&mut self);

    fn is_finalized(&self) -> bool;

    /// Drops every cell and reopens the encoding for pushes.
    fn clear(&mut self);

    /// Writes a listing of the encoded cells to `sink`.
    fn dump(&self, sink: &mut dyn fmt::Write) -> fmt::Result;
}
