use std::{fmt, marker::PhantomData};

use tessel_common::Result;
use tessel_rle::MissingReason;

use crate::{config::TileConfig, datum::Datum, encoding::Encoding};

/// A column of cells of type `T` stored with encoding `E`.
#[derive(Debug, Clone)]
pub struct Tile<T, E> {
    encoding: E,
    _marker: PhantomData<fn() -> T>,
}

impl<T, E: Encoding<T>> Tile<T, E> {
    pub fn new(encoding: E) -> Tile<T, E> {
        Tile {
            encoding,
            _marker: PhantomData,
        }
    }

    /// Creates an empty tile with room for `config.capacity_hint` cells.
    pub fn with_config(config: &TileConfig) -> Tile<T, E>
    where
        E: Default,
    {
        let mut tile = Tile::new(E::default());
        tile.reserve(config.capacity_hint);
        tile
    }

    #[inline]
    pub fn encoding(&self) -> &E {
        &self.encoding
    }

    pub fn into_encoding(self) -> E {
        self.encoding
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.encoding.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.encoding.is_empty()
    }

    /// Appends a value.
    ///
    /// # Panics
    ///
    /// Panics if the tile is finalized.
    pub fn push(&mut self, value: T) -> Result<()> {
        self.encoding.push(value)
    }

    /// Appends a missing cell.
    ///
    /// # Panics
    ///
    /// Panics if the tile is finalized.
    pub fn push_null(&mut self, reason: MissingReason) -> Result<()> {
        self.encoding.push_null(reason)
    }

    /// Appends every value of `iter`, stopping at the first one that cannot be encoded.
    /// Values before it stay in the tile.
    pub fn try_extend<I: IntoIterator<Item = T>>(&mut self, iter: I) -> Result<()> {
        iter.into_iter().try_for_each(|value| self.encoding.push(value))
    }

    /// Appends a cell read from another tile.
    pub fn push_datum(&mut self, datum: Datum<T>) -> Result<()> {
        match datum.missing {
            Some(reason) => self.encoding.push_null(reason),
            None => self.encoding.push(datum.value),
        }
    }

    #[inline]
    pub fn get(&self, index: u64) -> Datum<T> {
        self.encoding.get(index)
    }

    pub fn reserve(&mut self, additional: usize) {
        self.encoding.reserve(additional);
    }

    pub fn finalize(&mut self) {
        self.encoding.finalize();
    }

    pub fn is_finalized(&self) -> bool {
        self.encoding.is_finalized()
    }

    pub fn clear(&mut self) {
        self.encoding.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = Datum<T>> + '_ {
        (0..self.len()).map(|i| self.encoding.get(i))
    }

    /// Writes a diagnostic listing of the tile to `sink`.
    pub fn dump(&self, sink: &mut impl fmt::Write) -> fmt::Result {
        writeln!(
            sink,
            "tile<{}>: {} cells, {:?}{}",
            std::any::type_name::<T>(),
            self.len(),
            self.encoding.kind(),
            if self.is_finalized() { ", finalized" } else { "" }
        )?;
        self.encoding.dump(sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::EncodingKind, identity::IdentityEncoding, run_length::RunLengthEncoding};

    fn fill<E: Encoding<i64>>(tile: &mut Tile<i64, E>) {
        tile.try_extend([3, 3, 3]).unwrap();
        tile.push_null(1).unwrap();
        tile.try_extend(std::iter::repeat_n(8, 40)).unwrap();
        tile.push(-1).unwrap();
    }

    #[test]
    fn test_encodings_agree() {
        let mut identity = Tile::new(IdentityEncoding::<i64>::new());
        let mut run_length = Tile::new(RunLengthEncoding::<i64>::new());
        fill(&mut identity);
        fill(&mut run_length);
        assert_eq!(identity.len(), 45);
        assert!(identity.iter().eq(run_length.iter()));
        assert_eq!(run_length.get(3), Datum::missing(1));
        assert_eq!(run_length.encoding().values(), &[3, 8, -1]);
    }

    #[test]
    fn test_copy_between_tiles() {
        let mut source = Tile::new(RunLengthEncoding::<u16>::new());
        source.try_extend([1, 2, 2]).unwrap();
        source.push_null(4).unwrap();
        source.finalize();

        let mut target: Tile<u16, IdentityEncoding<u16>> = Tile::with_config(
            &TileConfig::default()
                .with_encoding(EncodingKind::Identity)
                .with_capacity_hint(4),
        );
        for datum in source.iter() {
            target.push_datum(datum).unwrap();
        }
        assert!(target.iter().eq(source.iter()));
    }

    #[test]
    fn test_dump() {
        let mut tile = Tile::new(IdentityEncoding::<u8>::new());
        tile.push(5).unwrap();
        tile.finalize();
        let mut out = String::new();
        tile.dump(&mut out).unwrap();
        assert_eq!(out, "tile<u8>: 1 cells, Identity, finalized\nidentity: 1 cells, 0 missing\n  0: 5\n");
    }

    #[test]
    fn test_clear_and_reuse() {
        let mut tile = Tile::new(RunLengthEncoding::<i32>::new());
        tile.try_extend([1, 2]).unwrap();
        tile.finalize();
        tile.clear();
        assert!(!tile.is_finalized());
        tile.push(9).unwrap();
        assert_eq!(tile.get(0), Datum::present(9));
    }
}
