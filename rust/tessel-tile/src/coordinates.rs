//! Tiles of cell coordinates.
//!
//! A coordinates tile stores one logical position per cell and converts it from and to the
//! cell coordinates through a [`CoordinatesMapper`].

use std::fmt;

use tessel_common::{Result, error::Error, verify_arg};
use tessel_rle::{MissingReason, Position};

use crate::{datum::Datum, encoding::Encoding, tile::Tile};

/// Conversion between cell coordinates and logical positions within a chunk.
pub trait CoordinatesMapper {
    /// Number of dimensions.
    fn dims(&self) -> usize;

    /// Logical position of the cell at `coords`.
    fn position_of(&self, coords: &[i64]) -> Result<Position>;

    /// Writes the coordinates of the cell at `pos` into `coords`.
    fn coordinates_of(&self, pos: Position, coords: &mut [i64]) -> Result<()>;
}

/// Row-major mapping over the box `[low, high]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxMapper {
    low: Vec<i64>,
    high: Vec<i64>,
    volume: u64,
}

impl BoxMapper {
    pub fn new(low: &[i64], high: &[i64]) -> Result<BoxMapper> {
        verify_arg!(low, !low.is_empty());
        verify_arg!(high, high.len() == low.len());
        let mut volume = 1u64;
        for (d, (&lo, &hi)) in low.iter().zip(high).enumerate() {
            if hi < lo {
                return Err(Error::invalid_arg(
                    "high",
                    format!("dimension {d}: upper bound {hi} is below {lo}"),
                ));
            }
            volume = volume
                .checked_mul((hi - lo + 1) as u64)
                .ok_or_else(|| Error::invalid_arg("high", "box volume overflow"))?;
        }
        Ok(BoxMapper {
            low: low.to_vec(),
            high: high.to_vec(),
            volume,
        })
    }

    pub fn low(&self) -> &[i64] {
        &self.low
    }

    pub fn high(&self) -> &[i64] {
        &self.high
    }

    /// Number of cells in the box.
    pub fn volume(&self) -> u64 {
        self.volume
    }

    #[inline]
    fn extent(&self, d: usize) -> u64 {
        (self.high[d] - self.low[d] + 1) as u64
    }
}

impl CoordinatesMapper for BoxMapper {
    fn dims(&self) -> usize {
        self.low.len()
    }

    fn position_of(&self, coords: &[i64]) -> Result<Position> {
        verify_arg!(coords, coords.len() == self.dims());
        let mut pos = 0u64;
        for (d, &c) in coords.iter().enumerate() {
            if c < self.low[d] || c > self.high[d] {
                return Err(Error::invalid_arg(
                    "coords",
                    format!("dimension {d}: {c} is outside [{}, {}]", self.low[d], self.high[d]),
                ));
            }
            pos = pos * self.extent(d) + (c - self.low[d]) as u64;
        }
        Ok(pos)
    }

    fn coordinates_of(&self, mut pos: Position, coords: &mut [i64]) -> Result<()> {
        verify_arg!(coords, coords.len() == self.dims());
        verify_arg!(pos, pos < self.volume);
        for d in (0..self.dims()).rev() {
            let extent = self.extent(d);
            coords[d] = self.low[d] + (pos % extent) as i64;
            pos /= extent;
        }
        Ok(())
    }
}

/// Tile of cell coordinates stored as logical positions.
pub struct CoordinatesTile<M, E> {
    tile: Tile<u64, E>,
    mapper: M,
}

impl<M: CoordinatesMapper, E: Encoding<u64>> CoordinatesTile<M, E> {
    pub fn new(mapper: M, encoding: E) -> CoordinatesTile<M, E> {
        CoordinatesTile {
            tile: Tile::new(encoding),
            mapper,
        }
    }

    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    /// The underlying tile of logical positions.
    pub fn positions(&self) -> &Tile<u64, E> {
        &self.tile
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.tile.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tile.is_empty()
    }

    pub fn push(&mut self, coords: &[i64]) -> Result<()> {
        let pos = self.mapper.position_of(coords)?;
        self.tile.push(pos)
    }

    pub fn push_null(&mut self, reason: MissingReason) -> Result<()> {
        self.tile.push_null(reason)
    }

    /// Reads the coordinates of the cell at `index`. Missing cells yield an empty tuple.
    pub fn get(&self, index: u64) -> Result<Datum<Vec<i64>>> {
        let datum = self.tile.get(index);
        if let Some(reason) = datum.missing {
            return Ok(Datum::missing(reason));
        }
        let mut coords = vec![0; self.mapper.dims()];
        self.mapper.coordinates_of(datum.value, &mut coords)?;
        Ok(Datum::present(coords))
    }

    pub fn reserve(&mut self, additional: usize) {
        self.tile.reserve(additional);
    }

    pub fn finalize(&mut self) {
        self.tile.finalize();
    }

    pub fn clear(&mut self) {
        self.tile.clear();
    }

    pub fn dump(&self, sink: &mut impl fmt::Write) -> fmt::Result {
        writeln!(sink, "coordinates over {} dimensions", self.mapper.dims())?;
        self.tile.dump(sink)
    }
}
