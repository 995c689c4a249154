//! Command implementations for tessel-cmd

use anyhow::{Context, Result};
use tessel_bitmap::PositionBitmap;
use tessel_rle::Payload;

use crate::utils::read_file;

pub mod bitmap;
pub mod concat;
pub mod cut;
pub mod decode;
pub mod encode;
pub mod inspect;
pub mod slice;

/// Reads and validates a payload file.
pub fn read_payload(path: &str) -> Result<Payload> {
    let bytes = read_file(path)?;
    Payload::from_bytes(&bytes).with_context(|| format!("Invalid payload file: {}", path))
}

/// Reads and validates a bitmap file.
pub fn read_bitmap(path: &str) -> Result<PositionBitmap> {
    let bytes = read_file(path)?;
    PositionBitmap::from_bytes(&bytes).with_context(|| format!("Invalid bitmap file: {}", path))
}
