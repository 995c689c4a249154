//! Encoding of the variable part of a variable-size value buffer.
//!
//! Each datum is preceded by its length: a single byte for lengths `1..=255`, otherwise a zero
//! marker byte followed by a 4-byte little-endian length.

use tessel_common::{Result, error::Error};

/// Size of one offset entry in the fixed part of a variable-size value buffer.
pub const VAR_OFFSET_SIZE: usize = 4;

const LONG_HEADER_SIZE: usize = 5;

/// Header size for a datum of `len` bytes.
#[inline]
pub fn header_len(len: usize) -> usize {
    if (1..=255).contains(&len) {
        1
    } else {
        LONG_HEADER_SIZE
    }
}

/// Appends the header and the bytes of a datum.
pub fn encode_datum(out: &mut Vec<u8>, datum: &[u8]) {
    let len = datum.len();
    if header_len(len) == 1 {
        out.push(len as u8);
    } else {
        out.push(0);
        out.extend_from_slice(&(len as u32).to_le_bytes());
    }
    out.extend_from_slice(datum);
}

/// Decodes the datum whose header starts at `offset` within `var_part`.
///
/// Returns the datum bytes and the total encoded size (header included).
pub fn decode_datum(var_part: &[u8], offset: usize) -> Result<(&[u8], usize)> {
    let Some(&first) = var_part.get(offset) else {
        return Err(Error::invalid_format(
            "variable part",
            format!("datum offset {offset} is out of bounds"),
        ));
    };
    let (header, len) = if first != 0 {
        (1, first as usize)
    } else {
        let Some(&[b0, b1, b2, b3]) = var_part.get(offset + 1..offset + LONG_HEADER_SIZE) else {
            return Err(Error::invalid_format(
                "variable part",
                "truncated datum header",
            ));
        };
        let len = u32::from_le_bytes([b0, b1, b2, b3]) as usize;
        (LONG_HEADER_SIZE, len)
    };
    let start = offset + header;
    let datum = var_part
        .get(start..start + len)
        .ok_or_else(|| Error::invalid_format("variable part", "truncated datum"))?;
    Ok((datum, header + len))
}

/// Reads the offset entry `index` of a fixed part.
#[inline]
pub fn read_offset(fixed_part: &[u8], index: usize) -> usize {
    let at = index * VAR_OFFSET_SIZE;
    let slot = &fixed_part[at..at + VAR_OFFSET_SIZE];
    u32::from_le_bytes([slot[0], slot[1], slot[2], slot[3]]) as usize
}

/// Overwrites the offset entry `index` of a fixed part.
#[inline]
pub fn write_offset(fixed_part: &mut [u8], index: usize, offset: usize) {
    let at = index * VAR_OFFSET_SIZE;
    fixed_part[at..at + VAR_OFFSET_SIZE].copy_from_slice(&(offset as u32).to_le_bytes());
}
