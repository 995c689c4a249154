//! Unpacking of chunk cells through their position bitmap.

use tessel_common::{Result, error::Error, verify_arg};
use tessel_rle::{AppendIterator, ElementKind, Payload, PayloadBuilder, PayloadView, Position, ValueRef};

use crate::bitmap::{BitmapView, PositionBitmap};

/// Boolean payload telling, for every logical position of `[start, end)`, whether it is
/// populated in `bitmap`.
pub fn unpack_presence(bitmap: &BitmapView<'_>, start: Position, end: Position) -> Result<Payload> {
    verify_arg!(end, start <= end);
    let mut builder = PayloadBuilder::new(ElementKind::Boolean);
    let mut pos = start;
    if let Some(first) = bitmap.find_segment(start) {
        for s in &bitmap.segments()[first..] {
            if s.logical_position() >= end {
                break;
            }
            let lo = s.logical_position().max(start);
            let hi = s.logical_end().min(end);
            builder.push_repeated(ValueRef::Bool(false), lo - pos)?;
            builder.push_repeated(ValueRef::Bool(true), hi - lo)?;
            pos = hi;
        }
    }
    builder.push_repeated(ValueRef::Bool(false), end - pos)?;
    Ok(builder.finish())
}

/// Values of the populated cells of `[start, end)`, in logical order. `payload` holds the
/// values at the physical positions of `bitmap`.
pub fn unpack_values(
    payload: &PayloadView<'_>,
    bitmap: &BitmapView<'_>,
    start: Position,
    end: Position,
) -> Result<Payload> {
    verify_arg!(end, start <= end);
    let ranges = bitmap
        .find_segment(start)
        .map_or(&[][..], |first| &bitmap.segments()[first..])
        .iter()
        .take_while(|s| s.logical_position() < end)
        .map(|s| {
            let lo = s.logical_position().max(start);
            let hi = s.logical_end().min(end);
            (s.physical_position() + (lo - s.logical_position()), hi - lo)
        });
    gather(payload, ranges)
}

/// Restricts a chunk, given as its value payload and position bitmap laid out over
/// `[lower_origin, upper_origin]`, to the cells inside `[lower_result, upper_result]`.
///
/// Returns the dense payload of the remaining values and their renumbered bitmap.
pub fn cut_chunk(
    payload: &PayloadView<'_>,
    bitmap: &BitmapView<'_>,
    lower_origin: &[i64],
    upper_origin: &[i64],
    lower_result: &[i64],
    upper_result: &[i64],
) -> Result<(Payload, PositionBitmap)> {
    let cut = bitmap.cut(lower_origin, upper_origin, lower_result, upper_result)?;
    let values = gather(
        payload,
        cut.segments()
            .iter()
            .map(|s| (s.physical_position(), s.length())),
    )?;
    Ok((values, cut.renumbered()))
}

/// Concatenates the `(physical position, length)` ranges of `payload`.
fn gather<I>(payload: &PayloadView<'_>, ranges: I) -> Result<Payload>
where
    I: IntoIterator<Item = (Position, u64)>,
{
    let mut appender = AppendIterator::new(payload.kind());
    let mut src = payload.iter();
    for (physical, length) in ranges {
        if !src.seek(physical) {
            return Err(Error::invalid_format(
                "bitmap",
                format!("physical position {physical} is past the payload end"),
            ));
        }
        let mut remaining = length;
        while remaining > 0 {
            let copied = appender.add(&mut src, remaining)?;
            if copied == 0 {
                return Err(Error::invalid_format(
                    "bitmap",
                    format!("range at {physical} runs past the payload end"),
                ));
            }
            remaining -= copied;
        }
    }
    Ok(appender.finish())
}
