//! Extraction of a sub-range of cells from an encoded payload.

use std::ops::Range;

use tessel_common::{Result, error::Error, verify_arg};

use crate::{
    element::ElementKind,
    payload::{Payload, PayloadView},
    segment::{Position, Segment},
    values::{ValueBuffer, ValueSlice},
    var_part::{self, VAR_OFFSET_SIZE},
};

/// Segments of a sub-range, rebased to start at zero, and the range of source values they
/// reference. The data indexes of the segments are relative to `values.start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeExtract {
    pub segments: Vec<Segment>,
    pub values: Range<usize>,
}

/// Computes the segments covering the cells `[offset, offset + count)` of `source`.
pub fn extract_range(source: &PayloadView<'_>, offset: Position, count: u64) -> Result<RangeExtract> {
    verify_arg!(count, offset.checked_add(count).is_some_and(|end| end <= source.len()));
    if count == 0 {
        return Ok(RangeExtract {
            segments: vec![Segment::terminal(0)],
            values: 0..0,
        });
    }
    let end = offset + count;
    let first = source
        .find_segment(offset)
        .ok_or_else(|| Error::invalid_arg("offset", "past the end of the payload"))?;
    let last = source
        .find_segment(end - 1)
        .ok_or_else(|| Error::invalid_arg("count", "past the end of the payload"))?;

    let mut segments = Vec::with_capacity(last - first + 2);
    let mut first_index: Option<usize> = None;
    let mut values_end = 0usize;
    for i in first..=last {
        let src = source.segment(i);
        let seg_start = src.start_position().max(offset);
        let seg_end = (src.start_position() + source.segment_len(i)).min(end);
        let start = seg_start - offset;
        if let Some(reason) = src.missing_reason() {
            segments.push(Segment::null_run(start, reason));
            continue;
        }
        let first_value = if src.is_run() {
            src.data_index() as usize
        } else {
            src.data_index() as usize + (seg_start - src.start_position()) as usize
        };
        let base = *first_index.get_or_insert(first_value);
        if first_value < base {
            return Err(Error::invalid_format(
                "payload segments",
                format!("segment {i} references values before the start of the range"),
            ));
        }
        let relative = (first_value - base) as u32;
        let (segment, used) = if src.is_run() {
            (Segment::run(start, relative), 1)
        } else {
            (Segment::literal(start, relative), (seg_end - seg_start) as usize)
        };
        segments.push(segment);
        values_end = values_end.max(first_value + used);
    }
    segments.push(Segment::terminal(count));
    let values = match first_index {
        Some(base) => base..values_end,
        None => 0..0,
    };
    Ok(RangeExtract { segments, values })
}

impl Payload {
    /// Copies the cells `[offset, offset + count)` of `source` into a new payload.
    ///
    /// The value buffer is copied as one contiguous slice. Variable-size datums are always
    /// copied whole, header included.
    pub fn from_range(source: &PayloadView<'_>, offset: Position, count: u64) -> Result<Payload> {
        let RangeExtract { segments, values } = extract_range(source, offset, count)?;
        let src = source.value_slice();
        let (data, var_offset) = match source.kind() {
            ElementKind::Variable => copy_variable(&src, values)?,
            ElementKind::Fixed(size) => {
                let size = size as usize;
                let data = src.data()[values.start * size..values.end * size].to_vec();
                let len = data.len();
                (data, len)
            }
            ElementKind::Boolean => {
                let mut buffer = ValueBuffer::new(ElementKind::Boolean);
                buffer.extend_from_slice(&src, values.start, values.len());
                buffer.into_data()
            }
        };
        Ok(Payload {
            kind: source.kind(),
            segments,
            data,
            var_offset,
        })
    }
}

/// Copies the variable-size values `range`. When the datums of the range are laid out in
/// offset order the variable part is copied as a single span and the offsets rebased.
fn copy_variable(src: &ValueSlice<'_>, range: Range<usize>) -> Result<(Vec<u8>, usize)> {
    if range.is_empty() {
        return Ok((Vec::new(), 0));
    }
    let fixed = src.fixed_part();
    let mut monotonic = true;
    let mut prev = 0;
    for i in range.clone() {
        let offset = var_part::read_offset(fixed, i);
        if offset < prev {
            monotonic = false;
            break;
        }
        prev = offset;
    }
    if !monotonic {
        let mut buffer = ValueBuffer::new(ElementKind::Variable);
        buffer.extend_from_slice(src, range.start, range.len());
        return Ok(buffer.into_data());
    }

    let (span_start, _) = src.datum_span(range.start)?;
    let (last_offset, last_size) = src.datum_span(range.end - 1)?;
    let span_end = last_offset + last_size;
    let var_offset = range.len() * VAR_OFFSET_SIZE;
    let mut data = Vec::with_capacity(var_offset + span_end - span_start);
    data.extend_from_slice(&fixed[range.start * VAR_OFFSET_SIZE..range.end * VAR_OFFSET_SIZE]);
    for i in 0..range.len() {
        let offset = var_part::read_offset(&data, i);
        var_part::write_offset(&mut data, i, offset - span_start);
    }
    data.extend_from_slice(&src.var_part()[span_start..span_end]);
    Ok((data, var_offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{builder::PayloadBuilder, value::Value, value::ValueRef};

    fn build(kind: ElementKind, values: &[Value]) -> Payload {
        let mut builder = PayloadBuilder::new(kind);
        for v in values {
            builder.push(v.as_ref()).unwrap();
        }
        builder.finish()
    }

    #[test]
    fn test_whole_range_is_identity() {
        let values: Vec<Value> = [1i32, 2, 2, 2, 2, 2, 3]
            .iter()
            .map(|v| Value::from(*v))
            .chain([Value::null(1), Value::from(4i32)])
            .collect();
        let p = build(ElementKind::Fixed(4), &values);
        let copy = Payload::from_range(&p.view(), 0, p.len()).unwrap();
        assert_eq!(copy, p);
    }

    #[test]
    fn test_literal_cut_mid_segment() {
        let values: Vec<Value> = (0..10i64).map(Value::from).collect();
        let p = build(ElementKind::Fixed(8), &values);
        let r = extract_range(&p.view(), 3, 4).unwrap();
        assert_eq!(r.segments, [Segment::literal(0, 0), Segment::terminal(4)]);
        assert_eq!(r.values, 3..7);
        let sub = Payload::from_range(&p.view(), 3, 4).unwrap();
        assert_eq!(sub.to_values(), values[3..7]);
    }

    #[test]
    fn test_range_starting_in_null_run() {
        let mut builder = PayloadBuilder::new(ElementKind::Fixed(8));
        builder.push_nulls(2, 5).unwrap();
        builder.push(Value::from(1i64).as_ref()).unwrap();
        builder.push(Value::from(2i64).as_ref()).unwrap();
        let p = builder.finish();
        let sub = Payload::from_range(&p.view(), 3, 3).unwrap();
        assert_eq!(
            sub.segments(),
            &[Segment::null_run(0, 2), Segment::literal(2, 0)]
        );
        assert_eq!(sub.value_at(2).and_then(|v| v.as_i64()), Some(1));
    }

    #[test]
    fn test_variable_slice_keeps_headers() {
        let long = vec![b'z'; 300];
        let values = vec![
            Value::from("a"),
            Value::from(long.clone()),
            Value::from("bc"),
            Value::from(""),
            Value::from("d"),
        ];
        let p = build(ElementKind::Variable, &values);
        let sub = Payload::from_range(&p.view(), 1, 3).unwrap();
        assert_eq!(sub.to_values(), values[1..4]);
        assert_eq!(sub.data().len(), 3 * 4 + 305 + 3 + 5);

        let reparsed = Payload::from_bytes(&sub.to_bytes()).unwrap();
        assert_eq!(reparsed.value_at(0), Some(ValueRef::Bytes(&long)));
    }

    #[test]
    fn test_boolean_slice() {
        let values: Vec<Value> = (0..30).map(|i| Value::from(i % 3 == 0)).collect();
        let p = build(ElementKind::Boolean, &values);
        let sub = Payload::from_range(&p.view(), 5, 20).unwrap();
        assert_eq!(sub.to_values(), values[5..25]);
    }

    #[test]
    fn test_empty_ranges() {
        for kind in [ElementKind::Fixed(4), ElementKind::Boolean, ElementKind::Variable] {
            let empty = Payload::empty(kind);
            assert_eq!(Payload::from_range(&empty.view(), 0, empty.len()).unwrap(), empty);
        }
        let p = build(ElementKind::Variable, &[Value::from("a"), Value::from("b")]);
        for offset in 0..=2 {
            let sub = Payload::from_range(&p.view(), offset, 0).unwrap();
            assert!(sub.is_empty());
            assert_eq!(sub.kind(), ElementKind::Variable);
        }
    }

    #[test]
    fn test_invalid_ranges() {
        let p = build(ElementKind::Fixed(1), &[Value::from(1u8)]);
        assert!(Payload::from_range(&p.view(), 2, 0).is_err());
        assert!(Payload::from_range(&p.view(), 0, 2).is_err());
        assert!(Payload::from_range(&p.view(), u64::MAX, 2).is_err());
    }
}
