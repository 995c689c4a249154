use tessel_rle::{
    AppendIterator, ElementKind, Payload, PayloadBuilder, PayloadView, Segment, Value, ValueRef,
    payload::PAYLOAD_HEADER_SIZE,
};
use tessel_testkit::data_gen::{Cell, CellShape, bool_cells, bytes_cells, int_cells};

fn to_values<T: Clone + Into<Value>>(cells: &[Cell<T>]) -> Vec<Value> {
    cells
        .iter()
        .map(|c| match c {
            Cell::Value(v) => v.clone().into(),
            Cell::Missing(reason) => Value::null(*reason),
        })
        .collect()
}

fn narrow(values: &[Value], size: usize) -> Vec<Value> {
    values
        .iter()
        .map(|v| match v.as_bytes() {
            Some(bytes) => Value::from_bytes(&bytes[..size]),
            None => v.clone(),
        })
        .collect()
}

fn encode(kind: ElementKind, values: &[Value]) -> Payload {
    let mut builder = PayloadBuilder::new(kind);
    for v in values {
        builder.push(v.as_ref()).unwrap();
    }
    builder.finish()
}

fn assert_well_formed(p: &Payload) {
    let segments = p.view().segments_with_terminal();
    for pair in segments.windows(2) {
        assert!(pair[0].start_position() < pair[1].start_position());
    }
    assert_eq!(segments.last().unwrap().start_position(), p.len());
}

#[test]
fn test_round_trip_fixed_sizes() {
    let shape = CellShape::default().with_len(2000);
    for (seed, size) in [(1u64, 1usize), (2, 2), (3, 4), (4, 8)] {
        let values = narrow(&to_values(&int_cells(seed, &shape)), size);
        let p = encode(ElementKind::Fixed(size as u32), &values);
        assert_well_formed(&p);
        assert_eq!(p.to_values(), values);
        let view = p.view();
        for (pos, v) in values.iter().enumerate() {
            assert_eq!(*v, view.value_at(pos as u64).unwrap());
        }
    }
}

#[test]
fn test_round_trip_booleans_and_bytes() {
    let shape = CellShape::default().with_len(3000).with_max_stretch(40);
    let bools = to_values(&bool_cells(7, &shape));
    let p = encode(ElementKind::Boolean, &bools);
    assert_well_formed(&p);
    assert_eq!(p.to_values(), bools);

    let strings = to_values(&bytes_cells(8, &shape));
    let p = encode(ElementKind::Variable, &strings);
    assert_well_formed(&p);
    assert_eq!(p.to_values(), strings);
}

#[test]
fn test_run_length_boundaries() {
    for kind in [
        ElementKind::Fixed(1),
        ElementKind::Fixed(4),
        ElementKind::Fixed(8),
        ElementKind::Fixed(16),
        ElementKind::Variable,
    ] {
        let max = kind.max_run_len();
        for run in [1, max.saturating_sub(1), max, max + 1] {
            let mut values = vec![Value::from(1u8)];
            values.extend(std::iter::repeat_n(Value::from(2u8), run));
            values.push(Value::from(3u8));
            values.extend(std::iter::repeat_n(Value::from(3u8), run));
            let p = encode(kind, &values);
            assert_well_formed(&p);
            let decoded: Vec<Value> = p
                .to_values()
                .into_iter()
                .map(|v| Value::from_bytes(&v.as_bytes().unwrap()[..1]))
                .collect();
            assert_eq!(decoded, values, "kind {kind:?}, run {run}");
        }
    }
}

#[test]
fn test_run_conversion_saves_values() {
    let values: Vec<Value> = std::iter::repeat_n(Value::from(5i64), 100).collect();
    let p = encode(ElementKind::Fixed(8), &values);
    assert_eq!(p.segments(), &[Segment::run(0, 0)]);
    assert_eq!(p.data().len(), 8);
}

#[test]
fn test_wire_round_trip() {
    let shape = CellShape::default().with_len(700);
    let strings = to_values(&bytes_cells(11, &shape));
    let p = encode(ElementKind::Variable, &strings);
    let bytes = p.to_bytes();
    assert_eq!(bytes.len(), p.view().packed_size());
    let view = PayloadView::from_bytes(&bytes).unwrap();
    assert_eq!(view.to_values(), strings);
    assert_eq!(view.to_payload(), p);
}

#[test]
fn test_wire_round_trip_with_nulls() {
    let null_heavy = CellShape::default()
        .with_len(500)
        .with_null_ratio(0.8)
        .with_reasons(100_000);
    let all_null = null_heavy.clone().with_null_ratio(1.0);
    let mut cases: Vec<(ElementKind, Vec<Value>)> = Vec::new();
    for (seed, shape) in [(12u64, &null_heavy), (13, &all_null)] {
        cases.push((ElementKind::Fixed(8), narrow(&to_values(&int_cells(seed, shape)), 8)));
        cases.push((ElementKind::Boolean, to_values(&bool_cells(seed, shape))));
        cases.push((ElementKind::Variable, to_values(&bytes_cells(seed, shape))));
    }
    let five_null_seven = vec![Value::from(5i64), Value::null(3), Value::null(3), Value::from(7i64)];
    cases.push((ElementKind::Fixed(8), five_null_seven));
    let leading_nulls = vec![Value::null(42), Value::null(42), Value::from(1i32), Value::from(1i32)];
    cases.push((ElementKind::Fixed(4), leading_nulls));

    for (kind, values) in cases {
        let p = encode(kind, &values);
        let decoded = Payload::from_bytes(&p.to_bytes()).unwrap();
        assert_eq!(decoded.to_values(), values, "kind {kind:?}");
        assert_eq!(decoded, p);
    }
}

#[test]
fn test_rejects_corrupted_buffers() {
    let values: Vec<Value> = (0..50i32).map(|i| Value::from(i / 7)).collect();
    let p = encode(ElementKind::Fixed(4), &values);
    let bytes = p.to_bytes();

    let mut bad_magic = bytes.clone();
    bad_magic[0] ^= 0xFF;
    assert!(PayloadView::from_bytes(&bad_magic).unwrap_err().is_invalid_format());

    assert!(PayloadView::from_bytes(&bytes[..bytes.len() - 1]).is_err());
    assert!(PayloadView::from_bytes(&bytes[..PAYLOAD_HEADER_SIZE - 1]).is_err());

    let mut bad_index = bytes.clone();
    let word_at = PAYLOAD_HEADER_SIZE + 8;
    bad_index[word_at..word_at + 4].copy_from_slice(&0x3FFF_0000u32.to_le_bytes());
    assert!(PayloadView::from_bytes(&bad_index).is_err());

    let mut unordered = bytes.clone();
    let second_start = PAYLOAD_HEADER_SIZE + 12;
    unordered[second_start..second_start + 8].copy_from_slice(&0u64.to_le_bytes());
    assert!(PayloadView::from_bytes(&unordered).is_err());
}

#[test]
fn test_from_range_matches_slices() {
    let shape = CellShape::default().with_len(120).with_max_stretch(9);
    let sources = [
        (ElementKind::Fixed(8), narrow(&to_values(&int_cells(21, &shape)), 8)),
        (ElementKind::Boolean, to_values(&bool_cells(22, &shape))),
        (ElementKind::Variable, to_values(&bytes_cells(23, &shape))),
    ];
    for (kind, values) in sources {
        let p = encode(kind, &values);
        let view = p.view();
        for offset in (0..values.len()).step_by(7) {
            for count in [1, 2, 5, 13, 40, values.len() - offset] {
                if offset + count > values.len() {
                    continue;
                }
                let sub = Payload::from_range(&view, offset as u64, count as u64).unwrap();
                assert_well_formed(&sub);
                assert_eq!(sub.to_values(), values[offset..offset + count]);
                Payload::from_bytes(&sub.to_bytes()).unwrap();
            }
        }
        let whole = Payload::from_range(&view, 0, p.len()).unwrap();
        assert_eq!(whole.to_values(), values);
    }
}

#[test]
fn test_merge_associativity() {
    let shape = CellShape::default()
        .with_len(300)
        .with_null_ratio(0.3)
        .with_reasons(10_000);
    for kind in [ElementKind::Fixed(8), ElementKind::Boolean, ElementKind::Variable] {
        let parts: Vec<Vec<Value>> = (0..3u64)
            .map(|i| match kind {
                ElementKind::Fixed(_) => narrow(&to_values(&int_cells(30 + i, &shape)), 8),
                ElementKind::Boolean => to_values(&bool_cells(30 + i, &shape)),
                ElementKind::Variable => to_values(&bytes_cells(30 + i, &shape)),
            })
            .collect();
        let [a, b, c] = [0, 1, 2].map(|i| encode(kind, &parts[i]));

        let left =
            Payload::concat(&Payload::concat(&a.view(), &b.view()).unwrap().view(), &c.view())
                .unwrap();
        let right =
            Payload::concat(&a.view(), &Payload::concat(&b.view(), &c.view()).unwrap().view())
                .unwrap();
        let expected: Vec<Value> = parts.concat();
        assert_eq!(left.to_values(), expected, "kind {kind:?}");
        assert_eq!(right.to_values(), expected, "kind {kind:?}");
        assert_well_formed(&left);
        let decoded = Payload::from_bytes(&right.to_bytes()).unwrap();
        assert_eq!(decoded.to_values(), expected);
    }
}

#[test]
fn test_append_iterator_equals_concatenation() {
    let shape = CellShape::default().with_len(400);
    let parts: Vec<Vec<Value>> = (0..4)
        .map(|i| narrow(&to_values(&int_cells(50 + i, &shape)), 4))
        .collect();
    let payloads: Vec<Payload> = parts
        .iter()
        .map(|values| encode(ElementKind::Fixed(4), values))
        .collect();

    let mut appender = AppendIterator::new(ElementKind::Fixed(4));
    for p in &payloads {
        let mut iter = p.view().iter();
        // pull in uneven chunks to exercise partial segments
        let mut step = 1;
        while appender.add(&mut iter, step).unwrap() > 0 {
            step = step % 11 + 3;
        }
    }
    let merged = appender.finish();
    assert_well_formed(&merged);
    assert_eq!(merged.to_values(), parts.concat());

    let mut concatenated = Payload::empty(ElementKind::Fixed(4));
    for p in &payloads {
        concatenated.append(&p.view()).unwrap();
    }
    assert_eq!(concatenated.to_values(), merged.to_values());
}

#[test]
fn test_null_reasons_are_distinct() {
    let values = vec![
        Value::from(5i32),
        Value::null(3),
        Value::null(3),
        Value::null(4),
        Value::from(7i32),
    ];
    let p = encode(ElementKind::Fixed(4), &values);
    assert_eq!(p.segment_count(), 4);
    assert_eq!(p.value_at(2), Some(ValueRef::Null(3)));
    assert_eq!(p.value_at(3), Some(ValueRef::Null(4)));
}
