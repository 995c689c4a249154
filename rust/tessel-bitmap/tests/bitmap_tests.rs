use tessel_bitmap::{
    BitmapView, PositionBitmap,
    unpack::{cut_chunk, unpack_presence, unpack_values},
};
use tessel_rle::{ElementKind, Payload, PayloadBuilder, Position, Value, ValueRef};

fn random_positions(seed: u64, len: u64) -> Vec<Position> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut positions = Vec::new();
    let mut pos = 0;
    while pos < len {
        if rng.u8(0..3) == 0 {
            pos += rng.u64(1..10);
        } else {
            let run = rng.u64(1..8).min(len - pos);
            positions.extend(pos..pos + run);
            pos += run;
        }
    }
    positions
}

fn payload_of(values: &[i64]) -> Payload {
    let mut builder = PayloadBuilder::new(ElementKind::Fixed(8));
    for v in values {
        builder.push(ValueRef::Bytes(&v.to_le_bytes())).unwrap();
    }
    builder.finish()
}

#[test]
fn test_bitmap_wire_round_trip() {
    for seed in 0..10 {
        let bitmap = PositionBitmap::from_positions(random_positions(seed, 500)).unwrap();
        let bytes = bitmap.to_bytes();
        let view = BitmapView::from_bytes(&bytes).unwrap();
        assert_eq!(view.to_bitmap(), bitmap);
        assert_eq!(view.packed_size(), bytes.len());
    }
}

#[test]
fn test_presence_matches_lookup() {
    let positions = random_positions(3, 300);
    let bitmap = PositionBitmap::from_positions(positions.iter().copied()).unwrap();
    let presence = unpack_presence(&bitmap.view(), 17, 250).unwrap();
    for (i, value) in presence.to_values().iter().enumerate() {
        let pos = 17 + i as u64;
        assert_eq!(value, &Value::Bool(bitmap.contains(pos)), "position {pos}");
    }
    let rebuilt = PositionBitmap::from_boolean_payload(&presence.view()).unwrap();
    let expected: Vec<Position> = positions
        .iter()
        .copied()
        .filter(|p| (17..250).contains(p))
        .collect();
    assert_eq!(
        rebuilt.view().positions().map(|(l, _)| l + 17).collect::<Vec<_>>(),
        expected
    );
}

#[test]
fn test_unpack_values_matches_lookup() {
    let positions = random_positions(5, 400);
    let bitmap = PositionBitmap::from_positions(positions.iter().copied()).unwrap();
    let values: Vec<i64> = positions.iter().map(|&p| (p / 4) as i64).collect();
    let payload = payload_of(&values);

    for (start, end) in [(0, 400), (13, 77), (100, 101), (390, 1000)] {
        let unpacked = unpack_values(&payload.view(), &bitmap.view(), start, end).unwrap();
        let expected: Vec<Value> = positions
            .iter()
            .filter(|p| (start..end).contains(*p))
            .map(|&p| Value::from_scalar((p / 4) as i64))
            .collect();
        assert_eq!(unpacked.to_values(), expected, "range {start}..{end}");
    }
}

#[test]
fn test_cut_chunk_with_halo() {
    // 12x12 chunk including a halo of 2 on every side
    let positions = random_positions(11, 144);
    let bitmap = PositionBitmap::from_positions(positions.iter().copied()).unwrap();
    let values: Vec<i64> = positions.iter().map(|&p| p as i64).collect();
    let payload = payload_of(&values);

    let (cut_values, cut_bitmap) = cut_chunk(
        &payload.view(),
        &bitmap.view(),
        &[-2, -2],
        &[9, 9],
        &[0, 0],
        &[7, 7],
    )
    .unwrap();

    let expected: Vec<Position> = positions
        .iter()
        .copied()
        .filter(|p| {
            let (row, col) = (p / 12, p % 12);
            (2..10).contains(&row) && (2..10).contains(&col)
        })
        .collect();
    assert_eq!(
        cut_bitmap.view().positions().map(|(l, _)| l).collect::<Vec<_>>(),
        expected
    );
    assert!(cut_bitmap.view().is_dense());
    let decoded: Vec<Position> = cut_values
        .to_values()
        .iter()
        .map(|v| v.as_i64().unwrap() as Position)
        .collect();
    assert_eq!(decoded, expected);
}
