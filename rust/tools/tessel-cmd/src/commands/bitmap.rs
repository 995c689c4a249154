//! Bitmap command implementation

use anyhow::{Context, Result, bail};
use tessel_bitmap::PositionBitmap;

use crate::{
    commands::read_payload,
    utils::{read_file, write_file},
};

pub fn run(positions: Option<String>, presence: Option<String>, output: String) -> Result<()> {
    let bitmap = match (positions, presence) {
        (Some(path), None) => {
            let positions: Vec<u64> = serde_json::from_slice(&read_file(&path)?)
                .with_context(|| format!("Expected a JSON array of positions in {}", path))?;
            PositionBitmap::from_positions(positions)
                .with_context(|| format!("Invalid positions in {}", path))?
        }
        (None, Some(path)) => {
            let payload = read_payload(&path)?;
            PositionBitmap::from_boolean_payload(&payload.view())
                .with_context(|| format!("Cannot build a bitmap from {}", path))?
        }
        _ => bail!("Specify exactly one of --positions and --presence"),
    };
    println!(
        "Built a bitmap of {} positions in {} segments",
        bitmap.count(),
        bitmap.segment_count()
    );
    write_file(&output, &bitmap.to_bytes())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tessel_rle::{ElementKind, PayloadBuilder, ValueRef};

    use super::*;
    use crate::commands::read_bitmap;

    #[test]
    fn test_bitmap_from_positions() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("positions.json");
        let output = dir.path().join("bitmap.bin");
        fs::write(&input, "[0, 1, 2, 10, 11]").unwrap();

        run(
            Some(input.to_str().unwrap().to_string()),
            None,
            output.to_str().unwrap().to_string(),
        )
        .unwrap();
        let bitmap = read_bitmap(output.to_str().unwrap()).unwrap();
        assert_eq!(bitmap.count(), 5);
        assert_eq!(bitmap.segment_count(), 2);
        assert_eq!(bitmap.physical_position(10), Some(3));

        fs::write(&input, "[3, 2]").unwrap();
        assert!(
            run(
                Some(input.to_str().unwrap().to_string()),
                None,
                output.to_str().unwrap().to_string(),
            )
            .is_err()
        );
    }

    #[test]
    fn test_bitmap_from_presence() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("presence.bin");
        let output = dir.path().join("bitmap.bin");
        let mut builder = PayloadBuilder::new(ElementKind::Boolean);
        for b in [false, true, true, false, true] {
            builder.push(ValueRef::Bool(b)).unwrap();
        }
        fs::write(&input, builder.finish().to_bytes()).unwrap();

        run(
            None,
            Some(input.to_str().unwrap().to_string()),
            output.to_str().unwrap().to_string(),
        )
        .unwrap();
        let bitmap = read_bitmap(output.to_str().unwrap()).unwrap();
        let positions: Vec<u64> = bitmap.view().positions().map(|(l, _)| l).collect();
        assert_eq!(positions, [1, 2, 4]);
    }

    #[test]
    fn test_bitmap_needs_one_source() {
        assert!(run(None, None, "unused.bin".to_string()).is_err());
    }
}
