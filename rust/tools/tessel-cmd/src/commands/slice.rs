//! Slice command implementation

use anyhow::{Context, Result};
use tessel_rle::Payload;

use crate::{commands::read_payload, utils::write_file};

pub fn run(offset: u64, count: Option<u64>, input: String, output: String) -> Result<()> {
    let payload = read_payload(&input)?;
    let count = match count {
        Some(count) => count,
        None => payload.len().checked_sub(offset).with_context(|| {
            format!("Offset {} is past the end of {} cells", offset, payload.len())
        })?,
    };
    let slice = Payload::from_range(&payload.view(), offset, count).with_context(|| {
        format!(
            "Cannot copy cells [{}; {})",
            offset,
            offset.saturating_add(count)
        )
    })?;
    log::debug!(
        "sliced {} of {} cells, {} segments",
        slice.len(),
        payload.len(),
        slice.segment_count()
    );
    write_file(&output, &slice.to_bytes())
}
