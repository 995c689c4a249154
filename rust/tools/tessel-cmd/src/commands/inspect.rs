//! Inspect command implementation

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tessel_bitmap::{BITMAP_MAGIC, BitmapView};
use tessel_rle::{PayloadView, payload::PAYLOAD_MAGIC};

use crate::utils::{format_size, read_file};

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Summary {
    Payload(PayloadSummary),
    Bitmap(BitmapSummary),
}

#[derive(Serialize)]
struct PayloadSummary {
    element_kind: String,
    cell_count: u64,
    segment_count: usize,
    value_count: usize,
    null_cell_count: u64,
    run_cell_count: u64,
    packed_size: usize,
}

#[derive(Serialize)]
struct BitmapSummary {
    populated_count: u64,
    segment_count: usize,
    logical_end: u64,
    dense: bool,
    packed_size: usize,
}

pub fn run(json: bool, path: String) -> Result<()> {
    let bytes = read_file(&path)?;
    let text = describe(&bytes, json).with_context(|| format!("Failed to inspect {}", path))?;
    println!("File: {} ({})", path, format_size(bytes.len() as u64));
    print!("{}", text);
    Ok(())
}

/// Renders the summary of an encoded payload or bitmap, recognized by its magic.
fn describe(bytes: &[u8], json: bool) -> Result<String> {
    let Some(magic) = bytes.first_chunk::<8>().map(|m| u64::from_le_bytes(*m)) else {
        bail!("{} bytes are too short for a header", bytes.len());
    };
    let mut out = String::new();
    match magic {
        PAYLOAD_MAGIC => {
            let view = PayloadView::from_bytes(bytes)?;
            if json {
                out = serde_json::to_string_pretty(&Summary::Payload(payload_summary(&view)))?;
                out.push('\n');
            } else {
                view.dump(&mut out)?;
            }
        }
        BITMAP_MAGIC => {
            let view = BitmapView::from_bytes(bytes)?;
            if json {
                out = serde_json::to_string_pretty(&Summary::Bitmap(bitmap_summary(&view)))?;
                out.push('\n');
            } else {
                view.dump(&mut out)?;
            }
        }
        _ => bail!("unknown magic {:#018x}", magic),
    }
    Ok(out)
}

fn payload_summary(view: &PayloadView<'_>) -> PayloadSummary {
    let (mut null_cell_count, mut run_cell_count) = (0, 0);
    for span in view.spans() {
        if span.segment.is_null() {
            null_cell_count += span.length;
        } else if span.segment.is_run() {
            run_cell_count += span.length;
        }
    }
    PayloadSummary {
        element_kind: format!("{:?}", view.kind()),
        cell_count: view.len(),
        segment_count: view.segment_count(),
        value_count: view.value_count(),
        null_cell_count,
        run_cell_count,
        packed_size: view.packed_size(),
    }
}

fn bitmap_summary(view: &BitmapView<'_>) -> BitmapSummary {
    BitmapSummary {
        populated_count: view.count(),
        segment_count: view.segment_count(),
        logical_end: view.logical_end(),
        dense: view.is_dense(),
        packed_size: view.packed_size(),
    }
}
