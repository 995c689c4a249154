//! Cut command implementation

use anyhow::{Context, Result};
use tessel_bitmap::unpack::cut_chunk;

use crate::{
    commands::{read_bitmap, read_payload},
    utils::write_file,
};

pub struct CutArgs {
    pub payload: String,
    pub bitmap: String,
    /// Low and high coordinates of the chunk box.
    pub origin: (Vec<i64>, Vec<i64>),
    /// Low and high coordinates of the result box.
    pub result: (Vec<i64>, Vec<i64>),
    pub out_payload: String,
    pub out_bitmap: String,
}

pub fn run(args: CutArgs) -> Result<()> {
    let payload = read_payload(&args.payload)?;
    let bitmap = read_bitmap(&args.bitmap)?;
    let (values, positions) = cut_chunk(
        &payload.view(),
        &bitmap.view(),
        &args.origin.0,
        &args.origin.1,
        &args.result.0,
        &args.result.1,
    )
    .with_context(|| {
        format!(
            "Cannot cut box {:?}..{:?} out of {:?}..{:?}",
            args.result.0, args.result.1, args.origin.0, args.origin.1
        )
    })?;
    println!(
        "Kept {} of {} cells in {} bitmap segments",
        positions.count(),
        bitmap.count(),
        positions.segment_count()
    );
    write_file(&args.out_payload, &values.to_bytes())?;
    write_file(&args.out_bitmap, &positions.to_bytes())
}
