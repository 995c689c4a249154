//! Encode command implementation

use anyhow::{Context, Result};
use tessel_tile::{EncodingKind, TileConfig, TileFactory, ValueType};

use crate::{
    json::to_cell,
    utils::{read_file, write_file},
};

pub fn run(
    value_type: ValueType,
    config_path: Option<String>,
    encoding: Option<EncodingKind>,
    input: String,
    output: String,
) -> Result<()> {
    let mut config = match &config_path {
        Some(path) => serde_json::from_slice::<TileConfig>(&read_file(path)?)
            .with_context(|| format!("Failed to parse tile configuration: {}", path))?,
        None => TileConfig::default(),
    };
    if let Some(encoding) = encoding {
        config = config.with_encoding(encoding);
    }

    let values: Vec<serde_json::Value> = serde_json::from_slice(&read_file(&input)?)
        .with_context(|| format!("Expected a JSON array of values in {}", input))?;
    log::debug!(
        "encoding {} {:?} values with {:?}",
        values.len(),
        value_type,
        config
    );

    let factory = TileFactory::new();
    let mut tile = factory
        .create(value_type, &config.with_capacity_hint(values.len()))
        .with_context(|| format!("Cannot create a {:?} tile", value_type))?;
    for (i, json) in values.iter().enumerate() {
        let cell = to_cell(value_type, json).with_context(|| format!("Invalid value #{}", i))?;
        tile.push_value(cell.as_ref())
            .with_context(|| format!("Failed to encode value #{}", i))?;
    }
    tile.finalize();

    let payload = tile.to_payload()?;
    println!(
        "Encoded {} cells into {} segments",
        payload.len(),
        payload.segment_count()
    );
    write_file(&output, &payload.to_bytes())
}
