//! Decode command implementation

use anyhow::{Context, Result, bail};
use tessel_tile::ValueType;

use crate::{commands::read_payload, json::from_cell, utils::write_file};

pub fn run(value_type: ValueType, input: String, output: Option<String>) -> Result<()> {
    let payload = read_payload(&input)?;
    if payload.kind() != value_type.element_kind() {
        bail!(
            "{} holds {:?} elements, {:?} values need {:?}",
            input,
            payload.kind(),
            value_type,
            value_type.element_kind()
        );
    }

    let values = payload
        .view()
        .values()
        .enumerate()
        .map(|(i, value)| {
            from_cell(value_type, value).with_context(|| format!("Invalid cell #{}", i))
        })
        .collect::<Result<Vec<_>>>()?;
    let json = serde_json::to_string_pretty(&values)?;

    match output {
        Some(path) => write_file(&path, json.as_bytes()),
        None => {
            println!("{}", json);
            Ok(())
        }
    }
}
