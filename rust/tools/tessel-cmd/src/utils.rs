//! Common utilities for tessel-cmd

use anyhow::{Context, Result};
use std::path::Path;
use tessel_tile::{EncodingKind, ValueType};

/// Checks if a file exists and is readable
pub fn validate_file_exists(path: &str) -> Result<()> {
    let file_path = Path::new(path);
    if !file_path.exists() {
        anyhow::bail!("File does not exist: {}", path);
    }
    if !file_path.is_file() {
        anyhow::bail!("Path is not a file: {}", path);
    }
    Ok(())
}

pub fn read_file(path: &str) -> Result<Vec<u8>> {
    validate_file_exists(path)?;
    std::fs::read(path).with_context(|| format!("Failed to read file: {}", path))
}

pub fn write_file(path: &str, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("Failed to write file: {}", path))?;
    log::info!("wrote {} to {}", format_size(bytes.len() as u64), path);
    Ok(())
}

/// Formats file size in human-readable format
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Parses a value type by its serialized name, e.g. `int32` or `string`.
pub fn parse_value_type(s: &str) -> Result<ValueType, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| format!("unknown value type: {s}"))
}

/// Parses an encoding kind by its serialized name, `identity` or `run_length`.
pub fn parse_encoding_kind(s: &str) -> Result<EncodingKind, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| format!("unknown encoding: {s}"))
}
