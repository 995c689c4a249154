//! Conversion between JSON values and tagged cell values.
//!
//! A missing cell is written as `null` when its reason is 0, and as `{"null": reason}`
//! otherwise. Binary values are arrays of byte values, or strings taken as their UTF-8 bytes.

use anyhow::{Context, Result, anyhow, bail};
use serde_json::json;
use tessel_rle::{Value, ValueRef};
use tessel_tile::ValueType;

/// Converts one JSON value into a cell value of `value_type`.
pub fn to_cell(value_type: ValueType, json: &serde_json::Value) -> Result<Value> {
    if let Some(reason) = missing_reason(json)? {
        return Ok(Value::Null(reason));
    }

    macro_rules! integer {
        ($t:ty, $get:ident) => {{
            let v = json
                .$get()
                .ok_or_else(|| anyhow!("expected an integer, found {json}"))?;
            let v = <$t>::try_from(v)
                .with_context(|| format!("{v} is out of range for {}", stringify!($t)))?;
            Value::from(v)
        }};
    }

    let value = match value_type {
        ValueType::Bool => Value::Bool(
            json.as_bool()
                .ok_or_else(|| anyhow!("expected a boolean, found {json}"))?,
        ),
        ValueType::Int8 => integer!(i8, as_i64),
        ValueType::Int16 => integer!(i16, as_i64),
        ValueType::Int32 => integer!(i32, as_i64),
        ValueType::Int64 => integer!(i64, as_i64),
        ValueType::UInt8 => integer!(u8, as_u64),
        ValueType::UInt16 => integer!(u16, as_u64),
        ValueType::UInt32 => integer!(u32, as_u64),
        ValueType::UInt64 => integer!(u64, as_u64),
        ValueType::Float32 => Value::from(float(json)? as f32),
        ValueType::Float64 => Value::from(float(json)?),
        ValueType::String => Value::from(
            json.as_str()
                .ok_or_else(|| anyhow!("expected a string, found {json}"))?,
        ),
        ValueType::Binary => Value::from(binary(json)?),
    };
    Ok(value)
}

/// Converts a cell value of `value_type` into JSON.
pub fn from_cell(value_type: ValueType, value: ValueRef<'_>) -> Result<serde_json::Value> {
    let bytes = match value {
        ValueRef::Null(0) => return Ok(serde_json::Value::Null),
        ValueRef::Null(reason) => return Ok(json!({ "null": reason })),
        ValueRef::Bool(b) => return Ok(json!(b)),
        ValueRef::Bytes(bytes) => bytes,
    };

    macro_rules! scalar {
        ($t:ty) => {{
            let array = <[u8; size_of::<$t>()]>::try_from(bytes).map_err(|_| {
                anyhow!("{} bytes do not hold a {}", bytes.len(), stringify!($t))
            })?;
            json!(<$t>::from_le_bytes(array))
        }};
    }

    let json = match value_type {
        ValueType::Bool => bail!("boolean cell stored as bytes"),
        ValueType::Int8 => scalar!(i8),
        ValueType::Int16 => scalar!(i16),
        ValueType::Int32 => scalar!(i32),
        ValueType::Int64 => scalar!(i64),
        ValueType::UInt8 => scalar!(u8),
        ValueType::UInt16 => scalar!(u16),
        ValueType::UInt32 => scalar!(u32),
        ValueType::UInt64 => scalar!(u64),
        ValueType::Float32 => scalar!(f32),
        ValueType::Float64 => scalar!(f64),
        ValueType::String => json!(String::from_utf8_lossy(bytes)),
        ValueType::Binary => json!(bytes),
    };
    Ok(json)
}

fn missing_reason(json: &serde_json::Value) -> Result<Option<u32>> {
    match json {
        serde_json::Value::Null => Ok(Some(0)),
        serde_json::Value::Object(map) => {
            let reason = map
                .get("null")
                .and_then(|r| r.as_u64())
                .ok_or_else(|| anyhow!("expected {{\"null\": reason}}, found {json}"))?;
            let reason = u32::try_from(reason)
                .with_context(|| format!("missing reason {reason} is out of range"))?;
            Ok(Some(reason))
        }
        _ => Ok(None),
    }
}

fn float(json: &serde_json::Value) -> Result<f64> {
    json.as_f64()
        .ok_or_else(|| anyhow!("expected a number, found {json}"))
}

fn binary(json: &serde_json::Value) -> Result<Vec<u8>> {
    match json {
        serde_json::Value::String(s) => Ok(s.as_bytes().to_vec()),
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|b| u8::try_from(b).ok())
                    .ok_or_else(|| anyhow!("expected a byte value, found {item}"))
            })
            .collect(),
        _ => bail!("expected a byte array or a string, found {json}"),
    }
}
