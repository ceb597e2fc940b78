//! JSON value codec (the default)

use chrono::SecondsFormat;

use crate::error::{ArchiveError, Result};

use super::Value;

/// 2^53 - 1, the largest integer an f64 holds exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Serialize a value to JSON text
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    let json = to_json(value)?.ok_or_else(|| {
        ArchiveError::Codec("undefined has no JSON representation".to_string())
    })?;
    Ok(serde_json::to_vec(&json)?)
}

/// Parse JSON text into a value
pub fn decode(bytes: &[u8]) -> Result<Value> {
    let json: serde_json::Value = serde_json::from_slice(bytes)?;
    Ok(Value::from(json))
}

/// Convert to a JSON tree. `Ok(None)` means "omit" (undefined).
fn to_json(value: &Value) -> Result<Option<serde_json::Value>> {
    let json = match value {
        Value::Undefined => return Ok(None),
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        // integral values print without a fraction, like JSON.stringify
        Value::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
            serde_json::Value::from(*n as i64)
        }
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .ok_or_else(|| {
                ArchiveError::Codec(format!("non-finite number {} is not valid JSON", n))
            })?,
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Date(d) => {
            serde_json::Value::String(d.to_rfc3339_opts(SecondsFormat::Millis, true))
        }
        Value::Bytes(bytes) => serde_json::Value::Array(
            bytes.iter().map(|b| serde_json::Value::from(*b)).collect(),
        ),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(to_json(item)?.unwrap_or(serde_json::Value::Null));
            }
            serde_json::Value::Array(out)
        }
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                if let Some(json) = to_json(v)? {
                    out.insert(k.clone(), json);
                }
            }
            serde_json::Value::Object(out)
        }
    };
    Ok(Some(json))
}
