//! Verbatim UTF-8 text codec
//!
//! Also the fixed codec for keys.

use crate::error::{ArchiveError, Result};

use super::Value;

/// Encode a string as UTF-8
pub fn encode_str(s: &str) -> Vec<u8> {
    s.as_bytes().to_vec()
}

/// Decode UTF-8 bytes into a string
pub fn decode_str(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| ArchiveError::Codec(format!("invalid UTF-8 text: {}", e)))
}

/// Strings pass through, anything else is stringified first
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    Ok(match value {
        Value::String(s) => encode_str(s),
        other => other.to_string().into_bytes(),
    })
}

pub fn decode(bytes: &[u8]) -> Result<Value> {
    decode_str(bytes).map(Value::String)
}
