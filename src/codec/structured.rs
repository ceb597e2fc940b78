//! Structured binary codec
//!
//! bincode over the full `Value` tree. Unlike JSON this preserves undefined,
//! non-finite numbers, dates and byte arrays.

use crate::error::Result;

use super::Value;

pub fn encode(value: &Value) -> Result<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

pub fn decode(bytes: &[u8]) -> Result<Value> {
    Ok(bincode::deserialize(bytes)?)
}
