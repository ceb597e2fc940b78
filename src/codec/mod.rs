//! Codec Module
//!
//! Converts values to and from the bytes stored in value frames.
//!
//! ## Variants
//! - `Text`: verbatim UTF-8, non-strings are stringified
//! - `Json`: JSON text (default)
//! - `Structured`: bincode over the full value model
//!
//! Keys never go through a configurable codec: they are always UTF-8 text
//! (see [`encode_key`] / [`decode_key`]).

mod json;
mod structured;
mod text;
mod value;

pub use value::Value;

use std::fmt;
use std::str::FromStr;

use crate::error::{ArchiveError, Result};

/// Value codec, selected when the archive is constructed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Codec {
    Text,
    #[default]
    Json,
    Structured,
}

impl Codec {
    /// Encode a value to bytes
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        match self {
            Codec::Text => text::encode(value),
            Codec::Json => json::encode(value),
            Codec::Structured => structured::encode(value),
        }
    }

    /// Decode bytes produced by `encode`
    pub fn decode(&self, bytes: &[u8]) -> Result<Value> {
        match self {
            Codec::Text => text::decode(bytes),
            Codec::Json => json::decode(bytes),
            Codec::Structured => structured::decode(bytes),
        }
    }

    /// Short name, as accepted by `FromStr`
    pub fn name(&self) -> &'static str {
        match self {
            Codec::Text => "utf-8",
            Codec::Json => "json",
            Codec::Structured => "structured",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Codec {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "utf-8" | "utf8" => Ok(Codec::Text),
            "json" => Ok(Codec::Json),
            "structured" | "bincode" => Ok(Codec::Structured),
            other => Err(ArchiveError::Config(format!("unknown codec '{}'", other))),
        }
    }
}

/// Encode a key with the fixed text codec
pub fn encode_key(key: &str) -> Vec<u8> {
    text::encode_str(key)
}

/// Decode a key with the fixed text codec
pub fn decode_key(bytes: &[u8]) -> Result<String> {
    text::decode_str(bytes)
}
