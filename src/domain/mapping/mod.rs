//! Data translation between web payloads and backend calls.

pub mod engine;
pub mod error;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub use engine::{MappedCall, MappingEngine};
pub use error::MappingError;

/// Free-form JSON object.
pub type JsonMap = serde_json::Map<String, Value>;

/// Backend tables: table name -> ordered rows.
pub type TableMap = BTreeMap<String, Vec<JsonMap>>;

/// How a field value's length is counted against its configured `size`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizePolicy {
    /// Unicode scalar values.
    #[default]
    Chars,
    /// Bytes of the UTF-8 encoding.
    Utf8Bytes,
}

impl SizePolicy {
    pub fn measure(&self, text: &str) -> usize {
        match self {
            SizePolicy::Chars => text.chars().count(),
            SizePolicy::Utf8Bytes => text.len(),
        }
    }
}

impl FromStr for SizePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chars" | "characters" => Ok(SizePolicy::Chars),
            "utf8_bytes" | "bytes" => Ok(SizePolicy::Utf8Bytes),
            other => Err(format!("unknown size policy '{}', expected chars or utf8_bytes", other)),
        }
    }
}

impl fmt::Display for SizePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizePolicy::Chars => f.write_str("chars"),
            SizePolicy::Utf8Bytes => f.write_str("utf8_bytes"),
        }
    }
}
