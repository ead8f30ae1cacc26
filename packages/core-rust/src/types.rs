//! Wire-level value types shared by every view.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the identifier field the engine assigns to every document and file.
pub const ID_FIELD: &str = "_id";

/// A free-form document: string keys mapped to dynamic values.
///
/// Uses `BTreeMap` so that serialization and key iteration are deterministic.
pub type Document = BTreeMap<String, Value>;

/// Generic runtime value for document fields.
///
/// Mirrors the JSON data model. Serialized untagged so that a `Value`
/// round-trips through the engine's JSON bodies without a wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// JSON null.
    Null,
    /// JSON boolean.
    Bool(bool),
    /// JSON integer (signed 64-bit).
    Int(i64),
    /// JSON floating-point (64-bit IEEE 754).
    Float(f64),
    /// JSON string (UTF-8).
    String(String),
    /// JSON array (ordered sequence of values).
    Array(Vec<Value>),
    /// JSON object (nested document).
    Map(Document),
}

impl Value {
    /// Returns the string slice if this value is a `String`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as an unsigned integer when it is a non-negative number.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Int(n) => u64::try_from(*n).ok(),
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Value::Float(f) if *f >= 0.0 && f.fract() == 0.0 => Some(*f as u64),
            _ => None,
        }
    }

    /// Whether the value is a nested array or map.
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Map(_))
    }

    /// Renders the value as a single table cell of at most `max_chars` characters.
    ///
    /// Strings render bare, scalars use their JSON spelling, and nested
    /// containers are stringified as compact JSON. Anything longer than the
    /// limit is cut and suffixed with `...`.
    #[must_use]
    pub fn to_cell(&self, max_chars: usize) -> String {
        let full = match self {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        truncate_chars(&full, max_chars)
    }

    /// Renders an identifier value as the string the engine's paths expect.
    ///
    /// The engine stringifies `ObjectId`s, but extended-JSON `{"$oid": ..}`
    /// objects are unwrapped as well.
    #[must_use]
    pub fn to_id_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Map(map) => match map.get("$oid") {
                Some(Value::String(oid)) => oid.clone(),
                _ => self.to_string(),
            },
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(text) => f.write_str(&text),
            Err(_) => Err(fmt::Error),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::from(i),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::String(s) => serde_json::Value::String(s),
            Value::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Map(map) => {
                serde_json::Value::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

/// Returns the document's identifier rendered as a path-ready string.
#[must_use]
pub fn document_id(doc: &Document) -> Option<String> {
    doc.get(ID_FIELD).map(Value::to_id_string)
}

/// Cuts `text` to at most `max_chars` characters, marking the cut with `...`.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}
