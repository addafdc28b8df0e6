//! JSON-like values compared by [`state_changed`](crate::state_changed).

use std::collections::BTreeMap;

use parse_display::Display;
use serde::{Deserialize, Serialize};

#[cfg(test)]
mod tests;

/// String-keyed record of values. Keys are ordered, so iteration and serialization are deterministic.
pub type Record = BTreeMap<String, Value>;

/// A primitive, a sequence or a record.
///
/// Values are owned trees, so cyclic structures cannot be expressed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Sequence(Vec<Value>),
    Record(Record),
}

/// The variant of a [`Value`], without its contents.
#[derive(Debug, Clone, Copy, Display, PartialEq, Eq, Hash)]
#[display(style = "snake_case")]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    Sequence,
    Record,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Sequence(_) => ValueKind::Sequence,
            Value::Record(_) => ValueKind::Record,
        }
    }
    pub fn is_primitive(&self) -> bool {
        !matches!(self, Value::Sequence(_) | Value::Record(_))
    }
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}
impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}
impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value.into())
    }
}
impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Number(value.into())
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
impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Sequence(value)
    }
}
impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Record(value)
    }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Sequence(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Record(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Number(n) => serde_json::Number::from_f64(n)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::String(s) => serde_json::Value::String(s),
            Value::Sequence(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Record(record) => serde_json::Value::Object(
                record.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

/// Converts a JSON object into a [`Record`].
///
/// Returns `None` if `value` is not an object.
pub fn record_from_json(value: serde_json::Value) -> Option<Record> {
    match Value::from(value) {
        Value::Record(r) => Some(r),
        _ => None,
    }
}
