//! Catalog records
//!
//! A record is whatever the backend returned for one song, singer, category,
//! tag or user: an untyped bag of JSON fields. Nothing here validates fields
//! or derives new ones; accessors only coerce on read.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One backend entity, treated as an opaque field map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap a JSON value; `None` unless it is an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Record id, read from `id` as a number or numeric string
    pub fn id(&self) -> Option<i64> {
        self.get_i64("id")
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Field as display text; numbers and booleans are stringified
    pub fn get_str(&self, field: &str) -> Option<String> {
        match self.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Field coerced to an integer
    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(coerce_i64)
    }

    /// Field read as a list of ids: a JSON array of ids or a comma-separated string
    pub fn get_id_list(&self, field: &str) -> Option<Vec<i64>> {
        match self.get(field)? {
            Value::Array(items) => Some(items.iter().filter_map(coerce_i64).collect()),
            Value::String(s) => Some(
                s.split(',')
                    .filter_map(|part| part.trim().parse::<i64>().ok())
                    .collect(),
            ),
            other => coerce_i64(other).map(|id| vec![id]),
        }
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Coerce a JSON scalar to an integer: numbers (integral floats included),
/// numeric strings, and booleans as 0/1
pub fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}
