// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed telemetry records.
//!
//! A [`Record`] is an ordered list of `field -> Value` pairs produced by the
//! parser, plus the capture timestamp injected by the front door. Records are
//! converted into JSON [`Document`]s right before they are handed to a store.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number};
use std::fmt;

/// JSON object handed to a document store.
pub type Document = Map<String, serde_json::Value>;

/// Field reserved for the store-assigned identity.
pub const ID_FIELD: &str = "_id";

/// Field holding the capture timestamp.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// A scalar field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit floating point (always finite).
    Float(f64),
    /// UTF-8 text, trimmed.
    Text(String),
}

impl Value {
    /// Convert to a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Integer(v) => serde_json::Value::from(*v),
            Value::Float(v) => Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(v) => serde_json::Value::String(v.clone()),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{:?}", v),
        }
    }
}

/// A parsed telemetry record.
///
/// Field order follows first insertion; inserting an existing key replaces
/// its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
    timestamp: Option<DateTime<Utc>>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    /// Remove a field, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let pos = self.fields.iter().position(|(k, _)| k == key)?;
        Some(self.fields.remove(pos).1)
    }

    /// Get a field value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterate over fields in order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of parsed fields (the injected timestamp is not counted).
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if the record has no parsed fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Capture timestamp, if stamped.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// Stamp the record with its capture time.
    ///
    /// A publisher-supplied `timestamp` field is discarded; the capture time
    /// always wins.
    pub fn stamp(&mut self, at: DateTime<Utc>) {
        self.remove(TIMESTAMP_FIELD);
        self.timestamp = Some(at);
    }

    /// Convert into the document form handed to a store.
    pub fn into_document(self) -> Document {
        let mut doc = Map::with_capacity(self.fields.len() + 1);
        for (key, value) in self.fields {
            doc.insert(key, value.to_json());
        }
        if let Some(ts) = self.timestamp {
            doc.insert(
                TIMESTAMP_FIELD.to_string(),
                serde_json::Value::String(ts.to_rfc3339_opts(SecondsFormat::Micros, true)),
            );
        }
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_insert_replaces_in_place() {
        let mut rec = Record::new();
        rec.insert("a", Value::Integer(1));
        rec.insert("b", Value::Integer(2));
        rec.insert("a", Value::Text("x".to_string()));

        let keys: Vec<_> = rec.fields().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(rec.get("a"), Some(&Value::Text("x".to_string())));
    }

    #[test]
    fn test_stamp_overrides_publisher_timestamp() {
        let mut rec = Record::new();
        rec.insert("timestamp", Value::Integer(5));
        rec.insert("temp", Value::Float(21.5));

        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        rec.stamp(at);

        assert!(!rec.contains_key("timestamp"));
        let doc = rec.into_document();
        assert_eq!(doc["temp"], serde_json::json!(21.5));
        assert_eq!(doc["timestamp"], serde_json::json!("2026-01-02T03:04:05.000000Z"));
    }

    #[test]
    fn test_document_preserves_field_order() {
        let mut rec = Record::new();
        rec.insert("z", Value::Integer(1));
        rec.insert("a", Value::Text("hi".to_string()));

        let doc = rec.into_document();
        let keys: Vec<_> = doc.keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a"]);
    }
}
