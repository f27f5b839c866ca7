//! Accumulating per-element field record

use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Ordered multi-valued field map.
///
/// Clones share storage until one side is mutated, so the document base
/// record can be handed to every element cheaply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRecord {
    fields: Arc<IndexMap<String, Vec<String>>>,
}

impl FieldRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to `key`
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        Arc::make_mut(&mut self.fields)
            .entry(key.into())
            .or_default()
            .push(value.into());
    }

    /// Replace all values of `key`
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        Arc::make_mut(&mut self.fields).insert(key.into(), vec![value.into()]);
    }

    /// Record `value` unless `key` already has one. Returns whether it was added.
    pub fn add_if_absent(&mut self, key: &str, value: &str) -> bool {
        if self.contains(key) {
            return false;
        }
        self.set(key, value);
        true
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        if !self.contains(key) {
            return None;
        }
        Arc::make_mut(&mut self.fields).shift_remove(key)
    }

    pub fn get(&self, key: &str) -> &[String] {
        self.fields.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).first().map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Approximate bytes this record adds to an index batch
    pub fn estimated_size(&self) -> usize {
        self.fields
            .iter()
            .map(|(k, values)| values.iter().map(|v| k.len() + v.len()).sum::<usize>())
            .sum()
    }

    /// JSON object; single values become strings, multi values arrays
    pub fn to_json(&self) -> Value {
        let mut map = Map::with_capacity(self.fields.len());
        for (key, values) in self.fields.iter() {
            let value = match values.as_slice() {
                [single] => Value::String(single.clone()),
                many => Value::Array(many.iter().cloned().map(Value::String).collect()),
            };
            map.insert(key.clone(), value);
        }
        Value::Object(map)
    }

    pub fn from_json(value: &Value) -> Self {
        let mut record = Self::new();
        if let Value::Object(map) = value {
            for (key, value) in map {
                match value {
                    Value::Array(values) => {
                        for v in values {
                            record.add(key.clone(), json_text(v));
                        }
                    }
                    other => record.add(key.clone(), json_text(other)),
                }
            }
        }
        record
    }
}

fn json_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (k, v) in iter {
            record.add(k, v);
        }
        record
    }
}
