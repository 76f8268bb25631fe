//! Typed configuration values and records.
//!
//! A [`Value`] is a closed scalar union. Conversion from untyped JSON happens
//! only through [`Value::from_json`], which the loader and the wire decoder
//! use. Nothing inside the crate coerces one variant into another.

use crate::types::{Error, Result};
use serde::Serialize;
use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

/// A single configuration entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
    String(String),
}

impl Value {
    /// Type a JSON value by its shape.
    ///
    /// Integral numbers that fit in i64 become `Integer`, other numbers
    /// become `Float`, strings become `String`. Everything else (bool, null,
    /// arrays, objects, integers beyond i64) is not a configuration value.
    pub fn from_json(raw: &serde_json::Value) -> Option<Self> {
        match raw {
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Value::Integer(i))
                } else if n.is_f64() {
                    n.as_f64().map(Value::Float)
                } else {
                    None
                }
            }
            serde_json::Value::String(s) => Some(Value::String(s.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Value::from(*f),
            Value::String(s) => serde_json::Value::from(s.as_str()),
        }
    }

    /// Short name of the active variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
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

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// Mapping from key to [`Value`] with a key set fixed at construction.
///
/// There is no insert operation: [`ConfigRecord::replace`] only rebinds keys
/// that already exist.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct ConfigRecord(BTreeMap<String, Value>);

impl ConfigRecord {
    /// Build a record from a JSON object, dropping non-scalar entries.
    ///
    /// Returns the record plus the keys that were dropped. A non-object
    /// document is a parse error.
    pub fn from_json_lossy(raw: &serde_json::Value) -> Result<(Self, Vec<String>)> {
        let object = raw.as_object().ok_or_else(|| {
            Error::config_parse(format!(
                "expected a JSON object at top level, found {}",
                json_kind(raw)
            ))
        })?;

        let mut entries = BTreeMap::new();
        let mut skipped = Vec::new();
        for (key, raw_value) in object {
            match Value::from_json(raw_value) {
                Some(value) => {
                    entries.insert(key.clone(), value);
                }
                None => skipped.push(key.clone()),
            }
        }
        Ok((Self(entries), skipped))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Rebind an existing key. Absent keys fail with `KeyNotFound` and leave
    /// the record untouched.
    pub fn replace(&mut self, key: &str, value: Value) -> Result<Value> {
        match self.0.get_mut(key) {
            Some(slot) => Ok(std::mem::replace(slot, value)),
            None => Err(Error::key_not_found(key)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ConfigRecord {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl<'a> IntoIterator for &'a ConfigRecord {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn json_kind(raw: &serde_json::Value) -> &'static str {
    match raw {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
