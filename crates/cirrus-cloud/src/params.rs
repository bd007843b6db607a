//! Typed decoding of free-form parameter bags
//!
//! Some API payloads carry `key -> JSON` maps whose value shapes depend on
//! the key. A [`ParamSchema`] declares the expected shape per known key;
//! decoding fails closed when a known key has an unexpected representation.

use crate::error::{CloudError, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Expected representation of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Bool,
    Int,
    Str,
    StrList,
}

impl ParamKind {
    fn name(self) -> &'static str {
        match self {
            ParamKind::Bool => "a boolean",
            ParamKind::Int => "an integer",
            ParamKind::Str => "a string",
            ParamKind::StrList => "a list of strings",
        }
    }
}

/// A decoded parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Str(String),
    StrList(Vec<String>),
    /// Key not declared in the schema, kept verbatim
    Other(Value),
}

/// Per-key shape declarations
#[derive(Debug, Clone, Default)]
pub struct ParamSchema {
    kinds: BTreeMap<&'static str, ParamKind>,
}

impl ParamSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &'static str, kind: ParamKind) -> Self {
        self.kinds.insert(key, kind);
        self
    }

    pub fn kind(&self, key: &str) -> Option<ParamKind> {
        self.kinds.get(key).copied()
    }

    /// Decode a raw bag. `null` values are treated as absent.
    pub fn decode(&self, raw: &Map<String, Value>) -> Result<ParamBag> {
        let mut values = BTreeMap::new();

        for (key, value) in raw {
            if value.is_null() {
                continue;
            }

            let decoded = match self.kind(key) {
                Some(kind) => decode_value(key, kind, value)?,
                None => {
                    tracing::debug!("Keeping undeclared parameter `{}` as raw JSON", key);
                    ParamValue::Other(value.clone())
                }
            };
            values.insert(key.clone(), decoded);
        }

        Ok(ParamBag { values })
    }
}

fn decode_value(key: &str, kind: ParamKind, value: &Value) -> Result<ParamValue> {
    let decoded = match (kind, value) {
        (ParamKind::Bool, Value::Bool(b)) => Some(ParamValue::Bool(*b)),
        (ParamKind::Int, Value::Number(n)) => n.as_i64().map(ParamValue::Int),
        (ParamKind::Str, Value::String(s)) => Some(ParamValue::Str(s.clone())),
        (ParamKind::StrList, Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .map(ParamValue::StrList),
        _ => None,
    };

    decoded.ok_or_else(|| CloudError::InvalidParameter {
        key: key.to_string(),
        expected: kind.name(),
        found: describe(value),
    })
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {}", b),
        Value::Number(n) => format!("number {}", n),
        Value::String(s) => format!("string {:?}", s),
        Value::Array(_) => "an array".to_string(),
        Value::Object(_) => "an object".to_string(),
    }
}

/// Decoded parameters with typed accessors
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamBag {
    values: BTreeMap<String, ParamValue>,
}

impl ParamBag {
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key) {
            Some(ParamValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        match self.values.get(key) {
            Some(ParamValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(ParamValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn str_list(&self, key: &str) -> Option<&[String]> {
        match self.values.get(key) {
            Some(ParamValue::StrList(items)) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
