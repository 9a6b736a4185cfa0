//! Metadata attached to cells.

use arcstr::ArcStr;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InfoValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(ArcStr),
}

/// Ordered `key -> value` metadata, such as a device model name or a computed capacitance.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Info(IndexMap<ArcStr, InfoValue>);

impl Info {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<ArcStr>, value: impl Into<InfoValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&InfoValue> {
        self.0.get(key)
    }

    /// Gets a numeric value as a float.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            InfoValue::Float(x) => Some(*x),
            InfoValue::Int(x) => Some(*x as f64),
            _ => None,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&ArcStr> {
        match self.get(key)? {
            InfoValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ArcStr, &InfoValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<bool> for InfoValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for InfoValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<usize> for InfoValue {
    fn from(value: usize) -> Self {
        Self::Int(value as i64)
    }
}

impl From<f64> for InfoValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for InfoValue {
    fn from(value: &str) -> Self {
        Self::Str(value.into())
    }
}

impl From<String> for InfoValue {
    fn from(value: String) -> Self {
        Self::Str(value.into())
    }
}

impl From<ArcStr> for InfoValue {
    fn from(value: ArcStr) -> Self {
        Self::Str(value)
    }
}

impl std::fmt::Display for InfoValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(x) => write!(f, "{x}"),
            Self::Int(x) => write!(f, "{x}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(x) => write!(f, "{x}"),
        }
    }
}
