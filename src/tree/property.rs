//! Named, typed property values.

use std::fmt;

use serde::Serialize;

use crate::binary::{TYPE_FLOAT, TYPE_INT, TYPE_STRING};
use crate::util::slice_bits_eq;

/// Typed value array of a property.
///
/// The format has exactly three value kinds. Strings are always single
/// values; the format cannot express string arrays.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Int(Vec<i32>),
    Float(Vec<f32>),
    Str(String),
}

impl PropertyValue {
    /// One-byte type tag used on the wire.
    pub fn type_tag(&self) -> u8 {
        match self {
            Self::Int(_) => TYPE_INT,
            Self::Float(_) => TYPE_FLOAT,
            Self::Str(_) => TYPE_STRING,
        }
    }

    /// Short type name used by the text projection.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
        }
    }

    /// Number of values (1 for strings).
    pub fn len(&self) -> usize {
        match self {
            Self::Int(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Str(_) => 1,
        }
    }

    /// Check if a numeric array is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_ints(&self) -> Option<&[i32]> {
        match self {
            Self::Int(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f32]> {
        match self {
            Self::Float(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// First integer, the common shape of scalar int properties.
    pub fn first_int(&self) -> Option<i32> {
        self.as_ints().and_then(|v| v.first().copied())
    }

    /// First float, the common shape of scalar float properties.
    pub fn first_float(&self) -> Option<f32> {
        self.as_floats().and_then(|v| v.first().copied())
    }
}

// Floats compare by bit pattern so NaN payloads survive round-trip checks.
impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => slice_bits_eq(a, b),
            (Self::Str(a), Self::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{:?}", v),
            Self::Float(v) => write!(f, "{:?}", v),
            Self::Str(s) => write!(f, "[{:?}]", s),
        }
    }
}

impl From<Vec<i32>> for PropertyValue {
    fn from(v: Vec<i32>) -> Self {
        Self::Int(v)
    }
}

impl From<Vec<f32>> for PropertyValue {
    fn from(v: Vec<f32>) -> Self {
        Self::Float(v)
    }
}

impl From<&[i32]> for PropertyValue {
    fn from(v: &[i32]) -> Self {
        Self::Int(v.to_vec())
    }
}

impl From<&[f32]> for PropertyValue {
    fn from(v: &[f32]) -> Self {
        Self::Float(v.to_vec())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

/// A named property attached to exactly one node.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Property {
    pub name: String,
    pub value: PropertyValue,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}
