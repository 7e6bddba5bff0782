//! Helpers for wire values whose shape is not fixed.
//!
//! The storage-management API accepts, and echoes back, several statement
//! fields either as a bare string or as an array of strings. Decoding always
//! goes through [`StringShape::classify`], which tags the value before it is
//! flattened into a canonical ordered list. Collapsing back into the compact
//! form only happens where the wire contract asks for it.

use std::collections::HashMap;
use std::hash::Hash;

use serde_json::Value;
use thiserror::Error;

/// A wire value did not have any of the shapes accepted at its position
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("expected {expected}, found {found}")]
pub struct ShapeError {
    /// Human readable description of the accepted shapes
    pub expected: &'static str,
    /// Human readable description of the value that was found
    pub found: String,
}

impl ShapeError {
    /// Describe a mismatch between `expected` and the shape of `value`
    pub fn new(expected: &'static str, value: &Value) -> Self {
        Self {
            expected,
            found: describe(value).to_string(),
        }
    }
}

/// A short, human readable name for the JSON type of `value`
pub fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// The tagged form of a field that may be absent, a bare string, or an array
/// of strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringShape {
    /// The field was omitted or explicitly `null`
    Absent,
    /// The field was a bare string
    One(String),
    /// The field was an array of strings
    Many(Vec<String>),
}

impl StringShape {
    /// Tag a raw wire value. Objects, booleans, numbers and arrays containing
    /// anything other than strings are rejected.
    pub fn classify(value: Option<Value>) -> Result<Self, ShapeError> {
        match value {
            None | Some(Value::Null) => Ok(StringShape::Absent),
            Some(Value::String(single)) => Ok(StringShape::One(single)),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(item) => Ok(item),
                    other => Err(ShapeError::new("an array of strings", &other)),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(StringShape::Many),
            Some(other) => Err(ShapeError::new("a string or an array of strings", &other)),
        }
    }

    /// Flatten into the canonical ordered list
    pub fn into_list(self) -> Vec<String> {
        match self {
            StringShape::Absent => Vec::new(),
            StringShape::One(single) => vec![single],
            StringShape::Many(items) => items,
        }
    }

    /// The compact form of `items`: a wildcard for none, a bare string for
    /// exactly one, an array otherwise
    pub fn collapse(items: &[String]) -> Self {
        match items {
            [] => StringShape::One(WILDCARD.to_string()),
            [single] => StringShape::One(single.clone()),
            many => StringShape::Many(many.to_vec()),
        }
    }
}

impl From<StringShape> for Value {
    fn from(shape: StringShape) -> Self {
        match shape {
            StringShape::Absent => Value::Null,
            StringShape::One(single) => Value::String(single),
            StringShape::Many(items) => {
                Value::Array(items.into_iter().map(Value::String).collect())
            }
        }
    }
}

/// The wildcard that stands for "everything" wherever identifiers are
/// collapsed
pub const WILDCARD: &str = "*";

/// Decode a field that may be a bare string or an array of strings into the
/// canonical ordered list. An absent field yields an empty list.
pub fn string_list(value: Option<Value>) -> Result<Vec<String>, ShapeError> {
    StringShape::classify(value).map(StringShape::into_list)
}

/// Decode a field that must be a string when present
pub fn optional_string(value: Option<Value>) -> Result<Option<String>, ShapeError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(other) => Err(ShapeError::new("a string", &other)),
    }
}

/// Checks whether two slices contain the same elements, regardless of order.
/// Duplicates count: `[a, a, b]` and `[a, b, b]` are not equal.
pub fn equal_elements<T>(left: &[T], right: &[T]) -> bool
where
    T: Eq + Hash,
{
    if left.len() != right.len() {
        return false;
    }

    let mut counts: HashMap<&T, usize> = HashMap::with_capacity(left.len());
    for item in left {
        *counts.entry(item).or_default() += 1;
    }

    for item in right {
        match counts.get_mut(item) {
            Some(count) if *count > 0 => *count -= 1,
            _ => return false,
        }
    }

    true
}
