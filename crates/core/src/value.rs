//! Document value types
//!
//! This module defines:
//! - Value: scalar/array/object values as stored by the document engine
//! - Document: the wire form of one stored record (an object at top level)
//!
//! The canonical text encoding of a document is JSON. Object fields use a
//! `BTreeMap` so the encoded form is deterministic.

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Map of field name to value inside a document or nested object
pub type Fields = BTreeMap<String, Value>;

/// A document value: a scalar, an array of values, or a nested object
///
/// Different types are never equal (`Int(1) != Float(1.0)`); float equality
/// follows IEEE-754 (`NaN != NaN`, `-0.0 == 0.0`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point (IEEE-754)
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Array of values
    Array(Vec<Value>),
    /// Object with string keys
    Object(Fields),
}

impl Value {
    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Array(_) => "Array",
            Value::Object(_) => "Object",
        }
    }

    /// Get as &str if this is a String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as &[Value] if this is an Array value
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get as a mutable array if this is an Array value
    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get as the field map if this is an Object value
    pub fn as_object(&self) -> Option<&Fields> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Get as a mutable field map if this is an Object value
    pub fn as_object_mut(&mut self) -> Option<&mut Fields> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Check if this is an Object value
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Check if this is an Array value
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
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

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => {
                Value::Array(arr.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(obj) => {
                Value::Object(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::Number(i.into()),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::Array(arr) => {
                serde_json::Value::Array(arr.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Object(obj) => serde_json::Value::Object(
                obj.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

/// The reserved identifier field the engine attaches to stored documents
pub const ID_FIELD: &str = "_id";

/// One stored record: an object mapping field names to values
///
/// A document's top-level key is the top-level step's field name
/// (`module:name`); the engine additionally attaches an `_id` field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Fields);

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Document(Fields::new())
    }

    /// Number of fields, including `_id` if present
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether the document has no fields
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of user fields (excluding `_id`)
    pub fn user_field_count(&self) -> usize {
        self.0.keys().filter(|k| *k != ID_FIELD).count()
    }

    /// Get a field value
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Insert a field value, returning the previous value if any
    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// Remove a field
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Iterate over fields in order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// The single user field of this document, excluding `_id`
    ///
    /// Errors when the document does not carry exactly one user field.
    pub fn single_user_field(&self) -> Result<(&str, &Value)> {
        let mut fields = self.0.iter().filter(|(k, _)| k.as_str() != ID_FIELD);
        let first = fields.next();
        match (first, fields.next()) {
            (Some((k, v)), None) => Ok((k.as_str(), v)),
            _ => Err(StoreError::Codec(format!(
                "expected a single user field, document has {}",
                self.user_field_count()
            ))),
        }
    }

    /// Resolve a dotted field path through nested objects
    ///
    /// Returns `None` when any segment is missing or a non-object value is
    /// reached before the last segment.
    pub fn get_path(&self, field_path: &str) -> Option<&Value> {
        let mut segments = field_path.split('.');
        let first = segments.next()?;
        let mut current = self.0.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// View the document as a plain value
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Build a document from an object value
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Document(fields)),
            other => Err(StoreError::Codec(format!(
                "expected an object document, found {}",
                other.type_name()
            ))),
        }
    }

    /// Parse a document from its canonical JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        let json: serde_json::Value = serde_json::from_str(text)?;
        Document::from_value(json.into())
    }

    /// Render the document as canonical JSON text
    pub fn to_json_string(&self) -> Result<String> {
        let json: serde_json::Value = self.to_value().into();
        Ok(serde_json::to_string(&json)?)
    }

    /// Consume the document, returning the field map
    pub fn into_fields(self) -> Fields {
        self.0
    }

    /// Borrow the field map
    pub fn fields(&self) -> &Fields {
        &self.0
    }

    /// Mutably borrow the field map
    pub fn fields_mut(&mut self) -> &mut Fields {
        &mut self.0
    }
}

impl From<Fields> for Document {
    fn from(fields: Fields) -> Self {
        Document(fields)
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Document(iter.into_iter().collect())
    }
}
