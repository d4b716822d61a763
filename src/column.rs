/// Column Module
///
/// A `Column` binds a name, a `DbType` descriptor, a current value and an
/// optional default to a schema slot. Values are dynamic (`Value`): the
/// column performs no validation against its declared type at mutation
/// time. Type correctness is enforced only at render time by the statement
/// builder's dispatch.
use chrono::{DateTime, Utc};
use std::fmt;

use crate::types::{DbType, DEFAULT_DATETIME_FORMAT};

/// A dynamic value held by a column or appearing inside an array literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Textual value
    Strand(String),
    /// Raw byte payload
    Bytes(Vec<u8>),
    Datetime(DateTime<Utc>),
    Array(Vec<Value>),
    /// String-keyed mapping, kept as JSON for literal rendering
    Object(serde_json::Value),
    /// A record reference: the referenced table's qualified name
    Thing(String),
}

impl Value {
    /// The "absent or empty" test used by the literal-rendering rules:
    /// true for `Null` and for an empty `Strand`.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Strand(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Converts a JSON response field into a `Value`. Numbers become `Int`
    /// when integral, `Float` otherwise; objects stay as JSON.
    pub fn from_json(value: &serde_json::Value) -> Value {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(0.0)),
            },
            serde_json::Value::String(s) => Value::Strand(s.clone()),
            serde_json::Value::Array(items) => {
                Value::Array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(_) => Value::Object(value.clone()),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Strand(s) => Some(s),
            Value::Thing(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }
}

/// Unquoted text conversion, used for numeric literals and as the fallback
/// rendering inside array literals.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "None"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Strand(s) => write!(f, "{}", s),
            Value::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
            Value::Datetime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%SZ")),
            Value::Array(items) => {
                let rendered: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", rendered.join(","))
            }
            Value::Object(obj) => {
                write!(f, "{}", serde_json::to_string(obj).unwrap_or_else(|_| "null".to_string()))
            }
            Value::Thing(t) => write!(f, "{}", t),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Strand(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Strand(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Datetime(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

/// A named, typed value slot on a record.
///
/// Declared once as part of a `Schema`; each spawned record instance holds
/// its own independent copy with a mutable `value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub ty: DbType,
    pub value: Value,
    pub default: Option<Value>,
    pub datetime_format: String,
}

impl Column {
    pub fn new(name: &str, ty: DbType) -> Self {
        Column {
            name: name.to_string(),
            ty,
            value: Value::Null,
            default: None,
            datetime_format: DEFAULT_DATETIME_FORMAT.to_string(),
        }
    }

    /// Sets the default value, applied to spawned record instances and
    /// rendered into `DEFINE FIELD ... DEFAULT`.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_datetime_format(mut self, format: &str) -> Self {
        self.datetime_format = format.to_string();
        self
    }

    pub fn set_value(&mut self, value: impl Into<Value>) -> &mut Self {
        self.value = value.into();
        self
    }

    /// Returns the current value. With `datetime_as_str` set, a Datetime
    /// value is coerced to its formatted string representation.
    pub fn get_value(&self, datetime_as_str: bool) -> Value {
        if datetime_as_str {
            if let Value::Datetime(dt) = &self.value {
                return Value::Strand(dt.format(&self.datetime_format).to_string());
            }
        }
        self.value.clone()
    }

    /// Appends to an array-valued column, lazily initializing the backing
    /// sequence to a singleton when the current value is not a sequence.
    pub fn append_value(&mut self, value: impl Into<Value>) -> &[Value] {
        let value = value.into();
        match &mut self.value {
            Value::Array(items) => items.push(value),
            _ => self.value = Value::Array(vec![value]),
        }
        match &self.value {
            Value::Array(items) => items,
            _ => unreachable!(),
        }
    }

    /// Removes the first occurrence of `value` from an array-valued column.
    /// On an empty or absent sequence this is a no-op that leaves an empty
    /// sequence in place.
    pub fn remove_value(&mut self, value: &Value) -> &[Value] {
        match &mut self.value {
            Value::Array(items) => {
                if let Some(pos) = items.iter().position(|v| v == value) {
                    items.remove(pos);
                }
            }
            _ => self.value = Value::Array(Vec::new()),
        }
        match &self.value {
            Value::Array(items) => items,
            _ => unreachable!(),
        }
    }
}

/// Renders the current value as unquoted text, so a column can be embedded
/// directly into a WHERE predicate.
impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get_value(false))
    }
}
