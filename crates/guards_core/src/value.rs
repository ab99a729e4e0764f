//! Runtime values handed to enforcement.
//!
//! Boxed values share the representation of their primitive: a boxed
//! `Integer` holding 5 is `Value::Int32(5)`, an absent one is `Value::Null`.

use crate::PrimitiveType;
use chrono::{DateTime, Utc};
use std::fmt;

/// A value observed at a guarded boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value
    Null,
    /// Boolean value
    Bool(bool),
    /// 8-bit integer value
    Int8(i8),
    /// 16-bit integer value
    Int16(i16),
    /// Character value
    Char(char),
    /// 32-bit integer value
    Int32(i32),
    /// 64-bit integer value
    Int64(i64),
    /// 32-bit float value
    Float32(f32),
    /// 64-bit float value
    Float64(f64),
    /// String value
    Str(String),
    /// List value
    List(Vec<Value>),
    /// Point in time
    Instant(DateTime<Utc>),
    /// Any other object, carried by its type name and display form
    Object {
        /// Nominal type name
        type_name: String,
        /// Display form used in violation messages
        repr: String,
    },
}

impl Value {
    /// Returns true if this value is absent.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the type name of this value.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Str(_) => "String",
            Value::List(_) => "List",
            Value::Instant(_) => "Instant",
            Value::Object { type_name, .. } => type_name,
            other => other
                .primitive_type()
                .map(PrimitiveType::name)
                .unwrap_or("unknown"),
        }
    }

    /// Returns the primitive type of this value, if it is primitive.
    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        match self {
            Value::Bool(_) => Some(PrimitiveType::Bool),
            Value::Int8(_) => Some(PrimitiveType::Int8),
            Value::Int16(_) => Some(PrimitiveType::Int16),
            Value::Char(_) => Some(PrimitiveType::Char),
            Value::Int32(_) => Some(PrimitiveType::Int32),
            Value::Int64(_) => Some(PrimitiveType::Int64),
            Value::Float32(_) => Some(PrimitiveType::Float32),
            Value::Float64(_) => Some(PrimitiveType::Float64),
            _ => None,
        }
    }

    /// Attempts to get this value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to get this value as an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int8(v) => Some(i64::from(*v)),
            Value::Int16(v) => Some(i64::from(*v)),
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Attempts to get this value as a float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float32(v) => Some(f64::from(*v)),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Attempts to get this value as a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to get this value as a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Attempts to get this value as a point in time.
    pub fn as_instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Instant(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Widens a primitive value to `target` along its widening chain.
    ///
    /// Returns `None` if this value is not primitive or `target` is not
    /// reachable from its type. Widening never loses information.
    pub fn widen_to(&self, target: PrimitiveType) -> Option<Value> {
        if self.primitive_type()? == target {
            return Some(self.clone());
        }
        let widened = match (self, target) {
            (Value::Int8(v), PrimitiveType::Int16) => Value::Int16(i16::from(*v)),
            (Value::Int8(v), PrimitiveType::Int32) => Value::Int32(i32::from(*v)),
            (Value::Int16(v), PrimitiveType::Int32) => Value::Int32(i32::from(*v)),
            (Value::Char(c), PrimitiveType::Int32) => Value::Int32(char_code(*c)),
            (Value::Char(c), PrimitiveType::Int64) => Value::Int64(i64::from(u32::from(*c))),
            (Value::Int8(v), PrimitiveType::Int64) => Value::Int64(i64::from(*v)),
            (Value::Int16(v), PrimitiveType::Int64) => Value::Int64(i64::from(*v)),
            (Value::Int32(v), PrimitiveType::Int64) => Value::Int64(i64::from(*v)),
            (Value::Float32(v), PrimitiveType::Float64) => Value::Float64(f64::from(*v)),
            _ => return None,
        };
        Some(widened)
    }
}

// Unicode scalar values stop at 0x10FFFF, so the cast is lossless.
fn char_code(c: char) -> i32 {
    u32::from(c) as i32
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int8(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Char(v) => write!(f, "'{}'", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Str(v) => write!(f, "\"{}\"", v),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Instant(ts) => f.write_str(&ts.to_rfc3339()),
            Value::Object { repr, .. } => f.write_str(repr),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::Int8(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int16(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::Char(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Value::Instant(ts)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
