//! Static value types.
//!
//! A guard is always attached to a value whose *declared* type is known when
//! the declaration is observed. These types drive overload resolution: the
//! engine ranks a declaration's static type against the types each checking
//! method accepts.

use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the root reference type.
pub const OBJECT_TYPE: &str = "Object";

/// Name of the common supertype of all boxed numeric types.
pub const NUMBER_TYPE: &str = "Number";

/// Primitive (unboxed) value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveType {
    /// Boolean
    Bool,
    /// 8-bit signed integer
    Int8,
    /// 16-bit signed integer
    Int16,
    /// Character (widens to 32-bit integer)
    Char,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
}

impl PrimitiveType {
    /// All primitive types, in declaration order.
    pub const ALL: [PrimitiveType; 8] = [
        PrimitiveType::Bool,
        PrimitiveType::Int8,
        PrimitiveType::Int16,
        PrimitiveType::Char,
        PrimitiveType::Int32,
        PrimitiveType::Int64,
        PrimitiveType::Float32,
        PrimitiveType::Float64,
    ];

    /// Returns the lowercase primitive name (e.g. `int32`).
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Bool => "bool",
            PrimitiveType::Int8 => "int8",
            PrimitiveType::Int16 => "int16",
            PrimitiveType::Char => "char",
            PrimitiveType::Int32 => "int32",
            PrimitiveType::Int64 => "int64",
            PrimitiveType::Float32 => "float32",
            PrimitiveType::Float64 => "float64",
        }
    }

    /// Returns the name of the boxed counterpart (e.g. `Integer`).
    pub fn boxed_name(self) -> &'static str {
        match self {
            PrimitiveType::Bool => "Boolean",
            PrimitiveType::Int8 => "Byte",
            PrimitiveType::Int16 => "Short",
            PrimitiveType::Char => "Character",
            PrimitiveType::Int32 => "Integer",
            PrimitiveType::Int64 => "Long",
            PrimitiveType::Float32 => "Float",
            PrimitiveType::Float64 => "Double",
        }
    }

    /// The next type on this type's widening chain, if any.
    ///
    /// Chains are `int8 → int16 → int32 → int64`, `char → int32 → int64` and
    /// `float32 → float64`. Every type has at most one successor, so a
    /// widening path between two types is unique.
    pub fn widens_to(self) -> Option<PrimitiveType> {
        match self {
            PrimitiveType::Int8 => Some(PrimitiveType::Int16),
            PrimitiveType::Int16 => Some(PrimitiveType::Int32),
            PrimitiveType::Char => Some(PrimitiveType::Int32),
            PrimitiveType::Int32 => Some(PrimitiveType::Int64),
            PrimitiveType::Float32 => Some(PrimitiveType::Float64),
            PrimitiveType::Bool | PrimitiveType::Int64 | PrimitiveType::Float64 => None,
        }
    }

    /// Returns true for the numeric types whose boxed form extends `Number`.
    pub fn is_numeric(self) -> bool {
        !matches!(self, PrimitiveType::Bool | PrimitiveType::Char)
    }

    fn from_primitive_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    fn from_boxed_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.boxed_name() == name)
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The declared type of a guarded value.
///
/// Serialized as its name: primitive names are lowercase (`int32`), boxed
/// names are capitalized (`Integer`), `null` is the type of the absent value
/// and anything else is a nominal reference type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ValueType {
    /// Unboxed primitive
    Primitive(PrimitiveType),
    /// Boxed primitive (a reference type that may be absent)
    Boxed(PrimitiveType),
    /// Nominal reference type
    Reference(String),
    /// Type of the absent value
    Null,
}

impl ValueType {
    /// Creates a reference type, normalizing boxed names to `Boxed`.
    pub fn reference(name: impl Into<String>) -> Self {
        let name = name.into();
        match PrimitiveType::from_boxed_name(&name) {
            Some(p) => ValueType::Boxed(p),
            None => ValueType::Reference(name),
        }
    }

    /// The root reference type.
    pub fn object() -> Self {
        ValueType::Reference(OBJECT_TYPE.to_string())
    }

    /// Returns true if values of this type may be absent.
    pub fn is_reference(&self) -> bool {
        matches!(self, ValueType::Boxed(_) | ValueType::Reference(_))
    }

    /// Returns the nominal name used in the type hierarchy, if this is a
    /// reference type.
    pub fn reference_name(&self) -> Option<&str> {
        match self {
            ValueType::Boxed(p) => Some(p.boxed_name()),
            ValueType::Reference(name) => Some(name),
            ValueType::Primitive(_) | ValueType::Null => None,
        }
    }

    /// Returns the type name.
    pub fn name(&self) -> &str {
        match self {
            ValueType::Primitive(p) => p.name(),
            ValueType::Boxed(p) => p.boxed_name(),
            ValueType::Reference(name) => name,
            ValueType::Null => "null",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ValueType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name == "null" {
            return Ok(ValueType::Null);
        }
        if let Some(p) = PrimitiveType::from_primitive_name(name) {
            return Ok(ValueType::Primitive(p));
        }
        let valid = name
            .chars()
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_')
            && name
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '$' | ':'));
        if !valid {
            return Err(CoreError::InvalidTypeName(s.to_string()));
        }
        Ok(ValueType::reference(name))
    }
}

impl TryFrom<String> for ValueType {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ValueType> for String {
    fn from(value: ValueType) -> Self {
        value.name().to_string()
    }
}

impl From<PrimitiveType> for ValueType {
    fn from(p: PrimitiveType) -> Self {
        ValueType::Primitive(p)
    }
}
