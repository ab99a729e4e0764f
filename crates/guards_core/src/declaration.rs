//! Guard declarations and their building blocks.
//!
//! A declaration is one application of a guard kind to one declaration site:
//! "parameter 0 of `Account::deposit` must satisfy `Positive`". Declarations
//! are immutable once observed by the engine.

use crate::{ArgumentError, CoreError, ValueType};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Identifier of a guard kind (e.g. `NotNull`, `Range`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuardKind(String);

impl GuardKind {
    /// Creates a new guard kind identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GuardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Derived `Ord`/`Hash` agree with `String`'s, so maps keyed by kind can be
// queried with a `&str`.
impl Borrow<str> for GuardKind {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GuardKind {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for GuardKind {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Position of a guarded value within its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Position {
    /// Zero-based parameter index
    Parameter(usize),
    /// The function's return value
    Return,
}

impl Position {
    /// The enforcement phase at which this position is checked.
    pub fn phase(self) -> Phase {
        match self {
            Position::Parameter(_) => Phase::Entry,
            Position::Return => Phase::Exit,
        }
    }
}

/// When a check fires relative to the guarded function body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Before the body runs (parameters)
    Entry,
    /// After the body completed normally (return value)
    Exit,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Entry => f.write_str("entry"),
            Phase::Exit => f.write_str("exit"),
        }
    }
}

/// The specific parameter or return position a guard is attached to.
///
/// Written as `function#index` for parameters and `function#return` for
/// return values, e.g. `Account::deposit#0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeclarationSite {
    /// Owning function
    pub function: String,
    /// Position within the function
    pub position: Position,
}

impl DeclarationSite {
    /// Creates a parameter site.
    pub fn parameter(function: impl Into<String>, index: usize) -> Self {
        Self {
            function: function.into(),
            position: Position::Parameter(index),
        }
    }

    /// Creates a return-value site.
    pub fn return_value(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            position: Position::Return,
        }
    }
}

impl fmt::Display for DeclarationSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Position::Parameter(index) => write!(f, "{}#{}", self.function, index),
            Position::Return => write!(f, "{}#return", self.function),
        }
    }
}

impl FromStr for DeclarationSite {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |message: &str| CoreError::InvalidSite {
            site: s.to_string(),
            message: message.to_string(),
        };

        let (function, position) = s
            .rsplit_once('#')
            .ok_or_else(|| invalid("expected 'function#index' or 'function#return'"))?;
        if function.trim().is_empty() {
            return Err(invalid("function name is empty"));
        }

        let position = match position {
            "return" => Position::Return,
            index => Position::Parameter(
                index
                    .parse()
                    .map_err(|_| invalid("position must be 'return' or a parameter index"))?,
            ),
        };

        Ok(Self {
            function: function.trim().to_string(),
            position,
        })
    }
}

impl TryFrom<String> for DeclarationSite {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeclarationSite> for String {
    fn from(site: DeclarationSite) -> Self {
        site.to_string()
    }
}

/// A single guard argument value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    /// Boolean argument
    Bool(bool),
    /// Integer argument
    Int(i64),
    /// Floating point argument
    Float(f64),
    /// String argument
    Str(String),
}

impl ArgValue {
    /// Returns the type name of this argument.
    pub fn type_name(&self) -> &'static str {
        match self {
            ArgValue::Bool(_) => "bool",
            ArgValue::Int(_) => "int",
            ArgValue::Float(_) => "float",
            ArgValue::Str(_) => "string",
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Bool(v) => write!(f, "{}", v),
            ArgValue::Int(v) => write!(f, "{}", v),
            ArgValue::Float(v) => write!(f, "{}", v),
            ArgValue::Str(v) => f.write_str(v),
        }
    }
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        ArgValue::Bool(v)
    }
}

impl From<i64> for ArgValue {
    fn from(v: i64) -> Self {
        ArgValue::Int(v)
    }
}

impl From<i32> for ArgValue {
    fn from(v: i32) -> Self {
        ArgValue::Int(i64::from(v))
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        ArgValue::Float(v)
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        ArgValue::Str(v.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        ArgValue::Str(v)
    }
}

/// Named arguments of one guard application (e.g. `min = 0, max = 10`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuardArgs(BTreeMap<String, ArgValue>);

impl GuardArgs {
    /// Creates an empty argument set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an argument.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Returns the argument with the given name.
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.0.get(name)
    }

    /// Returns true if no arguments are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over arguments in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns a boolean argument.
    pub fn bool(&self, name: &str) -> Result<bool, ArgumentError> {
        match self.require(name)? {
            ArgValue::Bool(v) => Ok(*v),
            other => Err(wrong_type(name, "bool", other)),
        }
    }

    /// Returns an integer argument.
    pub fn int(&self, name: &str) -> Result<i64, ArgumentError> {
        match self.require(name)? {
            ArgValue::Int(v) => Ok(*v),
            other => Err(wrong_type(name, "int", other)),
        }
    }

    /// Returns a floating point argument. Integer arguments are accepted.
    pub fn float(&self, name: &str) -> Result<f64, ArgumentError> {
        match self.require(name)? {
            ArgValue::Float(v) => Ok(*v),
            ArgValue::Int(v) => Ok(*v as f64),
            other => Err(wrong_type(name, "float", other)),
        }
    }

    /// Returns a string argument.
    pub fn string(&self, name: &str) -> Result<&str, ArgumentError> {
        match self.require(name)? {
            ArgValue::Str(v) => Ok(v),
            other => Err(wrong_type(name, "string", other)),
        }
    }

    fn require(&self, name: &str) -> Result<&ArgValue, ArgumentError> {
        self.0
            .get(name)
            .ok_or_else(|| ArgumentError::Missing(name.to_string()))
    }
}

fn wrong_type(name: &str, expected: &'static str, actual: &ArgValue) -> ArgumentError {
    ArgumentError::WrongType {
        name: name.to_string(),
        expected,
        actual: actual.type_name(),
    }
}

/// Stable identity of an observed declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeclarationId(pub u64);

impl fmt::Display for DeclarationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a load-time scanner supplies for one guarded site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclarationSource {
    /// Guard kind identifier, native or an alias
    pub kind: String,

    /// Guarded site
    pub site: DeclarationSite,

    /// Declared type of the guarded value
    #[serde(rename = "type")]
    pub static_type: ValueType,

    /// Guard arguments
    #[serde(default)]
    pub args: GuardArgs,
}

/// How a declaration's guard kind was named at the site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindOrigin {
    /// The site named the guard kind directly
    Native,
    /// The site used an external identifier mapped to the kind
    Alias(String),
}

/// One contract application, as observed and owned by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardDeclaration {
    /// Engine-assigned identity
    pub id: DeclarationId,

    /// Canonical guard kind
    pub kind: GuardKind,

    /// How the kind was named at the site
    pub origin: KindOrigin,

    /// Guarded site
    pub site: DeclarationSite,

    /// Declared type of the guarded value
    pub static_type: ValueType,

    /// Guard arguments
    pub args: GuardArgs,
}

impl fmt::Display for GuardDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {} ({})", self.kind, self.site, self.static_type)
    }
}
