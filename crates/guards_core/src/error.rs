//! Error types shared by every Guards crate.
//!
//! This module defines the errors raised while building the data model:
//! unparseable type names, malformed declaration sites and guard arguments
//! that are missing or carry the wrong type.

use thiserror::Error;

/// Main error type for core data model operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// A type name could not be parsed
    #[error("Invalid type name: '{0}'")]
    InvalidTypeName(String),

    /// A declaration site string could not be parsed
    #[error("Invalid declaration site '{site}': {message}")]
    InvalidSite {
        /// Raw site text
        site: String,
        /// Description of the problem
        message: String,
    },

    /// Argument access failed
    #[error(transparent)]
    Argument(#[from] ArgumentError),
}

/// Error type for guard argument access.
///
/// Raised by handlers while they prepare a checker from a declaration's
/// arguments, so it always names the argument involved.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArgumentError {
    /// Argument is not present at all
    #[error("Missing argument '{0}'")]
    Missing(String),

    /// Argument is present with a different type
    #[error("Argument '{name}' has type {actual}, expected {expected}")]
    WrongType {
        /// Argument name
        name: String,
        /// Expected type
        expected: &'static str,
        /// Actual type
        actual: &'static str,
    },

    /// Argument is well-typed but semantically unusable
    #[error("Argument '{name}' is invalid: {message}")]
    Invalid {
        /// Argument name
        name: String,
        /// Failure details
        message: String,
    },
}

impl ArgumentError {
    /// Creates a new invalid argument error.
    pub fn invalid(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            name: name.into(),
            message: message.into(),
        }
    }
}
