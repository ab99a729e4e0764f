//! SDK error types.

use guards_core::DeclarationSite;
use guards_engine::GuardError;
use guards_parser::ParserError;
use thiserror::Error;

/// Result type for SDK operations.
pub type Result<T> = std::result::Result<T, SdkError>;

/// Errors raised by the SDK facade.
#[derive(Debug, Error)]
pub enum SdkError {
    /// No process-wide engine has been installed
    #[error("No guard engine is installed")]
    NotInstalled,

    /// `install` was called while an engine is already installed
    #[error("A guard engine is already installed; use reload to replace it")]
    AlreadyInstalled,

    /// A guarded parameter has no argument at the call
    #[error("Guarded parameter {site} was not supplied ({supplied} arguments given)")]
    MissingArgument {
        /// Guarded site
        site: DeclarationSite,
        /// Number of arguments the caller supplied
        supplied: usize,
    },

    /// Manifest loading failed
    #[error(transparent)]
    Parser(#[from] ParserError),

    /// A guard failed or the protocol was misused
    #[error(transparent)]
    Guard(#[from] GuardError),
}
