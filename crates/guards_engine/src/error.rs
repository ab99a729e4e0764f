//! Error types for resolution and enforcement.

use crate::ViolationRecord;
use guards_core::{
    ArgumentError, DeclarationId, DeclarationSite, GuardKind, Phase, RelationKind, ValueType,
};
use thiserror::Error;

/// Load-time failures that keep a declaration from being armed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolutionError {
    /// Two or more checking methods tie at the lowest cost
    #[error(
        "Ambiguous match for {kind} on {site}: {static_type} reaches [{}] at equal cost {cost}",
        .candidates.join(", ")
    )]
    AmbiguousMatch {
        kind: GuardKind,
        site: DeclarationSite,
        static_type: ValueType,
        cost: u32,
        candidates: Vec<String>,
    },

    /// No checking method accepts the static type
    #[error(
        "No match for {kind} on {site}: {static_type} reaches none of [{}]",
        .available.join(", ")
    )]
    NoMatch {
        kind: GuardKind,
        site: DeclarationSite,
        static_type: ValueType,
        available: Vec<String>,
    },

    /// The handler rejected the declaration's arguments
    #[error("Invalid arguments for {kind} on {site}: {source}")]
    InvalidArguments {
        kind: GuardKind,
        site: DeclarationSite,
        #[source]
        source: ArgumentError,
    },

    /// The guard kind is neither registered nor an alias
    #[error("Unknown guard kind '{kind}' on {site}")]
    UnknownKind { kind: String, site: DeclarationSite },
}

impl ResolutionError {
    /// Site of the declaration that failed to resolve.
    pub fn site(&self) -> &DeclarationSite {
        match self {
            Self::AmbiguousMatch { site, .. }
            | Self::NoMatch { site, .. }
            | Self::InvalidArguments { site, .. }
            | Self::UnknownKind { site, .. } => site,
        }
    }
}

/// Misuse of the enforcement protocol by the injection mechanism.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnforceError {
    /// No declaration with this id was observed
    #[error("Unknown declaration {0}")]
    UnknownDeclaration(DeclarationId),

    /// The declaration failed to resolve and is not armed
    #[error("Declaration {declaration} is not armed: {reason}")]
    NotArmed {
        declaration: String,
        reason: ResolutionError,
    },

    /// An entry check on a return site or an exit check on a parameter site
    #[error("Site {site} is checked at {expected}, not at {actual}")]
    WrongPhase {
        site: DeclarationSite,
        expected: Phase,
        actual: Phase,
    },

    /// The runtime value does not have the declared static type
    #[error("Type mismatch on {site}: declared {expected}, got {actual}")]
    TypeMismatch {
        site: DeclarationSite,
        expected: ValueType,
        actual: String,
    },
}

/// Errors raised while building the handler registry or type hierarchy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// A guard kind was registered twice
    #[error("Guard kind '{0}' is already registered")]
    DuplicateKind(GuardKind),

    /// An alias points at an unregistered guard kind
    #[error("Alias '{alias}' targets unknown guard kind '{target}'")]
    UnknownAliasTarget { alias: String, target: GuardKind },

    /// A subtype declaration would break the hierarchy
    #[error("Invalid subtype declaration '{type_name}': {message}")]
    InvalidHierarchy { type_name: String, message: String },
}

/// Two guards combined on one value contradict each other.
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "{first} and {second} are {relation}{}",
    .site.as_ref().map(|site| format!(" on {}", site)).unwrap_or_default()
)]
pub struct InconsistentRelationError {
    /// Site the guards are combined on, if known
    pub site: Option<DeclarationSite>,
    /// First guard kind
    pub first: GuardKind,
    /// Second guard kind
    pub second: GuardKind,
    /// How the two kinds relate
    pub relation: RelationKind,
}

/// Top-level error surfaced to the code wrapping a guarded function.
#[derive(Debug, Clone, Error)]
pub enum GuardError {
    /// Load-time resolution failure
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// Protocol misuse
    #[error(transparent)]
    Enforcement(#[from] EnforceError),

    /// Registry construction failure
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A check failed in exception mode
    #[error("Contract violation: {0}")]
    ContractViolation(Box<ViolationRecord>),

    /// A check failed in assertion mode with assertions enabled
    #[error("Assertion failed: {0}")]
    AssertionViolation(Box<ViolationRecord>),
}

impl GuardError {
    /// Returns the violation record if this error is a failed check.
    pub fn violation(&self) -> Option<&ViolationRecord> {
        match self {
            Self::ContractViolation(record) | Self::AssertionViolation(record) => Some(record),
            _ => None,
        }
    }
}
