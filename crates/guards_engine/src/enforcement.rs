//! Enforcement protocol: verdicts and violation records.
//!
//! Per site and per invocation the protocol runs
//! `check → (absent? → pass) → invoke checker → pass | fail`. Parameter
//! sites are checked at entry, return sites at exit after the body completed
//! normally. Enforcement never mutates the value it checks.

use crate::{EnforceError, GuardError, ResolvedChecker, TypeHierarchy, render_message};
use guards_core::{EnforcementMode, GuardDeclaration, Phase, Value, ValueType};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A failed check.
#[derive(Debug, Clone, PartialEq)]
pub struct ViolationRecord {
    /// Declaration whose guard failed
    pub declaration: Arc<GuardDeclaration>,
    /// Phase at which the check ran
    pub phase: Phase,
    /// String form of the offending value
    pub value: String,
    /// Formatted violation message
    pub message: String,
}

impl fmt::Display for ViolationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} on {})",
            self.message, self.declaration.kind, self.declaration.site
        )
    }
}

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// The value satisfies the guard, or was not checked
    Pass,
    /// The value violates the guard
    Fail(Box<ViolationRecord>),
}

impl Verdict {
    /// Returns true if the check passed.
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    /// Returns the violation if the check failed.
    pub fn violation(&self) -> Option<&ViolationRecord> {
        match self {
            Verdict::Pass => None,
            Verdict::Fail(record) => Some(record),
        }
    }

    /// Turns a failed verdict into the failure of the given mode.
    pub fn into_result(self, mode: EnforcementMode) -> Result<(), GuardError> {
        match (self, mode) {
            (Verdict::Pass, _) | (Verdict::Fail(_), EnforcementMode::Disabled) => Ok(()),
            (Verdict::Fail(record), EnforcementMode::Exception) => {
                Err(GuardError::ContractViolation(record))
            }
            (Verdict::Fail(record), EnforcementMode::Assertion) => {
                Err(GuardError::AssertionViolation(record))
            }
        }
    }
}

impl ResolvedChecker {
    /// Checks one value against this declaration's resolved checkers.
    ///
    /// The caller has already verified the phase and the enforcement mode.
    pub fn evaluate(
        &self,
        declaration: &Arc<GuardDeclaration>,
        hierarchy: &TypeHierarchy,
        phase: Phase,
        value: &Value,
    ) -> Result<Verdict, EnforceError> {
        if self.disabled {
            return Ok(Verdict::Pass);
        }

        let passed = if value.is_null() {
            if let ValueType::Primitive(_) = declaration.static_type {
                return Err(type_mismatch(declaration, value));
            }
            match &self.absent {
                None => return Ok(Verdict::Pass),
                Some(resolution) => resolution.checker.check(value),
            }
        } else {
            if !has_static_type(value, &declaration.static_type, hierarchy) {
                return Err(type_mismatch(declaration, value));
            }
            let converted = self
                .present
                .conversion
                .apply(value)
                .ok_or_else(|| type_mismatch(declaration, value))?;
            self.present.checker.check(&converted)
        };

        if passed {
            return Ok(Verdict::Pass);
        }

        let record = ViolationRecord {
            declaration: Arc::clone(declaration),
            phase,
            value: value.to_string(),
            message: render_message(&self.descriptor, declaration, value),
        };
        debug!(
            declaration = %declaration,
            phase = %phase,
            value = %record.value,
            "Guard violated"
        );
        Ok(Verdict::Fail(Box::new(record)))
    }
}

/// Whether a present runtime value has the declared static type.
fn has_static_type(value: &Value, static_type: &ValueType, hierarchy: &TypeHierarchy) -> bool {
    match static_type {
        ValueType::Primitive(p) | ValueType::Boxed(p) => value.primitive_type() == Some(*p),
        ValueType::Reference(name) => {
            let runtime = value
                .primitive_type()
                .map_or(value.type_name(), |p| p.boxed_name());
            hierarchy.hops(runtime, name).is_some()
        }
        ValueType::Null => false,
    }
}

fn type_mismatch(declaration: &GuardDeclaration, value: &Value) -> EnforceError {
    EnforceError::TypeMismatch {
        site: declaration.site.clone(),
        expected: declaration.static_type.clone(),
        actual: value.type_name().to_string(),
    }
}
