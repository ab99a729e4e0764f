//! Built-in guard kinds.
//!
//! This module registers the guards every engine starts with:
//! - Numeric sign guards: NotNegative, Positive, Negative, NotPositive
//! - Range: numeric value within inclusive `[min, max]` bounds
//! - Reference guards: NotNull, NotEmpty, Matches
//! - Temporal guards: Past, Future
//!
//! Every built-in accepts the `disabled` argument, which switches a site off.

mod numeric;
mod reference;
mod temporal;

use crate::{HandlerRegistry, RegistryError};

/// Name of the boolean argument that disables a built-in guard at one site.
pub const DISABLER: &str = "disabled";

pub const NOT_NULL: &str = "NotNull";
pub const NOT_NEGATIVE: &str = "NotNegative";
pub const POSITIVE: &str = "Positive";
pub const NEGATIVE: &str = "Negative";
pub const NOT_POSITIVE: &str = "NotPositive";
pub const RANGE: &str = "Range";
pub const NOT_EMPTY: &str = "NotEmpty";
pub const MATCHES: &str = "Matches";
pub const PAST: &str = "Past";
pub const FUTURE: &str = "Future";

/// Registers every built-in guard kind.
pub fn register_builtins(registry: &mut HandlerRegistry) -> Result<(), RegistryError> {
    numeric::register(registry)?;
    reference::register(registry)?;
    temporal::register(registry)?;
    Ok(())
}
