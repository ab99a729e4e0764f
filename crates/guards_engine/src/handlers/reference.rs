//! Guards over reference values: presence, emptiness and patterns.

use super::{DISABLER, MATCHES, NOT_EMPTY, NOT_NULL};
use crate::{Check, HandlerRegistry, RegistryError};
use guards_core::{ArgumentError, GuardArgs, Value, ValueType};
use regex::Regex;

/// Compiles `pattern` so that it must match the whole value.
fn compile(pattern: &str) -> Result<Regex, ArgumentError> {
    Regex::new(&format!("^(?:{})$", pattern))
        .map_err(|e| ArgumentError::invalid("pattern", e.to_string()))
}

/// Checker for `Matches`, holding the compiled pattern.
#[derive(Debug, Clone)]
struct PatternCheck(Regex);

impl PatternCheck {
    fn prepare(args: &GuardArgs) -> Result<Self, ArgumentError> {
        compile(args.string("pattern")?).map(Self)
    }
}

impl Check for PatternCheck {
    fn check(&self, value: &Value) -> bool {
        value.as_str().is_some_and(|s| self.0.is_match(s))
    }
}

pub(super) fn register(registry: &mut HandlerRegistry) -> Result<(), RegistryError> {
    // The only built-in that receives absent values
    registry.register(NOT_NULL, |b| {
        b.null_check(ValueType::object(), |v: &Value| !v.is_null())
            .message("Value must not be null")
            .disabler(DISABLER)
    })?;

    registry.register(NOT_EMPTY, |b| {
        b.check(ValueType::reference("CharSequence"), |v: &Value| {
            v.as_str().is_some_and(|s| !s.is_empty())
        })
        .check(ValueType::reference("Collection"), |v: &Value| {
            v.as_list().is_some_and(|items| !items.is_empty())
        })
        .message("{value} must not be empty")
        .disabler(DISABLER)
    })?;

    registry.register(MATCHES, |b| {
        b.method(ValueType::reference("CharSequence"), PatternCheck::prepare)
            .message("{value} does not match {0}")
            .params(["pattern"])
            .disabler(DISABLER)
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_patterns_match_whole_value() {
        let regex = compile("[a-z]+").unwrap();
        assert!(regex.is_match("abc"));
        assert!(!regex.is_match("abc1"));

        let either = compile("yes|no").unwrap();
        assert!(either.is_match("no"));
        assert!(!either.is_match("nope"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = compile("(").unwrap_err();
        assert!(matches!(err, ArgumentError::Invalid { ref name, .. } if name == "pattern"));
    }

    #[test]
    fn test_matches_checker() {
        let pattern = PatternCheck::prepare(&GuardArgs::new().with("pattern", r"\d{3}")).unwrap();
        assert!(pattern.check(&Value::from("123")));
        assert!(!pattern.check(&Value::from("12")));
        assert!(!pattern.check(&Value::Int32(123)));
    }

    #[test]
    fn test_not_empty_overloads() {
        let mut registry = HandlerRegistry::new();
        register(&mut registry).unwrap();

        let descriptor = registry.descriptor(&NOT_EMPTY.into()).unwrap();
        let names: Vec<_> = descriptor.methods().iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["check(CharSequence)", "check(Collection)"]);

        let not_null = registry.descriptor(&NOT_NULL.into()).unwrap();
        assert!(not_null.methods()[0].accepts_null());
    }
}
