//! Numeric guards.
//!
//! Every numeric guard gets exactly two overloads, `int64` and `float64`.
//! Narrower primitives reach them by widening and boxed numerics by
//! unboxing, so one predicate covers all numeric static types.

use super::{DISABLER, NEGATIVE, NOT_NEGATIVE, NOT_POSITIVE, POSITIVE, RANGE};
use crate::{HandlerBuilder, HandlerRegistry, RegistryError};
use guards_core::{ArgumentError, GuardArgs, PrimitiveType, Relation, Value, ValueType};

/// A predicate over integral and floating values.
trait NumericPredicate: Copy + Send + Sync + 'static {
    fn test_int(&self, n: i64) -> bool;
    fn test_float(&self, x: f64) -> bool;
}

/// Adds the `int64` and `float64` overloads for a numeric predicate.
fn numeric_methods<P, F>(builder: HandlerBuilder, prepare: F) -> HandlerBuilder
where
    P: NumericPredicate,
    F: Fn(&GuardArgs) -> Result<P, ArgumentError> + Clone + Send + Sync + 'static,
{
    let prepare_float = prepare.clone();
    builder
        .method(ValueType::Primitive(PrimitiveType::Int64), move |args: &GuardArgs| {
            let predicate = prepare(args)?;
            Ok(move |v: &Value| v.as_i64().is_some_and(|n| predicate.test_int(n)))
        })
        .method(ValueType::Primitive(PrimitiveType::Float64), move |args: &GuardArgs| {
            let predicate = prepare_float(args)?;
            Ok(move |v: &Value| v.as_f64().is_some_and(|x| predicate.test_float(x)))
        })
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Sign {
    NotNegative,
    Positive,
    Negative,
    NotPositive,
}

impl NumericPredicate for Sign {
    fn test_int(&self, n: i64) -> bool {
        match self {
            Sign::NotNegative => n >= 0,
            Sign::Positive => n > 0,
            Sign::Negative => n < 0,
            Sign::NotPositive => n <= 0,
        }
    }

    // NaN fails every sign guard
    fn test_float(&self, x: f64) -> bool {
        match self {
            Sign::NotNegative => x >= 0.0,
            Sign::Positive => x > 0.0,
            Sign::Negative => x < 0.0,
            Sign::NotPositive => x <= 0.0,
        }
    }
}

/// Inclusive bounds. Integral values compare exactly when both bounds were
/// given as integers.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds {
    exact: Option<(i64, i64)>,
    min: f64,
    max: f64,
}

impl Bounds {
    fn from_args(args: &GuardArgs) -> Result<Self, ArgumentError> {
        let min = args.float("min")?;
        let max = args.float("max")?;
        if min.is_nan() || max.is_nan() {
            return Err(ArgumentError::invalid("min", "bounds must be numbers"));
        }
        if min > max {
            return Err(ArgumentError::invalid(
                "max",
                format!("{} is less than min {}", max, min),
            ));
        }

        let exact = match (args.int("min"), args.int("max")) {
            (Ok(min), Ok(max)) => Some((min, max)),
            _ => None,
        };
        Ok(Self { exact, min, max })
    }
}

impl NumericPredicate for Bounds {
    fn test_int(&self, n: i64) -> bool {
        match self.exact {
            Some((min, max)) => (min..=max).contains(&n),
            None => self.test_float(n as f64),
        }
    }

    fn test_float(&self, x: f64) -> bool {
        (self.min..=self.max).contains(&x)
    }
}

fn sign(sign: Sign) -> impl Fn(&GuardArgs) -> Result<Sign, ArgumentError> + Clone + Send + Sync {
    move |_| Ok(sign)
}

pub(super) fn register(registry: &mut HandlerRegistry) -> Result<(), RegistryError> {
    registry.register(NOT_NEGATIVE, |b| {
        numeric_methods(b, sign(Sign::NotNegative))
            .message("{value} must not be negative")
            .disabler(DISABLER)
            .relation(Relation::IntersectingWith, NOT_POSITIVE)
    })?;

    registry.register(POSITIVE, |b| {
        numeric_methods(b, sign(Sign::Positive))
            .message("{value} must be positive")
            .disabler(DISABLER)
            .relation(Relation::SubsetOf, NOT_NEGATIVE)
            .relation(Relation::DisjointFrom, NOT_POSITIVE)
    })?;

    registry.register(NEGATIVE, |b| {
        numeric_methods(b, sign(Sign::Negative))
            .message("{value} must be negative")
            .disabler(DISABLER)
            .relation(Relation::SubsetOf, NOT_POSITIVE)
            .relation(Relation::DisjointFrom, NOT_NEGATIVE)
    })?;

    registry.register(NOT_POSITIVE, |b| {
        numeric_methods(b, sign(Sign::NotPositive))
            .message("{value} must not be positive")
            .disabler(DISABLER)
    })?;

    registry.register(RANGE, |b| {
        numeric_methods(b, Bounds::from_args)
            .message("{value} is not in range [{0}, {1}]")
            .params(["min", "max"])
            .disabler(DISABLER)
    })?;

    Ok(())
}
