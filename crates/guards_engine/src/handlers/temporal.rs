//! Guards over points in time.
//!
//! Both guards compare against the clock at check time, not at resolution.

use super::{DISABLER, FUTURE, PAST};
use crate::{HandlerRegistry, RegistryError};
use chrono::Utc;
use guards_core::{Relation, Value, ValueType};

fn is_past(v: &Value) -> bool {
    v.as_instant().is_some_and(|ts| ts < Utc::now())
}

fn is_future(v: &Value) -> bool {
    v.as_instant().is_some_and(|ts| ts > Utc::now())
}

pub(super) fn register(registry: &mut HandlerRegistry) -> Result<(), RegistryError> {
    registry.register(PAST, |b| {
        b.check(ValueType::reference("Instant"), is_past)
            .message("{value} is not in the past")
            .disabler(DISABLER)
            .relation(Relation::DisjointFrom, FUTURE)
    })?;

    registry.register(FUTURE, |b| {
        b.check(ValueType::reference("Instant"), is_future)
            .message("{value} is not in the future")
            .disabler(DISABLER)
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_past_and_future() {
        let yesterday = Value::Instant(Utc::now() - Duration::days(1));
        let tomorrow = Value::Instant(Utc::now() + Duration::days(1));

        assert!(is_past(&yesterday));
        assert!(!is_past(&tomorrow));
        assert!(is_future(&tomorrow));
        assert!(!is_future(&yesterday));
        assert!(!is_past(&Value::from("2020-01-01")));
    }
}
