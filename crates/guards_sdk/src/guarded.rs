//! Guarded function calls.
//!
//! `Guarded` performs what injected code would do around a function body:
//! entry checks for every guarded parameter, the body, then exit checks on the
//! return value if the body completed normally.

use crate::SdkError;
use guards_core::{Phase, Position, Value};
use guards_engine::{Engine, GuardHandle};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;

/// The guards of one function, ready to wrap its calls.
///
/// # Example
///
/// ```rust
/// use guards_core::{DeclarationBuilder, PrimitiveType, Value, ValueType};
/// use guards_engine::Engine;
/// use guards_sdk::Guarded;
/// use std::sync::Arc;
///
/// let engine = Arc::new(Engine::builder().build().unwrap());
/// engine
///     .observe(
///         DeclarationBuilder::new("Positive", ValueType::Primitive(PrimitiveType::Int64))
///             .parameter("Account::deposit", 0)
///             .build(),
///     )
///     .unwrap();
///
/// let deposit = Guarded::for_function(engine, "Account::deposit");
/// let balance = deposit.call(&[Value::Int64(50)], || Ok(150_i64)).unwrap();
/// assert_eq!(balance, 150);
/// assert!(deposit.call(&[Value::Int64(-5)], || Ok(0_i64)).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Guarded {
    engine: Arc<Engine>,
    function: String,
    parameters: BTreeMap<usize, Vec<GuardHandle>>,
    returns: Vec<GuardHandle>,
}

impl Guarded {
    /// Creates a wrapper with no guards.
    pub fn new(engine: Arc<Engine>, function: impl Into<String>) -> Self {
        Self {
            engine,
            function: function.into(),
            parameters: BTreeMap::new(),
            returns: Vec::new(),
        }
    }

    /// Creates a wrapper holding every declaration observed for `function`.
    pub fn for_function(engine: Arc<Engine>, function: impl Into<String>) -> Self {
        let mut guarded = Self::new(engine, function);
        for handle in guarded.engine.declarations() {
            if handle.declaration().site.function == guarded.function {
                guarded = guarded.guard(handle);
            }
        }
        guarded
    }

    /// Adds a declaration to the wrapper, placed by its site's position.
    pub fn guard(mut self, handle: GuardHandle) -> Self {
        match handle.declaration().site.position {
            Position::Parameter(index) => self.parameters.entry(index).or_default().push(handle),
            Position::Return => self.returns.push(handle),
        }
        self
    }

    /// Returns the wrapped function's name.
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Number of guards held by this wrapper.
    pub fn len(&self) -> usize {
        self.parameters.values().map(Vec::len).sum::<usize>() + self.returns.len()
    }

    /// Returns true if this wrapper holds no guards.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `body` between the entry and exit checks.
    ///
    /// Entry checks run in parameter order before the body. Exit checks run
    /// only if the body returns `Ok`. Failed checks surface as
    /// [`guards_engine::GuardError`] inside the returned error, next to the
    /// body's own errors.
    pub fn call<T, F>(&self, args: &[Value], body: F) -> anyhow::Result<T>
    where
        T: Clone + Into<Value>,
        F: FnOnce() -> anyhow::Result<T>,
    {
        for (&index, handles) in &self.parameters {
            for handle in handles {
                let value = args.get(index).ok_or_else(|| SdkError::MissingArgument {
                    site: handle.declaration().site.clone(),
                    supplied: args.len(),
                })?;
                self.engine.enforce(handle, Phase::Entry, value)?;
            }
        }

        let output = body()?;

        if !self.returns.is_empty() {
            let value: Value = output.clone().into();
            for handle in &self.returns {
                self.engine.enforce(handle, Phase::Exit, &value)?;
            }
        }
        trace!(function = %self.function, "Guarded call completed");
        Ok(output)
    }
}
