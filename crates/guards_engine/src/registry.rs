//! Handler descriptors and the checker registry.
//!
//! Each guard kind is backed by a handler: a set of overloaded checking
//! methods, each accepting one value type, plus the guard's message template,
//! its parameter names, an optional disabler argument and static relation
//! facts. Handlers are registered explicitly under their kind and described
//! lazily, the first time a declaration of that kind needs them.

use crate::RegistryError;
use guards_core::{ArgumentError, GuardArgs, GuardKind, KindOrigin, RelationFact, Value, ValueType};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// Executable check prepared for one declaration.
///
/// Checkers are built once per declaration from the guard's arguments and
/// must be immutable afterwards: they are shared by every thread that
/// enforces the declaration.
pub trait Check: Send + Sync {
    /// Returns true if the value satisfies the guard.
    fn check(&self, value: &Value) -> bool;
}

impl<F> Check for F
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    fn check(&self, value: &Value) -> bool {
        self(value)
    }
}

type Prepare = Arc<dyn Fn(&GuardArgs) -> Result<Arc<dyn Check>, ArgumentError> + Send + Sync>;

/// One overload of a guard's checking logic.
#[derive(Clone)]
pub struct CheckMethod {
    accepted: ValueType,
    accepts_null: bool,
    prepare: Prepare,
}

impl CheckMethod {
    /// Type this method accepts.
    pub fn accepted(&self) -> &ValueType {
        &self.accepted
    }

    /// Whether this method also receives absent values.
    pub fn accepts_null(&self) -> bool {
        self.accepts_null
    }

    /// Diagnostic name, e.g. `check(int64)`.
    pub fn name(&self) -> String {
        format!("check({})", self.accepted)
    }

    /// Builds the checker for one declaration's arguments.
    pub fn prepare(&self, args: &GuardArgs) -> Result<Arc<dyn Check>, ArgumentError> {
        (self.prepare)(args)
    }
}

impl fmt::Debug for CheckMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckMethod")
            .field("accepted", &self.accepted)
            .field("accepts_null", &self.accepts_null)
            .finish_non_exhaustive()
    }
}

/// Everything the engine knows about one guard kind.
#[derive(Debug, Clone)]
pub struct HandlerDescriptor {
    kind: GuardKind,
    message: String,
    params: Vec<String>,
    disabler: Option<String>,
    methods: Vec<CheckMethod>,
    relations: Vec<RelationFact>,
}

impl HandlerDescriptor {
    /// Creates a new builder for the given kind.
    pub fn builder(kind: impl Into<GuardKind>) -> HandlerBuilder {
        let kind = kind.into();
        HandlerBuilder {
            message: format!("{{value}} violates {}", kind),
            kind,
            params: Vec::new(),
            disabler: None,
            methods: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Guard kind.
    pub fn kind(&self) -> &GuardKind {
        &self.kind
    }

    /// Message template used for violations.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Parameter names, in the order `{0}`, `{1}`, ... refer to them.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Name of the boolean argument that switches a site off.
    pub fn disabler(&self) -> Option<&str> {
        self.disabler.as_deref()
    }

    /// Checking methods, in declaration order.
    pub fn methods(&self) -> &[CheckMethod] {
        &self.methods
    }

    /// Static relation facts declared by this guard kind.
    pub fn relations(&self) -> &[RelationFact] {
        &self.relations
    }

    /// Returns true if the declaration's disabler argument is set.
    ///
    /// An absent disabler leaves the site on; one that is not a boolean is
    /// an error.
    pub fn is_disabled_by(&self, args: &GuardArgs) -> Result<bool, ArgumentError> {
        let Some(name) = self.disabler.as_deref() else {
            return Ok(false);
        };
        match args.bool(name) {
            Err(ArgumentError::Missing(_)) => Ok(false),
            other => other,
        }
    }
}

/// Builder for creating a `HandlerDescriptor`.
///
/// # Example
///
/// ```rust
/// use guards_core::{PrimitiveType, Value, ValueType};
/// use guards_engine::HandlerDescriptor;
///
/// let descriptor = HandlerDescriptor::builder("Even")
///     .message("{value} is odd")
///     .check(ValueType::Primitive(PrimitiveType::Int64), |v: &Value| {
///         v.as_i64().is_some_and(|n| n % 2 == 0)
///     })
///     .build();
///
/// assert_eq!(descriptor.methods().len(), 1);
/// ```
pub struct HandlerBuilder {
    kind: GuardKind,
    message: String,
    params: Vec<String>,
    disabler: Option<String>,
    methods: Vec<CheckMethod>,
    relations: Vec<RelationFact>,
}

impl HandlerBuilder {
    /// Sets the violation message template.
    ///
    /// `{0}`, `{1}`, ... are replaced by the declared parameters in order,
    /// `{name}` by the argument of that name, `{value}` by the offending
    /// value, `{site}` by the declaration site and `{kind}` by the kind.
    pub fn message(mut self, template: impl Into<String>) -> Self {
        self.message = template.into();
        self
    }

    /// Declares the guard's parameters in index order.
    pub fn params<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params.extend(names.into_iter().map(Into::into));
        self
    }

    /// Declares a boolean argument that disables the site when true.
    pub fn disabler(mut self, name: impl Into<String>) -> Self {
        self.disabler = Some(name.into());
        self
    }

    /// Adds a method whose checker is prepared from the guard's arguments.
    pub fn method<F, C>(self, accepted: ValueType, prepare: F) -> Self
    where
        F: Fn(&GuardArgs) -> Result<C, ArgumentError> + Send + Sync + 'static,
        C: Check + 'static,
    {
        self.push(accepted, false, prepare)
    }

    /// Adds a method that also receives absent values.
    pub fn null_method<F, C>(self, accepted: ValueType, prepare: F) -> Self
    where
        F: Fn(&GuardArgs) -> Result<C, ArgumentError> + Send + Sync + 'static,
        C: Check + 'static,
    {
        self.push(accepted, true, prepare)
    }

    /// Adds an argument-free method.
    pub fn check<C>(self, accepted: ValueType, check: C) -> Self
    where
        C: Check + Clone + 'static,
    {
        self.method(accepted, move |_| Ok(check.clone()))
    }

    /// Adds an argument-free method that also receives absent values.
    pub fn null_check<C>(self, accepted: ValueType, check: C) -> Self
    where
        C: Check + Clone + 'static,
    {
        self.null_method(accepted, move |_| Ok(check.clone()))
    }

    /// Declares a relation from this kind to another.
    pub fn relation(mut self, relation: guards_core::Relation, to: impl Into<GuardKind>) -> Self {
        self.relations
            .push(RelationFact::new(self.kind.clone(), relation, to));
        self
    }

    /// Builds the descriptor.
    pub fn build(self) -> HandlerDescriptor {
        HandlerDescriptor {
            kind: self.kind,
            message: self.message,
            params: self.params,
            disabler: self.disabler,
            methods: self.methods,
            relations: self.relations,
        }
    }

    fn push<F, C>(mut self, accepted: ValueType, accepts_null: bool, prepare: F) -> Self
    where
        F: Fn(&GuardArgs) -> Result<C, ArgumentError> + Send + Sync + 'static,
        C: Check + 'static,
    {
        let prepare: Prepare = Arc::new(
            move |args: &GuardArgs| -> Result<Arc<dyn Check>, ArgumentError> {
                Ok(Arc::new(prepare(args)?))
            },
        );
        self.methods.push(CheckMethod {
            accepted,
            accepts_null,
            prepare,
        });
        self
    }
}

type Describe = Arc<dyn Fn(HandlerBuilder) -> HandlerBuilder + Send + Sync>;

struct RegistryEntry {
    describe: Describe,
    descriptor: OnceLock<Arc<HandlerDescriptor>>,
}

/// Capability table from guard kind to handler descriptor.
///
/// Descriptors are built on first use and cached; concurrent first uses
/// build the descriptor once. External identifiers can be mapped onto native
/// kinds through aliases. A native kind always wins over an alias of the same
/// name.
#[derive(Default)]
pub struct HandlerRegistry {
    entries: BTreeMap<GuardKind, RegistryEntry>,
    aliases: BTreeMap<String, GuardKind>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in guard kinds.
    pub fn with_builtins() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        crate::handlers::register_builtins(&mut registry)?;
        Ok(registry)
    }

    /// Registers a handler under `kind`.
    ///
    /// `describe` receives a builder already bound to the kind and is run
    /// lazily, at most once.
    pub fn register<F>(&mut self, kind: impl Into<GuardKind>, describe: F) -> Result<(), RegistryError>
    where
        F: Fn(HandlerBuilder) -> HandlerBuilder + Send + Sync + 'static,
    {
        let kind = kind.into();
        if self.entries.contains_key(&kind) {
            return Err(RegistryError::DuplicateKind(kind));
        }
        if self.aliases.remove(kind.as_str()).is_some() {
            warn!(kind = %kind, "Native guard kind shadows an existing alias");
        }
        self.entries.insert(
            kind,
            RegistryEntry {
                describe: Arc::new(describe),
                descriptor: OnceLock::new(),
            },
        );
        Ok(())
    }

    /// Maps an external identifier onto a registered guard kind.
    ///
    /// An alias that collides with a native kind name is ignored.
    pub fn alias(
        &mut self,
        external: impl Into<String>,
        kind: impl Into<GuardKind>,
    ) -> Result<(), RegistryError> {
        let external = external.into();
        let kind = kind.into();
        if !self.entries.contains_key(&kind) {
            return Err(RegistryError::UnknownAliasTarget {
                alias: external,
                target: kind,
            });
        }
        if self.entries.contains_key(external.as_str()) {
            warn!(alias = %external, target = %kind, "Alias collides with a native guard kind; ignored");
            return Ok(());
        }
        debug!(alias = %external, target = %kind, "Registered guard alias");
        self.aliases.insert(external, kind);
        Ok(())
    }

    /// Resolves a kind identifier, native kinds first.
    pub fn canonical(&self, name: &str) -> Option<(GuardKind, KindOrigin)> {
        if let Some((kind, _)) = self.entries.get_key_value(name) {
            return Some((kind.clone(), KindOrigin::Native));
        }
        self.aliases
            .get(name)
            .map(|kind| (kind.clone(), KindOrigin::Alias(name.to_string())))
    }

    /// Returns the descriptor for `kind`, building it on first use.
    pub fn descriptor(&self, kind: &GuardKind) -> Option<Arc<HandlerDescriptor>> {
        let entry = self.entries.get(kind)?;
        let descriptor = entry.descriptor.get_or_init(|| {
            let descriptor = (entry.describe)(HandlerDescriptor::builder(kind.clone())).build();
            debug!(
                kind = %kind,
                methods = descriptor.methods.len(),
                "Built handler descriptor"
            );
            Arc::new(descriptor)
        });
        Some(Arc::clone(descriptor))
    }

    /// Registered guard kinds, in name order.
    pub fn kinds(&self) -> impl Iterator<Item = &GuardKind> {
        self.entries.keys()
    }

    /// Registered aliases, in name order.
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &GuardKind)> {
        self.aliases.iter().map(|(alias, kind)| (alias.as_str(), kind))
    }

    /// Relation facts declared by every registered kind.
    ///
    /// Builds every descriptor that has not been built yet.
    pub fn relation_facts(&self) -> Vec<RelationFact> {
        self.entries
            .keys()
            .filter_map(|kind| self.descriptor(kind))
            .flat_map(|descriptor| descriptor.relations.clone())
            .collect()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("kinds", &self.entries.keys().collect::<Vec<_>>())
            .field("aliases", &self.aliases)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guards_core::{PrimitiveType, Relation};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn even(builder: HandlerBuilder) -> HandlerBuilder {
        builder.check(ValueType::Primitive(PrimitiveType::Int64), |v: &Value| {
            v.as_i64().is_some_and(|n| n % 2 == 0)
        })
    }

    #[test]
    fn test_descriptor_is_built_once() {
        static BUILDS: AtomicUsize = AtomicUsize::new(0);
        let mut registry = HandlerRegistry::new();
        registry
            .register("Even", |builder| {
                BUILDS.fetch_add(1, Ordering::SeqCst);
                even(builder)
            })
            .unwrap();

        let kind = GuardKind::new("Even");
        let first = registry.descriptor(&kind).unwrap();
        let second = registry.descriptor(&kind).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(BUILDS.load(Ordering::SeqCst), 1);
        assert_eq!(first.kind(), &kind);
    }

    #[test]
    fn test_duplicate_kind_rejected() {
        let mut registry = HandlerRegistry::new();
        registry.register("Even", even).unwrap();
        assert_eq!(
            registry.register("Even", even),
            Err(RegistryError::DuplicateKind(GuardKind::new("Even")))
        );
    }

    #[test]
    fn test_alias_resolution() {
        let mut registry = HandlerRegistry::new();
        registry.register("Even", even).unwrap();
        registry.alias("org.example.EvenNumber", "Even").unwrap();

        assert_eq!(
            registry.canonical("org.example.EvenNumber"),
            Some((
                GuardKind::new("Even"),
                KindOrigin::Alias("org.example.EvenNumber".to_string())
            ))
        );
        assert_eq!(
            registry.canonical("Even"),
            Some((GuardKind::new("Even"), KindOrigin::Native))
        );
        assert_eq!(registry.canonical("Odd"), None);
    }

    #[test]
    fn test_alias_to_unknown_kind_rejected() {
        let mut registry = HandlerRegistry::new();
        assert!(matches!(
            registry.alias("x.NonNull", "NotNull"),
            Err(RegistryError::UnknownAliasTarget { .. })
        ));
    }

    #[test]
    fn test_native_kind_wins_over_alias() {
        let mut registry = HandlerRegistry::new();
        registry.register("Even", even).unwrap();
        registry.register("Odd", even).unwrap();
        registry.alias("Odd", "Even").unwrap();

        assert_eq!(
            registry.canonical("Odd"),
            Some((GuardKind::new("Odd"), KindOrigin::Native))
        );
        assert_eq!(registry.aliases().count(), 0);
    }

    #[test]
    fn test_disabler_argument() {
        let descriptor = even(HandlerDescriptor::builder("Even"))
            .disabler("disabled")
            .build();

        assert_eq!(descriptor.is_disabled_by(&GuardArgs::new().with("disabled", true)), Ok(true));
        assert_eq!(descriptor.is_disabled_by(&GuardArgs::new().with("disabled", false)), Ok(false));
        assert_eq!(descriptor.is_disabled_by(&GuardArgs::new()), Ok(false));
        assert!(matches!(
            descriptor.is_disabled_by(&GuardArgs::new().with("disabled", "yes")),
            Err(ArgumentError::WrongType { expected: "bool", .. })
        ));
    }

    #[test]
    fn test_relation_facts_collected() {
        let mut registry = HandlerRegistry::new();
        registry
            .register("Even", |b| even(b).relation(Relation::DisjointFrom, "Odd"))
            .unwrap();
        registry.register("Odd", even).unwrap();

        assert_eq!(
            registry.relation_facts(),
            vec![RelationFact::new("Even", Relation::DisjointFrom, "Odd")]
        );
    }
}
