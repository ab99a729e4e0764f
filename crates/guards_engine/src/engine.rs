//! The guard engine.
//!
//! This module provides the `Engine`, which owns the configuration snapshot,
//! the handler registry, the conversion lattice and the checker store, and
//! exposes the two halves of the protocol: `observe` at load time and
//! `check_entry` / `check_exit` at every guarded call.

use crate::{
    CheckerResolver, CheckerStore, ConsistencyReport, ConversionLattice, EnforceError, GuardError,
    GuardHandle, HandlerBuilder, HandlerRegistry, LatticeOptions, RegistryError, RelationAlgebra,
    ResolutionError, ResolvedChecker, TypeHierarchy, Verdict,
};
use guards_core::{
    DeclarationId, DeclarationSite, DeclarationSource, EngineConfig, GuardDeclaration, GuardKind,
    KindOrigin, Phase, RelationFact, RelationKind, Value,
};
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// Contract resolution and enforcement engine.
///
/// The engine is `Send + Sync`; share it across threads behind an `Arc`.
/// Its configuration is fixed at construction. To change it, build a new
/// engine.
///
/// # Example
///
/// ```rust
/// use guards_core::{DeclarationBuilder, PrimitiveType, Value, ValueType};
/// use guards_engine::Engine;
///
/// let engine = Engine::builder().build().unwrap();
///
/// let source = DeclarationBuilder::new("Range", ValueType::Primitive(PrimitiveType::Int32))
///     .parameter("Thermostat::set", 0)
///     .arg("min", 0)
///     .arg("max", 10)
///     .build();
/// let handle = engine.observe(source).unwrap();
///
/// assert!(engine.check_entry(handle.id(), &Value::Int32(5)).unwrap().is_pass());
/// assert!(!engine.check_entry(handle.id(), &Value::Int32(-1)).unwrap().is_pass());
/// ```
pub struct Engine {
    config: EngineConfig,
    registry: HandlerRegistry,
    lattice: ConversionLattice,
    store: CheckerStore,
    extra_relations: Vec<RelationFact>,
    relations: OnceLock<RelationAlgebra>,
}

impl Engine {
    /// Creates an engine with the built-in guard kinds.
    pub fn new(config: EngineConfig) -> Result<Self, RegistryError> {
        Self::builder().config(config).build()
    }

    /// Creates a new builder for `Engine`.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// The configuration snapshot.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The handler registry.
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// The conversion lattice.
    pub fn lattice(&self) -> &ConversionLattice {
        &self.lattice
    }

    /// Observes a declaration and resolves its checker.
    ///
    /// Observing the same `(site, kind)` again returns the identity and the
    /// outcome of the first observation. On a resolution failure the
    /// declaration stays recorded but unarmed; `find` still returns it.
    pub fn observe(&self, source: DeclarationSource) -> Result<GuardHandle, ResolutionError> {
        let (kind, origin) = self
            .registry
            .canonical(&source.kind)
            .unwrap_or_else(|| (GuardKind::new(source.kind.as_str()), KindOrigin::Native));

        let (handle, created) = self.store.insert_or_get(&source.site, &kind, |id| GuardDeclaration {
            id,
            kind: kind.clone(),
            origin,
            site: source.site.clone(),
            static_type: source.static_type.clone(),
            args: source.args.clone(),
        });
        if !created {
            let existing = handle.declaration();
            if existing.static_type != source.static_type || existing.args != source.args {
                warn!(
                    declaration = %existing,
                    ignored_type = %source.static_type,
                    "Conflicting re-declaration ignored; the first observation is kept"
                );
            } else {
                debug!(declaration = %existing, id = %handle.id(), "Declaration already observed");
            }
        }

        let failure = self.resolve(&handle).as_ref().err().cloned();
        match failure {
            None => Ok(handle),
            Some(err) => {
                if created {
                    warn!(declaration = %handle.declaration(), error = %err, "Guard declaration not armed");
                }
                Err(err)
            }
        }
    }

    /// Observes a batch of declarations.
    ///
    /// Sources naming a native guard kind are observed before sources using
    /// an alias, so a native declaration owns the identity of a site even
    /// when an alias for the same kind appears earlier in the batch. Results
    /// come back in input order.
    pub fn observe_all<I>(&self, sources: I) -> Vec<Result<GuardHandle, ResolutionError>>
    where
        I: IntoIterator<Item = DeclarationSource>,
    {
        let sources: Vec<_> = sources.into_iter().enumerate().collect();
        let (native, aliased): (Vec<_>, Vec<_>) = sources.into_iter().partition(|(_, source)| {
            !matches!(
                self.registry.canonical(&source.kind),
                Some((_, KindOrigin::Alias(_)))
            )
        });

        let mut results: BTreeMap<usize, Result<GuardHandle, ResolutionError>> = BTreeMap::new();
        for (index, source) in native.into_iter().chain(aliased) {
            results.insert(index, self.observe(source));
        }

        let results: Vec<_> = results.into_values().collect();
        let armed = results.iter().filter(|result| result.is_ok()).count();
        info!(
            declarations = results.len(),
            armed,
            failed = results.len() - armed,
            "Observed guard declarations"
        );
        results
    }

    /// Looks up an observed declaration by id.
    pub fn handle(&self, id: DeclarationId) -> Result<GuardHandle, EnforceError> {
        self.store.get(id).ok_or(EnforceError::UnknownDeclaration(id))
    }

    /// Looks up an observed declaration by site and kind identifier.
    pub fn find(&self, site: &DeclarationSite, kind: &str) -> Option<GuardHandle> {
        let (kind, _) = self
            .registry
            .canonical(kind)
            .unwrap_or_else(|| (GuardKind::new(kind), KindOrigin::Native));
        self.store.find(site, &kind)
    }

    /// Every observed declaration, in observation order.
    pub fn declarations(&self) -> Vec<GuardHandle> {
        self.store.snapshot()
    }

    /// Checks a parameter value before the guarded body runs.
    pub fn check_entry(&self, id: DeclarationId, value: &Value) -> Result<Verdict, EnforceError> {
        self.check(&self.handle(id)?, Phase::Entry, value)
    }

    /// Checks a return value after the guarded body completed normally.
    pub fn check_exit(&self, id: DeclarationId, value: &Value) -> Result<Verdict, EnforceError> {
        self.check(&self.handle(id)?, Phase::Exit, value)
    }

    /// Checks a value through a handle, without the id lookup.
    ///
    /// Nothing is checked when the configuration disables checks. Otherwise
    /// the phase must match the site, and the declaration must be armed.
    pub fn check(&self, handle: &GuardHandle, phase: Phase, value: &Value) -> Result<Verdict, EnforceError> {
        if !self.config.checks_enabled() {
            return Ok(Verdict::Pass);
        }

        let declaration = handle.declaration();
        let expected = declaration.site.position.phase();
        if phase != expected {
            return Err(EnforceError::WrongPhase {
                site: declaration.site.clone(),
                expected,
                actual: phase,
            });
        }

        // A handle may be found while its first observation is still
        // resolving; this waits for that resolution to publish.
        match self.resolve(handle) {
            Ok(resolved) => resolved.evaluate(declaration, self.lattice.hierarchy(), phase, value),
            Err(reason) => Err(EnforceError::NotArmed {
                declaration: declaration.to_string(),
                reason: reason.clone(),
            }),
        }
    }

    /// Resolution outcome of a declaration, resolving it at most once.
    fn resolve<'h>(&self, handle: &'h GuardHandle) -> &'h Result<Arc<ResolvedChecker>, ResolutionError> {
        let resolver = CheckerResolver::new(&self.registry, &self.lattice, self.config.test_nulls);
        handle
            .slot()
            .resolve_with(|declaration| resolver.resolve(declaration))
    }

    /// Checks a value and turns a failure into the configured mode's error.
    pub fn enforce(&self, handle: &GuardHandle, phase: Phase, value: &Value) -> Result<(), GuardError> {
        self.check(handle, phase, value)?
            .into_result(self.config.mode)
    }

    /// The relation algebra over built-in, registered and manifest facts.
    pub fn relations(&self) -> &RelationAlgebra {
        self.relations.get_or_init(|| {
            let mut facts = self.registry.relation_facts();
            facts.extend(self.extra_relations.iter().cloned());
            debug!(facts = facts.len(), "Built relation algebra");
            RelationAlgebra::new(facts)
        })
    }

    /// Relates two guard kind identifiers (native or alias).
    pub fn relate(&self, a: &str, b: &str) -> RelationKind {
        let canonical = |name: &str| {
            self.registry
                .canonical(name)
                .map_or_else(|| GuardKind::new(name), |(kind, _)| kind)
        };
        self.relations().relate(&canonical(a), &canonical(b))
    }

    /// Checks every site's combined guards for contradictions.
    pub fn consistency_report(&self) -> ConsistencyReport {
        let mut by_site: BTreeMap<DeclarationSite, Vec<GuardKind>> = BTreeMap::new();
        for handle in self.store.snapshot() {
            let declaration = handle.declaration();
            by_site
                .entry(declaration.site.clone())
                .or_default()
                .push(declaration.kind.clone());
        }

        let relations = self.relations();
        let mut report = ConsistencyReport::success();
        for (site, kinds) in &by_site {
            report.merge(relations.check_consistency(Some(site), kinds));
        }
        if !report.passed {
            warn!(errors = report.errors.len(), "Contradictory guards found");
        }
        report
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

type Describe = Box<dyn Fn(HandlerBuilder) -> HandlerBuilder + Send + Sync>;

/// Builder for creating an `Engine`.
///
/// # Example
///
/// ```rust
/// use guards_core::{EngineConfig, EnforcementMode, PrimitiveType, Value, ValueType};
/// use guards_engine::Engine;
///
/// let engine = Engine::builder()
///     .config(EngineConfig::builder().mode(EnforcementMode::Assertion).build())
///     .handler("Even", |b| {
///         b.check(ValueType::Primitive(PrimitiveType::Int64), |v: &Value| {
///             v.as_i64().is_some_and(|n| n % 2 == 0)
///         })
///     })
///     .alias("org.example.EvenNumber", "Even")
///     .subtype("Money", "Number")
///     .build()
///     .unwrap();
///
/// assert_eq!(engine.registry().kinds().count(), 11);
/// ```
pub struct EngineBuilder {
    config: EngineConfig,
    builtins: bool,
    handlers: Vec<(GuardKind, Describe)>,
    aliases: Vec<(String, GuardKind)>,
    subtypes: Vec<(String, String)>,
    relations: Vec<RelationFact>,
}

impl EngineBuilder {
    /// Creates a builder with the default configuration and the built-ins.
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            builtins: true,
            handlers: Vec::new(),
            aliases: Vec::new(),
            subtypes: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Sets the configuration snapshot.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Starts from an empty registry instead of the built-in guard kinds.
    pub fn without_builtins(mut self) -> Self {
        self.builtins = false;
        self
    }

    /// Registers a custom guard kind.
    pub fn handler<F>(mut self, kind: impl Into<GuardKind>, describe: F) -> Self
    where
        F: Fn(HandlerBuilder) -> HandlerBuilder + Send + Sync + 'static,
    {
        self.handlers.push((kind.into(), Box::new(describe)));
        self
    }

    /// Maps an external identifier onto a guard kind.
    pub fn alias(mut self, external: impl Into<String>, kind: impl Into<GuardKind>) -> Self {
        self.aliases.push((external.into(), kind.into()));
        self
    }

    /// Adds several aliases.
    pub fn aliases<I, A, K>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = (A, K)>,
        A: Into<String>,
        K: Into<GuardKind>,
    {
        self.aliases
            .extend(aliases.into_iter().map(|(a, k)| (a.into(), k.into())));
        self
    }

    /// Declares a reference type as a direct subtype of another.
    pub fn subtype(mut self, name: impl Into<String>, parent: impl Into<String>) -> Self {
        self.subtypes.push((name.into(), parent.into()));
        self
    }

    /// Adds a relation fact on top of those declared by handlers.
    pub fn relation(mut self, fact: RelationFact) -> Self {
        self.relations.push(fact);
        self
    }

    /// Builds the engine.
    ///
    /// Handlers are registered first, then aliases, then subtypes.
    pub fn build(self) -> Result<Engine, RegistryError> {
        let mut registry = if self.builtins {
            HandlerRegistry::with_builtins()?
        } else {
            HandlerRegistry::new()
        };
        for (kind, describe) in self.handlers {
            registry.register(kind, describe)?;
        }
        for (external, kind) in self.aliases {
            registry.alias(external, kind)?;
        }

        let mut hierarchy = TypeHierarchy::new();
        for (name, parent) in self.subtypes {
            hierarchy.declare(name, parent)?;
        }

        let lattice = ConversionLattice::new(LatticeOptions::from(&self.config), hierarchy);
        info!(
            mode = %self.config.mode,
            kinds = registry.kinds().count(),
            aliases = registry.aliases().count(),
            "Guard engine ready"
        );

        Ok(Engine {
            config: self.config,
            registry,
            lattice,
            store: CheckerStore::new(),
            extra_relations: self.relations,
            relations: OnceLock::new(),
        })
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guards_core::{DeclarationBuilder, EnforcementMode, PrimitiveType, ValueType};
    use pretty_assertions::assert_eq;

    fn int32() -> ValueType {
        ValueType::Primitive(PrimitiveType::Int32)
    }

    fn range(function: &str) -> DeclarationSource {
        DeclarationBuilder::new("Range", int32())
            .parameter(function, 0)
            .arg("min", 0)
            .arg("max", 10)
            .build()
    }

    #[test]
    fn test_observe_twice_keeps_identity() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let first = engine.observe(range("Thermostat::set")).unwrap();
        let second = engine.observe(range("Thermostat::set")).unwrap();

        assert_eq!(first.id(), second.id());
        assert_eq!(engine.declarations().len(), 1);
    }

    #[test]
    fn test_conflicting_redeclaration_keeps_first() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let first = engine.observe(range("Thermostat::set")).unwrap();
        let narrower = DeclarationBuilder::new("Range", int32())
            .parameter("Thermostat::set", 0)
            .arg("min", 0)
            .arg("max", 5)
            .build();
        let second = engine.observe(narrower).unwrap();

        assert_eq!(first.id(), second.id());
        assert_eq!(second.declaration().args.int("max").unwrap(), 10);
        assert!(engine.check_entry(second.id(), &Value::Int32(7)).unwrap().is_pass());
    }

    #[test]
    fn test_wrong_phase() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let handle = engine.observe(range("Thermostat::set")).unwrap();

        assert_eq!(
            engine.check_exit(handle.id(), &Value::Int32(5)),
            Err(EnforceError::WrongPhase {
                site: DeclarationSite::parameter("Thermostat::set", 0),
                expected: Phase::Entry,
                actual: Phase::Exit,
            })
        );
    }

    #[test]
    fn test_unknown_declaration() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        assert_eq!(
            engine.check_entry(DeclarationId(7), &Value::Int32(5)),
            Err(EnforceError::UnknownDeclaration(DeclarationId(7)))
        );
    }

    #[test]
    fn test_failed_resolution_is_not_armed() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let source = DeclarationBuilder::new("Range", int32())
            .parameter("Thermostat::set", 0)
            .arg("min", 0)
            .build();

        assert!(matches!(
            engine.observe(source),
            Err(ResolutionError::InvalidArguments { .. })
        ));
        let handle = engine
            .find(&DeclarationSite::parameter("Thermostat::set", 0), "Range")
            .unwrap();
        assert!(!handle.is_armed());
        assert!(matches!(
            engine.check_entry(handle.id(), &Value::Int32(5)),
            Err(EnforceError::NotArmed { .. })
        ));
    }

    #[test]
    fn test_unknown_kind_recorded() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let source = DeclarationBuilder::new("Odd", int32()).parameter("f", 0).build();

        assert!(matches!(
            engine.observe(source),
            Err(ResolutionError::UnknownKind { .. })
        ));
        assert!(engine.find(&DeclarationSite::parameter("f", 0), "Odd").is_some());
    }

    #[test]
    fn test_enforce_by_mode() {
        let exception = Engine::new(EngineConfig::default()).unwrap();
        let handle = exception.observe(range("f")).unwrap();
        assert!(matches!(
            exception.enforce(&handle, Phase::Entry, &Value::Int32(-1)),
            Err(GuardError::ContractViolation(_))
        ));

        let assertion = Engine::new(
            EngineConfig::builder()
                .mode(EnforcementMode::Assertion)
                .assertions_enabled(true)
                .build(),
        )
        .unwrap();
        let handle = assertion.observe(range("f")).unwrap();
        assert!(matches!(
            assertion.enforce(&handle, Phase::Entry, &Value::Int32(-1)),
            Err(GuardError::AssertionViolation(_))
        ));

        let silent = Engine::new(EngineConfig::builder().mode(EnforcementMode::Assertion).build())
            .unwrap();
        let handle = silent.observe(range("f")).unwrap();
        assert!(silent.enforce(&handle, Phase::Entry, &Value::Int32(-1)).is_ok());
    }

    #[test]
    fn test_alias_and_native_share_identity_native_first() {
        let engine = Engine::builder()
            .alias("javax.Nonnull", "NotNull")
            .build()
            .unwrap();
        let site = DeclarationSite::return_value("Repo::find");
        let aliased = DeclarationBuilder::new("javax.Nonnull", ValueType::object())
            .site(site.clone())
            .build();
        let native = DeclarationBuilder::new("NotNull", ValueType::object())
            .site(site.clone())
            .build();

        let results = engine.observe_all([aliased, native]);
        let ids: Vec<_> = results.iter().map(|r| r.as_ref().unwrap().id()).collect();
        assert_eq!(ids[0], ids[1]);
        assert_eq!(
            engine.find(&site, "NotNull").unwrap().declaration().origin,
            KindOrigin::Native
        );
    }

    #[test]
    fn test_builder_rejects_bad_alias() {
        assert!(matches!(
            Engine::builder().alias("x.Thing", "Nope").build(),
            Err(RegistryError::UnknownAliasTarget { .. })
        ));
    }

    #[test]
    fn test_relate_builtins() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        assert_eq!(engine.relate("Positive", "NotNegative"), RelationKind::Subset);
        assert_eq!(engine.relate("Positive", "Negative"), RelationKind::Disjoint);
        assert_eq!(engine.relate("Past", "Future"), RelationKind::Disjoint);
        assert_eq!(engine.relate("NotNull", "Matches"), RelationKind::Unknown);
    }

    #[test]
    fn test_consistency_report_groups_by_site() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let site = DeclarationSite::parameter("Account::deposit", 0);
        for kind in ["Positive", "NotPositive"] {
            let source = DeclarationBuilder::new(kind, ValueType::Primitive(PrimitiveType::Int64))
                .site(site.clone())
                .build();
            engine.observe(source).unwrap();
        }
        engine.observe(range("Other::call")).unwrap();

        let report = engine.consistency_report();
        assert!(!report.passed);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].site, Some(site));
    }
}
