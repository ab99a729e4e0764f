//! Checker resolution.
//!
//! Given a declaration, the resolver ranks every checking method of the
//! guard's handler against the declared static type and picks the strictly
//! cheapest one. Ties are never broken arbitrarily: they fail with
//! `AmbiguousMatch`, naming the tied candidates in a stable order.

use crate::{
    Check, CheckMethod, Conversion, ConversionLattice, HandlerDescriptor, HandlerRegistry,
    ResolutionError,
};
use guards_core::{ArgumentError, GuardArgs, GuardDeclaration, ValueType};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// The checking method chosen for one value path, with its prepared checker.
#[derive(Clone)]
pub struct Resolution {
    /// Chosen method
    pub method: CheckMethod,
    /// How values reach the method's accepted type
    pub conversion: Conversion,
    /// Checker prepared from the declaration's arguments
    pub checker: Arc<dyn Check>,
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolution")
            .field("method", &self.method.name())
            .field("conversion", &self.conversion)
            .finish_non_exhaustive()
    }
}

/// Everything enforcement needs for one armed declaration.
#[derive(Debug, Clone)]
pub struct ResolvedChecker {
    /// Handler the checkers came from
    pub descriptor: Arc<HandlerDescriptor>,
    /// Path taken by present values
    pub present: Resolution,
    /// Path taken by absent values; `None` means absence passes
    pub absent: Option<Resolution>,
    /// Whether the declaration's disabler argument switched the site off
    pub disabled: bool,
}

/// Resolves declarations against a registry and a lattice.
#[derive(Debug, Clone, Copy)]
pub struct CheckerResolver<'a> {
    registry: &'a HandlerRegistry,
    lattice: &'a ConversionLattice,
    test_nulls: bool,
}

impl<'a> CheckerResolver<'a> {
    /// Creates a resolver. With `test_nulls` off, absent values always pass.
    pub fn new(registry: &'a HandlerRegistry, lattice: &'a ConversionLattice, test_nulls: bool) -> Self {
        Self {
            registry,
            lattice,
            test_nulls,
        }
    }

    /// Resolves one declaration.
    pub fn resolve(&self, declaration: &GuardDeclaration) -> Result<ResolvedChecker, ResolutionError> {
        let descriptor =
            self.registry
                .descriptor(&declaration.kind)
                .ok_or_else(|| ResolutionError::UnknownKind {
                    kind: declaration.kind.to_string(),
                    site: declaration.site.clone(),
                })?;
        warn_unknown_args(&descriptor, declaration);
        let disabled = descriptor
            .is_disabled_by(&declaration.args)
            .map_err(|source| invalid_arguments(declaration, source))?;

        let methods = descriptor.methods();
        let present_ranked = methods.iter().enumerate().filter_map(|(index, method)| {
            let conversion = self.lattice.rank(&declaration.static_type, method.accepted())?;
            // The absent type only reaches methods that opted into null handling
            if conversion == Conversion::NullReference && !method.accepts_null() {
                return None;
            }
            Some((index, conversion))
        });
        let (present_index, present_conversion) = select(declaration, methods, present_ranked)?;

        let absent_choice = if self.test_nulls && may_be_absent(&declaration.static_type) {
            let absent_ranked = methods.iter().enumerate().filter_map(|(index, method)| {
                if !method.accepts_null() || !method.accepted().is_reference() {
                    return None;
                }
                self.lattice
                    .rank(&declaration.static_type, method.accepted())
                    .map(|conversion| (index, conversion))
            });
            let mut ranked = absent_ranked.peekable();
            if ranked.peek().is_some() {
                Some(select(declaration, methods, ranked)?)
            } else {
                None
            }
        } else {
            None
        };

        let present_checker = prepare(declaration, &methods[present_index])?;
        let present = Resolution {
            method: methods[present_index].clone(),
            conversion: present_conversion,
            checker: Arc::clone(&present_checker),
        };

        let absent = match absent_choice {
            Some((index, conversion)) => {
                let checker = if index == present_index {
                    present_checker
                } else {
                    prepare(declaration, &methods[index])?
                };
                Some(Resolution {
                    method: methods[index].clone(),
                    conversion,
                    checker,
                })
            }
            None => None,
        };

        debug!(
            declaration = %declaration,
            present = %present.method.name(),
            absent = %absent.as_ref().map(|r| r.method.name()).unwrap_or_default(),
            cost = present.conversion.cost(),
            "Resolved checker"
        );

        Ok(ResolvedChecker {
            disabled,
            descriptor,
            present,
            absent,
        })
    }
}

/// Whether a value of this static type can be absent at runtime.
fn may_be_absent(static_type: &ValueType) -> bool {
    static_type.is_reference() || *static_type == ValueType::Null
}

/// Picks the strictly cheapest candidate.
fn select(
    declaration: &GuardDeclaration,
    methods: &[CheckMethod],
    ranked: impl Iterator<Item = (usize, Conversion)>,
) -> Result<(usize, Conversion), ResolutionError> {
    let ranked: Vec<_> = ranked.collect();
    let Some(cost) = ranked.iter().map(|(_, conversion)| conversion.cost()).min() else {
        return Err(ResolutionError::NoMatch {
            kind: declaration.kind.clone(),
            site: declaration.site.clone(),
            static_type: declaration.static_type.clone(),
            available: sorted_names(methods.iter()),
        });
    };

    let best: Vec<_> = ranked
        .into_iter()
        .filter(|(_, conversion)| conversion.cost() == cost)
        .collect();
    match best.as_slice() {
        [single] => Ok(*single),
        tied => Err(ResolutionError::AmbiguousMatch {
            kind: declaration.kind.clone(),
            site: declaration.site.clone(),
            static_type: declaration.static_type.clone(),
            cost,
            candidates: sorted_names(tied.iter().map(|(index, _)| &methods[*index])),
        }),
    }
}

fn sorted_names<'m>(methods: impl Iterator<Item = &'m CheckMethod>) -> Vec<String> {
    let mut names: Vec<_> = methods.map(CheckMethod::name).collect();
    names.sort();
    names
}

fn prepare(declaration: &GuardDeclaration, method: &CheckMethod) -> Result<Arc<dyn Check>, ResolutionError> {
    method
        .prepare(&declaration.args)
        .map_err(|source| invalid_arguments(declaration, source))
}

fn invalid_arguments(declaration: &GuardDeclaration, source: ArgumentError) -> ResolutionError {
    ResolutionError::InvalidArguments {
        kind: declaration.kind.clone(),
        site: declaration.site.clone(),
        source,
    }
}

fn warn_unknown_args(descriptor: &HandlerDescriptor, declaration: &GuardDeclaration) {
    for name in unknown_args(descriptor, &declaration.args) {
        warn!(
            declaration = %declaration,
            argument = name,
            "Guard argument is not a declared parameter"
        );
    }
}

fn unknown_args<'g>(descriptor: &HandlerDescriptor, args: &'g GuardArgs) -> Vec<&'g str> {
    args.iter()
        .map(|(name, _)| name)
        .filter(|name| {
            descriptor.disabler() != Some(*name) && !descriptor.params().iter().any(|p| p == name)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HandlerBuilder, LatticeOptions, TypeHierarchy};
    use guards_core::{DeclarationId, GuardKind, KindOrigin, PrimitiveType, Value};
    use pretty_assertions::assert_eq;

    fn int(p: PrimitiveType) -> ValueType {
        ValueType::Primitive(p)
    }

    fn declaration(kind: &str, static_type: ValueType, args: GuardArgs) -> GuardDeclaration {
        GuardDeclaration {
            id: DeclarationId(1),
            kind: GuardKind::new(kind),
            origin: KindOrigin::Native,
            site: "Probe::call#0".parse().unwrap(),
            static_type,
            args,
        }
    }

    fn registry(kind: &str, describe: fn(HandlerBuilder) -> HandlerBuilder) -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        registry.register(kind, describe).unwrap();
        registry
    }

    fn always(_: &Value) -> bool {
        true
    }

    fn numeric(builder: HandlerBuilder) -> HandlerBuilder {
        builder
            .check(int(PrimitiveType::Int64), always)
            .check(int(PrimitiveType::Float64), always)
            .check(ValueType::object(), always)
    }

    #[test]
    fn test_picks_cheapest_widening() {
        let registry = registry("Numeric", numeric);
        let lattice = ConversionLattice::default();
        let resolver = CheckerResolver::new(&registry, &lattice, true);

        let resolved = resolver
            .resolve(&declaration("Numeric", int(PrimitiveType::Int32), GuardArgs::new()))
            .unwrap();
        assert_eq!(resolved.present.method.name(), "check(int64)");
        assert_eq!(resolved.present.conversion.cost(), 1);
        assert!(resolved.absent.is_none());
    }

    #[test]
    fn test_reference_upcast_beats_unboxing() {
        let registry = registry("Numeric", numeric);
        let lattice = ConversionLattice::default();
        let resolver = CheckerResolver::new(&registry, &lattice, true);

        let resolved = resolver
            .resolve(&declaration(
                "Numeric",
                ValueType::Boxed(PrimitiveType::Int32),
                GuardArgs::new(),
            ))
            .unwrap();
        // Integer -> Number -> Object costs 2, unboxing costs 8 + 1
        assert_eq!(resolved.present.method.name(), "check(Object)");
    }

    #[test]
    fn test_no_match_lists_available_methods() {
        let registry = registry("Numeric", numeric);
        let lattice = ConversionLattice::default();
        let resolver = CheckerResolver::new(&registry, &lattice, true);

        let err = resolver
            .resolve(&declaration("Numeric", int(PrimitiveType::Bool), GuardArgs::new()))
            .unwrap_err();
        assert_eq!(
            err,
            ResolutionError::NoMatch {
                kind: GuardKind::new("Numeric"),
                site: "Probe::call#0".parse().unwrap(),
                static_type: int(PrimitiveType::Bool),
                available: vec![
                    "check(Object)".to_string(),
                    "check(float64)".to_string(),
                    "check(int64)".to_string(),
                ],
            }
        );
    }

    #[test]
    fn test_tie_is_ambiguous() {
        fn twice(builder: HandlerBuilder) -> HandlerBuilder {
            builder
                .check(int(PrimitiveType::Int64), always)
                .check(int(PrimitiveType::Int64), always)
        }
        let registry = registry("Twice", twice);
        let lattice = ConversionLattice::default();
        let resolver = CheckerResolver::new(&registry, &lattice, true);

        let err = resolver
            .resolve(&declaration("Twice", int(PrimitiveType::Int8), GuardArgs::new()))
            .unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::AmbiguousMatch { cost: 3, ref candidates, .. } if candidates.len() == 2
        ));
    }

    #[test]
    fn test_absent_path_requires_null_opt_in() {
        fn not_null(builder: HandlerBuilder) -> HandlerBuilder {
            builder.null_check(ValueType::object(), |v: &Value| !v.is_null())
        }
        let registry = registry("NotNull", not_null);
        let lattice = ConversionLattice::default();

        let resolved = CheckerResolver::new(&registry, &lattice, true)
            .resolve(&declaration("NotNull", ValueType::reference("String"), GuardArgs::new()))
            .unwrap();
        let absent = resolved.absent.unwrap();
        assert_eq!(absent.method.name(), "check(Object)");
        assert!(!absent.checker.check(&Value::Null));

        let resolved = CheckerResolver::new(&registry, &lattice, false)
            .resolve(&declaration("NotNull", ValueType::reference("String"), GuardArgs::new()))
            .unwrap();
        assert!(resolved.absent.is_none());
    }

    #[test]
    fn test_invalid_arguments() {
        fn bounded(builder: HandlerBuilder) -> HandlerBuilder {
            builder.params(["max"]).method(int(PrimitiveType::Int64), |args: &GuardArgs| {
                let max = args.int("max")?;
                Ok(move |v: &Value| v.as_i64().is_some_and(|n| n <= max))
            })
        }
        let registry = registry("AtMost", bounded);
        let lattice = ConversionLattice::default();
        let resolver = CheckerResolver::new(&registry, &lattice, true);

        let err = resolver
            .resolve(&declaration("AtMost", int(PrimitiveType::Int64), GuardArgs::new()))
            .unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::InvalidArguments { source: ArgumentError::Missing(ref name), .. } if name == "max"
        ));
    }

    #[test]
    fn test_disabler_must_be_boolean() {
        let registry = registry("Numeric", |b| numeric(b).disabler("disabled"));
        let lattice = ConversionLattice::default();
        let resolver = CheckerResolver::new(&registry, &lattice, true);
        let resolve = |args: GuardArgs| {
            resolver.resolve(&declaration("Numeric", int(PrimitiveType::Int64), args))
        };

        assert!(resolve(GuardArgs::new().with("disabled", true)).unwrap().disabled);
        assert!(!resolve(GuardArgs::new()).unwrap().disabled);
        assert!(matches!(
            resolve(GuardArgs::new().with("disabled", "yes")),
            Err(ResolutionError::InvalidArguments {
                source: ArgumentError::WrongType { ref name, .. },
                ..
            }) if name == "disabled"
        ));
    }

    #[test]
    fn test_unknown_kind() {
        let registry = HandlerRegistry::new();
        let lattice = ConversionLattice::new(LatticeOptions::default(), TypeHierarchy::new());
        let resolver = CheckerResolver::new(&registry, &lattice, true);

        assert!(matches!(
            resolver.resolve(&declaration("Missing", int(PrimitiveType::Int64), GuardArgs::new())),
            Err(ResolutionError::UnknownKind { .. })
        ));
    }

    #[test]
    fn test_unknown_args_detected() {
        let descriptor = HandlerDescriptor::builder("Range")
            .params(["min", "max"])
            .disabler("disabled")
            .build();
        let args = GuardArgs::new()
            .with("min", 0)
            .with("disabled", true)
            .with("step", 2);
        assert_eq!(unknown_args(&descriptor, &args), vec!["step"]);
    }
}
