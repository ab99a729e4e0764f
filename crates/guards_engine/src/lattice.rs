//! Type conversion lattice.
//!
//! `rank(offered, candidate)` answers whether a value of the offered static
//! type can be handed to a checking method accepting `candidate`, and at what
//! cost. The resolver picks the cheapest candidate, so the costs below encode
//! specificity:
//!
//! - identity costs 0
//! - each primitive widening step costs 1 (`int8 → int16 → int32 → int64`,
//!   `char → int32 → int64`, `float32 → float64`)
//! - unboxing costs 8 and happens before widening
//! - reference types cost one per supertype hop
//! - the absent value reaches reference candidates at a fixed cost of 64
//!
//! There is no boxing and no conversion between integral and floating
//! families.

use crate::TypeHierarchy;
use guards_core::{EngineConfig, PrimitiveType, Value, ValueType};
use std::borrow::Cow;

/// Cost of one primitive widening step.
pub const WIDENING_STEP_COST: u32 = 1;

/// Cost of unboxing a boxed value.
pub const UNBOXING_COST: u32 = 8;

/// Cost of handing the absent value to a reference candidate.
pub const NULL_COST: u32 = 64;

/// How a value of the offered type is adapted to a candidate's accepted type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// Same type
    Identity,
    /// Primitive widening
    Widen {
        /// Offered primitive type
        from: PrimitiveType,
        /// Accepted primitive type
        to: PrimitiveType,
        /// Widening steps from `from` to `to`
        steps: u32,
    },
    /// Unboxing, then zero or more widening steps
    UnboxWiden {
        /// Primitive inside the offered boxed type
        from: PrimitiveType,
        /// Accepted primitive type
        to: PrimitiveType,
        /// Widening steps from `from` to `to`
        steps: u32,
    },
    /// Reference upcast
    Upcast {
        /// Supertype hops from the offered type
        hops: u32,
    },
    /// The absent value passed to a reference candidate
    NullReference,
}

impl Conversion {
    /// Total cost of this conversion.
    pub fn cost(&self) -> u32 {
        match self {
            Conversion::Identity => 0,
            Conversion::Widen { steps, .. } => steps * WIDENING_STEP_COST,
            Conversion::UnboxWiden { steps, .. } => UNBOXING_COST + steps * WIDENING_STEP_COST,
            Conversion::Upcast { hops } => *hops,
            Conversion::NullReference => NULL_COST,
        }
    }

    /// Adapts a present runtime value along this conversion.
    ///
    /// Returns `None` if the value does not have the conversion's source
    /// type. Reference conversions never change the value.
    pub fn apply<'v>(&self, value: &'v Value) -> Option<Cow<'v, Value>> {
        match self {
            Conversion::Widen { from, to, .. } | Conversion::UnboxWiden { from, to, .. } => {
                if value.primitive_type() != Some(*from) {
                    return None;
                }
                if from == to {
                    return Some(Cow::Borrowed(value));
                }
                value.widen_to(*to).map(Cow::Owned)
            }
            Conversion::Identity | Conversion::Upcast { .. } | Conversion::NullReference => {
                Some(Cow::Borrowed(value))
            }
        }
    }
}

/// Lattice switches taken from the engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatticeOptions {
    /// Allow primitive widening at all
    pub widen: bool,
    /// Allow widening steps that end in `int64`
    pub widen_to_long: bool,
    /// Allow widening `float32` to `float64`
    pub widen_to_double: bool,
    /// Allow unboxing before widening
    pub unbox: bool,
}

impl From<&EngineConfig> for LatticeOptions {
    fn from(config: &EngineConfig) -> Self {
        Self {
            widen: config.widen,
            widen_to_long: config.widen_to_long,
            widen_to_double: config.widen_to_double,
            unbox: config.unbox,
        }
    }
}

impl Default for LatticeOptions {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

/// The conversion lattice: widening rules plus the reference hierarchy.
#[derive(Debug, Clone)]
pub struct ConversionLattice {
    options: LatticeOptions,
    hierarchy: TypeHierarchy,
}

impl ConversionLattice {
    /// Creates a lattice.
    pub fn new(options: LatticeOptions, hierarchy: TypeHierarchy) -> Self {
        Self { options, hierarchy }
    }

    /// Returns the reference hierarchy.
    pub fn hierarchy(&self) -> &TypeHierarchy {
        &self.hierarchy
    }

    /// Ranks a candidate type against an offered type.
    ///
    /// Returns `None` when the candidate is unreachable.
    pub fn rank(&self, offered: &ValueType, candidate: &ValueType) -> Option<Conversion> {
        match (offered, candidate) {
            (ValueType::Primitive(from), ValueType::Primitive(to)) => {
                let steps = self.widening_steps(*from, *to)?;
                Some(if steps == 0 {
                    Conversion::Identity
                } else {
                    Conversion::Widen {
                        from: *from,
                        to: *to,
                        steps,
                    }
                })
            }
            (ValueType::Boxed(from), ValueType::Primitive(to)) => {
                if !self.options.unbox {
                    return None;
                }
                let steps = self.widening_steps(*from, *to)?;
                Some(Conversion::UnboxWiden {
                    from: *from,
                    to: *to,
                    steps,
                })
            }
            (ValueType::Null, ValueType::Boxed(_) | ValueType::Reference(_)) => {
                Some(Conversion::NullReference)
            }
            (
                ValueType::Boxed(_) | ValueType::Reference(_),
                ValueType::Boxed(_) | ValueType::Reference(_),
            ) => {
                let from = offered.reference_name()?;
                let to = candidate.reference_name()?;
                let hops = self.hierarchy.hops(from, to)?;
                Some(if hops == 0 {
                    Conversion::Identity
                } else {
                    Conversion::Upcast { hops }
                })
            }
            _ => None,
        }
    }

    /// Number of widening steps from `from` to `to`, if allowed.
    fn widening_steps(&self, from: PrimitiveType, to: PrimitiveType) -> Option<u32> {
        if from == to {
            return Some(0);
        }
        if !self.options.widen {
            return None;
        }

        let mut current = from;
        let mut steps = 0;
        while let Some(next) = current.widens_to() {
            if next == PrimitiveType::Int64 && !self.options.widen_to_long {
                return None;
            }
            if next == PrimitiveType::Float64 && !self.options.widen_to_double {
                return None;
            }
            steps += 1;
            if next == to {
                return Some(steps);
            }
            current = next;
        }
        None
    }
}

impl Default for ConversionLattice {
    fn default() -> Self {
        Self::new(LatticeOptions::default(), TypeHierarchy::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn prim(p: PrimitiveType) -> ValueType {
        ValueType::Primitive(p)
    }

    fn cost(lattice: &ConversionLattice, offered: &ValueType, candidate: &ValueType) -> Option<u32> {
        lattice.rank(offered, candidate).map(|c| c.cost())
    }

    #[test]
    fn test_widening_costs() {
        let lattice = ConversionLattice::default();
        assert_eq!(cost(&lattice, &prim(PrimitiveType::Int32), &prim(PrimitiveType::Int32)), Some(0));
        assert_eq!(cost(&lattice, &prim(PrimitiveType::Int16), &prim(PrimitiveType::Int32)), Some(1));
        assert_eq!(cost(&lattice, &prim(PrimitiveType::Int8), &prim(PrimitiveType::Int64)), Some(3));
        assert_eq!(cost(&lattice, &prim(PrimitiveType::Char), &prim(PrimitiveType::Int64)), Some(2));
        assert_eq!(
            cost(&lattice, &prim(PrimitiveType::Float32), &prim(PrimitiveType::Float64)),
            Some(1)
        );
    }

    #[test]
    fn test_unrelated_families_unreachable() {
        let lattice = ConversionLattice::default();
        assert_eq!(lattice.rank(&prim(PrimitiveType::Bool), &prim(PrimitiveType::Int32)), None);
        assert_eq!(lattice.rank(&prim(PrimitiveType::Int32), &prim(PrimitiveType::Float64)), None);
        assert_eq!(lattice.rank(&prim(PrimitiveType::Int64), &prim(PrimitiveType::Int32)), None);
        assert_eq!(lattice.rank(&prim(PrimitiveType::Int8), &prim(PrimitiveType::Char)), None);
    }

    #[test]
    fn test_no_boxing() {
        let lattice = ConversionLattice::default();
        assert_eq!(lattice.rank(&prim(PrimitiveType::Int32), &ValueType::object()), None);
        assert_eq!(
            lattice.rank(&prim(PrimitiveType::Int32), &ValueType::Boxed(PrimitiveType::Int32)),
            None
        );
    }

    #[test]
    fn test_unboxing_then_widening() {
        let lattice = ConversionLattice::default();
        let boxed = ValueType::Boxed(PrimitiveType::Int32);
        assert_eq!(
            lattice.rank(&boxed, &prim(PrimitiveType::Int64)),
            Some(Conversion::UnboxWiden {
                from: PrimitiveType::Int32,
                to: PrimitiveType::Int64,
                steps: 1,
            })
        );
        assert_eq!(cost(&lattice, &boxed, &prim(PrimitiveType::Int32)), Some(UNBOXING_COST));
        // Boxed types are not interconvertible
        assert_eq!(lattice.rank(&boxed, &ValueType::Boxed(PrimitiveType::Int64)), None);
    }

    #[test]
    fn test_toggles() {
        let options = LatticeOptions {
            widen: true,
            widen_to_long: false,
            widen_to_double: false,
            unbox: false,
        };
        let lattice = ConversionLattice::new(options, TypeHierarchy::new());
        assert_eq!(cost(&lattice, &prim(PrimitiveType::Int8), &prim(PrimitiveType::Int32)), Some(2));
        assert_eq!(lattice.rank(&prim(PrimitiveType::Int32), &prim(PrimitiveType::Int64)), None);
        assert_eq!(lattice.rank(&prim(PrimitiveType::Float32), &prim(PrimitiveType::Float64)), None);
        assert_eq!(
            lattice.rank(&ValueType::Boxed(PrimitiveType::Int32), &prim(PrimitiveType::Int32)),
            None
        );

        let no_widening = ConversionLattice::new(
            LatticeOptions {
                widen: false,
                ..LatticeOptions::default()
            },
            TypeHierarchy::new(),
        );
        assert_eq!(no_widening.rank(&prim(PrimitiveType::Int8), &prim(PrimitiveType::Int16)), None);
        assert_eq!(
            no_widening.rank(&prim(PrimitiveType::Int8), &prim(PrimitiveType::Int8)),
            Some(Conversion::Identity)
        );
    }

    #[test]
    fn test_reference_specificity() {
        let lattice = ConversionLattice::default();
        let integer = ValueType::Boxed(PrimitiveType::Int32);
        assert_eq!(
            lattice.rank(&integer, &ValueType::Reference("Number".into())),
            Some(Conversion::Upcast { hops: 1 })
        );
        assert_eq!(cost(&lattice, &integer, &ValueType::object()), Some(2));
        assert_eq!(
            lattice.rank(&ValueType::Reference("String".into()), &ValueType::Reference("Number".into())),
            None
        );
    }

    #[test]
    fn test_null_reaches_references_only() {
        let lattice = ConversionLattice::default();
        assert_eq!(cost(&lattice, &ValueType::Null, &ValueType::object()), Some(NULL_COST));
        assert_eq!(lattice.rank(&ValueType::Null, &prim(PrimitiveType::Int32)), None);
        assert_eq!(lattice.rank(&ValueType::object(), &ValueType::Null), None);
    }

    #[test]
    fn test_apply_widens_values() {
        let conversion = Conversion::Widen {
            from: PrimitiveType::Int16,
            to: PrimitiveType::Int64,
            steps: 2,
        };
        assert_eq!(
            conversion.apply(&Value::Int16(-4)).map(Cow::into_owned),
            Some(Value::Int64(-4))
        );
        assert_eq!(conversion.apply(&Value::Int32(-4)), None);
        assert_eq!(
            Conversion::Identity.apply(&Value::from("x")).map(Cow::into_owned),
            Some(Value::from("x"))
        );
    }

    fn integral() -> impl Strategy<Value = PrimitiveType> {
        prop_oneof![
            Just(PrimitiveType::Int8),
            Just(PrimitiveType::Int16),
            Just(PrimitiveType::Int32),
            Just(PrimitiveType::Int64),
        ]
    }

    fn any_primitive() -> impl Strategy<Value = PrimitiveType> {
        proptest::sample::select(PrimitiveType::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_cost_grows_with_chain_length(from in integral(), to in integral()) {
            let lattice = ConversionLattice::default();
            let chain = [
                PrimitiveType::Int8,
                PrimitiveType::Int16,
                PrimitiveType::Int32,
                PrimitiveType::Int64,
            ];
            let i = chain.iter().position(|p| *p == from).unwrap();
            let j = chain.iter().position(|p| *p == to).unwrap();
            let rank = cost(&lattice, &prim(from), &prim(to));
            if i <= j {
                prop_assert_eq!(rank, Some((j - i) as u32));
            } else {
                prop_assert_eq!(rank, None);
            }
        }

        #[test]
        fn prop_families_never_mix(a in any_primitive(), b in any_primitive()) {
            let lattice = ConversionLattice::default();
            let family = |p: PrimitiveType| match p {
                PrimitiveType::Bool => 0,
                PrimitiveType::Float32 | PrimitiveType::Float64 => 2,
                _ => 1,
            };
            if family(a) != family(b) {
                prop_assert_eq!(lattice.rank(&prim(a), &prim(b)), None);
            }
        }

        #[test]
        fn prop_rank_is_deterministic(a in any_primitive(), b in any_primitive()) {
            let lattice = ConversionLattice::default();
            prop_assert_eq!(lattice.rank(&prim(a), &prim(b)), lattice.rank(&prim(a), &prim(b)));
            prop_assert_eq!(
                lattice.rank(&ValueType::Boxed(a), &prim(b)),
                lattice.rank(&ValueType::Boxed(a), &prim(b))
            );
        }
    }
}
