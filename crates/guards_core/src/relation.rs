//! Static relations between guard kinds.
//!
//! Relation facts are declared alongside guard kinds and are only ever used
//! for consistency analysis. Enforcement never looks at them.

use crate::GuardKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A declared, directed relation between two guard kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Relation {
    /// Every value satisfying the source satisfies the target
    SubsetOf,
    /// Every value satisfying the target satisfies the source
    SupersetOf,
    /// Both accept exactly the same values
    EqualTo,
    /// No value satisfies both
    DisjointFrom,
    /// Some values satisfy both
    IntersectingWith,
    /// Both are names for the same guard
    SynonymousTo,
    /// Combining both on one value is contradictory
    InconsistentWith,
}

impl Relation {
    /// The relation read in the opposite direction.
    pub fn inverse(self) -> Relation {
        match self {
            Relation::SubsetOf => Relation::SupersetOf,
            Relation::SupersetOf => Relation::SubsetOf,
            symmetric => symmetric,
        }
    }
}

/// `from <relation> to`, e.g. `Positive subsetOf NotNegative`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationFact {
    /// Source guard kind
    pub from: GuardKind,
    /// Relation from source to target
    pub relation: Relation,
    /// Target guard kind
    pub to: GuardKind,
}

impl RelationFact {
    /// Creates a new relation fact.
    pub fn new(from: impl Into<GuardKind>, relation: Relation, to: impl Into<GuardKind>) -> Self {
        Self {
            from: from.into(),
            relation,
            to: to.into(),
        }
    }

    /// The same fact read from the target's side.
    pub fn inverted(&self) -> RelationFact {
        RelationFact {
            from: self.to.clone(),
            relation: self.relation.inverse(),
            to: self.from.clone(),
        }
    }
}

impl fmt::Display for RelationFact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?} {}", self.from, self.relation, self.to)
    }
}

/// Outcome of relating two guard kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    /// First is a subset of the second
    Subset,
    /// First is a superset of the second
    Superset,
    /// Both accept the same values
    Equal,
    /// No value satisfies both
    Disjoint,
    /// Some values satisfy both
    Intersects,
    /// Both are names for one guard
    Synonymous,
    /// Combining both is contradictory
    Inconsistent,
    /// Nothing is known
    Unknown,
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelationKind::Subset => "subset",
            RelationKind::Superset => "superset",
            RelationKind::Equal => "equal",
            RelationKind::Disjoint => "disjoint",
            RelationKind::Intersects => "intersects",
            RelationKind::Synonymous => "synonymous",
            RelationKind::Inconsistent => "inconsistent",
            RelationKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}
