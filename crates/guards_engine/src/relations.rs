//! Relation algebra over guard kinds.
//!
//! Facts come from handler descriptors and manifests. `relate` derives the
//! relation between two kinds from the transitive closure of subset and
//! equality facts; anything it cannot derive is `Unknown`.

use crate::InconsistentRelationError;
use guards_core::{DeclarationSite, GuardKind, Relation, RelationFact, RelationKind};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::debug;

type Pair = (GuardKind, GuardKind);

fn pair(a: &GuardKind, b: &GuardKind) -> Pair {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

/// Kinds along a subset/equality path and the edges between them.
struct Chain<'a> {
    kinds: Vec<&'a GuardKind>,
    edges: Vec<Relation>,
}

/// Closure over declared relation facts.
#[derive(Debug, Clone, Default)]
pub struct RelationAlgebra {
    /// `a -> b` whenever every value satisfying `a` satisfies `b`
    up: BTreeMap<GuardKind, BTreeMap<GuardKind, Relation>>,
    disjoint: BTreeSet<Pair>,
    intersecting: BTreeSet<Pair>,
    inconsistent: BTreeSet<Pair>,
}

impl RelationAlgebra {
    /// Creates an algebra from a set of facts.
    pub fn new(facts: impl IntoIterator<Item = RelationFact>) -> Self {
        let mut algebra = Self::default();
        for fact in facts {
            algebra.add(&fact);
        }
        algebra
    }

    /// Adds one fact.
    pub fn add(&mut self, fact: &RelationFact) {
        let (from, to) = (&fact.from, &fact.to);
        match fact.relation {
            Relation::SubsetOf => self.link(from, to, Relation::SubsetOf),
            Relation::SupersetOf => self.add(&fact.inverted()),
            Relation::EqualTo | Relation::SynonymousTo => {
                self.link(from, to, fact.relation);
                self.link(to, from, fact.relation);
            }
            Relation::DisjointFrom => {
                self.disjoint.insert(pair(from, to));
            }
            Relation::IntersectingWith => {
                self.intersecting.insert(pair(from, to));
            }
            Relation::InconsistentWith => {
                self.inconsistent.insert(pair(from, to));
            }
        }
    }

    // Equality edges replace a weaker subset edge between the same kinds.
    fn link(&mut self, from: &GuardKind, to: &GuardKind, relation: Relation) {
        let edges = self.up.entry(from.clone()).or_default();
        match edges.get(to) {
            Some(existing) if *existing != Relation::SubsetOf => {}
            _ => {
                edges.insert(to.clone(), relation);
            }
        }
    }

    /// Relates two guard kinds.
    pub fn relate(&self, a: &GuardKind, b: &GuardKind) -> RelationKind {
        if a == b {
            return RelationKind::Equal;
        }
        if self.inconsistent.contains(&pair(a, b)) {
            return RelationKind::Inconsistent;
        }

        let forward = self.chain(a, b);
        let backward = self.chain(b, a);
        let contradictory = [&forward, &backward]
            .into_iter()
            .flatten()
            .any(|chain| self.chain_is_inconsistent(chain));
        if contradictory {
            return RelationKind::Inconsistent;
        }

        match (forward, backward) {
            (Some(forward), Some(_)) => {
                let synonymous = forward
                    .edges
                    .iter()
                    .all(|relation| *relation == Relation::SynonymousTo);
                if synonymous {
                    RelationKind::Synonymous
                } else {
                    RelationKind::Equal
                }
            }
            (Some(_), None) => RelationKind::Subset,
            (None, Some(_)) => RelationKind::Superset,
            (None, None) => {
                if self.derives_disjoint(a, b) {
                    RelationKind::Disjoint
                } else if self.intersecting.contains(&pair(a, b)) {
                    RelationKind::Intersects
                } else {
                    RelationKind::Unknown
                }
            }
        }
    }

    /// Checks the guards combined on one value.
    ///
    /// Inconsistent and disjoint pairs are errors, since no value can
    /// satisfy both. Subset, superset, equal and synonymous pairs are
    /// reported as redundancy warnings.
    pub fn check_consistency(
        &self,
        site: Option<&DeclarationSite>,
        kinds: &[GuardKind],
    ) -> ConsistencyReport {
        let kinds: Vec<_> = kinds.iter().collect::<BTreeSet<_>>().into_iter().collect();
        let mut report = ConsistencyReport::success();
        report.stats.kinds_checked = kinds.len();

        for (i, first) in kinds.iter().enumerate() {
            for second in &kinds[i + 1..] {
                report.stats.pairs_checked += 1;
                let relation = self.relate(first, second);
                let location = site.map(|s| format!(" on {}", s)).unwrap_or_default();
                match relation {
                    RelationKind::Inconsistent | RelationKind::Disjoint => {
                        report.add_error(InconsistentRelationError {
                            site: site.cloned(),
                            first: (*first).clone(),
                            second: (*second).clone(),
                            relation,
                        });
                    }
                    RelationKind::Subset
                    | RelationKind::Superset
                    | RelationKind::Equal
                    | RelationKind::Synonymous => {
                        report.add_warning(format!(
                            "Redundant guards{}: {} and {} ({})",
                            location, first, second, relation
                        ));
                    }
                    RelationKind::Intersects | RelationKind::Unknown => {}
                }
            }
        }

        debug!(
            kinds = report.stats.kinds_checked,
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "Checked guard consistency"
        );
        report
    }

    /// Shortest subset/equality chain from `from` to `to`, taking edges in
    /// name order on ties.
    fn chain<'a>(&'a self, from: &'a GuardKind, to: &'a GuardKind) -> Option<Chain<'a>> {
        let mut previous: BTreeMap<&GuardKind, (&GuardKind, Relation)> = BTreeMap::new();
        let mut seen = BTreeSet::from([from]);
        let mut queue = VecDeque::from([from]);

        while let Some(current) = queue.pop_front() {
            if current == to {
                let mut chain = Chain {
                    kinds: vec![current],
                    edges: Vec::new(),
                };
                let mut cursor = current;
                while let Some((parent, relation)) = previous.get(cursor) {
                    chain.kinds.push(*parent);
                    chain.edges.push(*relation);
                    cursor = *parent;
                }
                return Some(chain);
            }
            for (next, relation) in self.up.get(current).into_iter().flatten() {
                if seen.insert(next) {
                    previous.insert(next, (current, *relation));
                    queue.push_back(next);
                }
            }
        }
        None
    }

    fn chain_is_inconsistent(&self, chain: &Chain<'_>) -> bool {
        chain.kinds.iter().enumerate().any(|(i, first)| {
            chain.kinds[i + 1..]
                .iter()
                .any(|second| self.inconsistent.contains(&pair(first, second)))
        })
    }

    /// Every kind reachable upward from `kind`, itself included.
    fn closure<'a>(&'a self, kind: &'a GuardKind) -> BTreeSet<&'a GuardKind> {
        let mut seen = BTreeSet::from([kind]);
        let mut queue = VecDeque::from([kind]);
        while let Some(current) = queue.pop_front() {
            for next in self.up.get(current).into_iter().flat_map(BTreeMap::keys) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen
    }

    // Disjointness propagates to subsets of either side.
    fn derives_disjoint(&self, a: &GuardKind, b: &GuardKind) -> bool {
        let above_b = self.closure(b);
        self.closure(a).into_iter().any(|x| {
            above_b
                .iter()
                .any(|y| self.disjoint.contains(&pair(x, y)))
        })
    }
}

/// Outcome of a consistency check.
#[derive(Debug, Clone, Default)]
pub struct ConsistencyReport {
    /// Whether no contradictory pair was found
    pub passed: bool,

    /// Contradictory pairs
    pub errors: Vec<InconsistentRelationError>,

    /// Redundant pairs
    pub warnings: Vec<String>,

    /// Check statistics
    pub stats: ConsistencyStats,
}

/// Statistics about a consistency check.
#[derive(Debug, Clone, Default)]
pub struct ConsistencyStats {
    /// Number of distinct guard kinds examined
    pub kinds_checked: usize,

    /// Number of kind pairs related
    pub pairs_checked: usize,
}

impl ConsistencyReport {
    /// Creates a passing report.
    pub fn success() -> Self {
        Self {
            passed: true,
            ..Self::default()
        }
    }

    /// Adds an error to the report.
    pub fn add_error(&mut self, error: InconsistentRelationError) {
        self.errors.push(error);
        self.passed = false;
    }

    /// Adds a warning to the report.
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Folds another report into this one.
    pub fn merge(&mut self, other: ConsistencyReport) {
        self.passed &= other.passed;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.stats.kinds_checked += other.stats.kinds_checked;
        self.stats.pairs_checked += other.stats.pairs_checked;
    }
}
