//! Nominal type hierarchy for reference types.
//!
//! Reference types rank by the number of supertype hops between the offered
//! type and a checker's accepted type, so the lattice needs to know each
//! type's parent. The hierarchy is seeded with the built-in reference types
//! and extended when the engine is built.

use crate::RegistryError;
use guards_core::{NUMBER_TYPE, OBJECT_TYPE, PrimitiveType};
use std::collections::HashMap;

/// Single-inheritance map from type name to supertype name.
#[derive(Debug, Clone)]
pub struct TypeHierarchy {
    parents: HashMap<String, String>,
}

impl TypeHierarchy {
    /// Creates a hierarchy holding the built-in reference types.
    ///
    /// Boxed numerics extend `Number`, `Boolean` and `Character` extend
    /// `Object`, `String` extends `CharSequence`, `List` extends
    /// `Collection`, and `Instant` extends `Object`.
    pub fn new() -> Self {
        let mut parents = HashMap::new();
        parents.insert(NUMBER_TYPE.to_string(), OBJECT_TYPE.to_string());
        for p in PrimitiveType::ALL {
            let parent = if p.is_numeric() { NUMBER_TYPE } else { OBJECT_TYPE };
            parents.insert(p.boxed_name().to_string(), parent.to_string());
        }
        for (name, parent) in [
            ("CharSequence", OBJECT_TYPE),
            ("String", "CharSequence"),
            ("Collection", OBJECT_TYPE),
            ("List", "Collection"),
            ("Instant", OBJECT_TYPE),
        ] {
            parents.insert(name.to_string(), parent.to_string());
        }
        Self { parents }
    }

    /// Declares `name` as a direct subtype of `parent`.
    ///
    /// Fails if `name` is the root, already has a different parent, or if
    /// the declaration would create a cycle.
    pub fn declare(
        &mut self,
        name: impl Into<String>,
        parent: impl Into<String>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        let parent = parent.into();
        let invalid = |message: String| RegistryError::InvalidHierarchy {
            type_name: name.clone(),
            message,
        };

        if name == OBJECT_TYPE {
            return Err(invalid("the root type cannot have a supertype".to_string()));
        }
        if let Some(existing) = self.parents.get(&name) {
            if *existing == parent {
                return Ok(());
            }
            return Err(invalid(format!("already extends '{}'", existing)));
        }
        if self.ancestors(&parent).any(|ancestor| ancestor == name) {
            return Err(invalid(format!("'{}' is already a subtype of it", parent)));
        }

        self.parents.insert(name, parent);
        Ok(())
    }

    /// Returns the supertype of `name`.
    ///
    /// Undeclared types are direct subtypes of `Object`; `Object` has none.
    pub fn parent(&self, name: &str) -> Option<&str> {
        if name == OBJECT_TYPE {
            return None;
        }
        Some(self.parents.get(name).map_or(OBJECT_TYPE, String::as_str))
    }

    /// Iterates from `name` up to the root, starting with `name` itself.
    pub fn ancestors<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        std::iter::successors(Some(name), move |current| self.parent(current))
    }

    /// Number of supertype hops from `from` up to `to`.
    ///
    /// Returns `Some(0)` if the names are equal and `None` if `to` is not an
    /// ancestor of `from`.
    pub fn hops(&self, from: &str, to: &str) -> Option<u32> {
        self.ancestors(from)
            .position(|ancestor| ancestor == to)
            .map(|hops| hops as u32)
    }
}

impl Default for TypeHierarchy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_hops() {
        let hierarchy = TypeHierarchy::new();
        assert_eq!(hierarchy.hops("Integer", "Integer"), Some(0));
        assert_eq!(hierarchy.hops("Integer", "Number"), Some(1));
        assert_eq!(hierarchy.hops("Integer", "Object"), Some(2));
        assert_eq!(hierarchy.hops("String", "Object"), Some(2));
        assert_eq!(hierarchy.hops("Boolean", "Number"), None);
        assert_eq!(hierarchy.hops("Object", "String"), None);
    }

    #[test]
    fn test_undeclared_types_extend_object() {
        let hierarchy = TypeHierarchy::new();
        assert_eq!(hierarchy.parent("com.acme.Widget"), Some("Object"));
        assert_eq!(hierarchy.hops("com.acme.Widget", "Object"), Some(1));
    }

    #[test]
    fn test_declare_subtypes() {
        let mut hierarchy = TypeHierarchy::new();
        hierarchy.declare("Money", "Number").unwrap();
        hierarchy.declare("Euro", "Money").unwrap();

        assert_eq!(hierarchy.hops("Euro", "Number"), Some(2));
        assert_eq!(
            hierarchy.ancestors("Euro").collect::<Vec<_>>(),
            vec!["Euro", "Money", "Number", "Object"]
        );
        // Re-declaring the same edge is a no-op
        hierarchy.declare("Euro", "Money").unwrap();
    }

    #[test]
    fn test_declare_rejects_cycles_and_conflicts() {
        let mut hierarchy = TypeHierarchy::new();
        hierarchy.declare("A", "Object").unwrap();
        hierarchy.declare("B", "A").unwrap();

        assert!(hierarchy.declare("A", "B").is_err());
        assert!(hierarchy.declare("Integer", "Object").is_err());
        assert!(hierarchy.declare("Object", "A").is_err());
    }
}
