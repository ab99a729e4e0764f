//! Checker store: the process-wide memo from declaration to checker.
//!
//! Declarations live in an append-only arena indexed by site and guard kind.
//! Each slot carries a once-cell holding the resolution outcome. A slot is
//! published before it resolves, so whichever caller needs the outcome first
//! resolves it and every concurrent contender, observer or checker, waits for
//! and shares that result. After publication a `GuardHandle`
//! reads its slot without taking any lock.

use crate::{ResolutionError, ResolvedChecker};
use guards_core::{DeclarationId, DeclarationSite, GuardDeclaration, GuardKind};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

type Outcome = Result<Arc<ResolvedChecker>, ResolutionError>;

/// One observed declaration and its resolution outcome.
pub(crate) struct Slot {
    declaration: Arc<GuardDeclaration>,
    outcome: OnceLock<Outcome>,
}

impl Slot {
    /// Returns the resolution outcome, resolving on first use.
    pub(crate) fn resolve_with<F>(&self, resolve: F) -> &Outcome
    where
        F: FnOnce(&GuardDeclaration) -> Result<ResolvedChecker, ResolutionError>,
    {
        self.outcome
            .get_or_init(|| resolve(&self.declaration).map(Arc::new))
    }
}

/// Cheap, cloneable access to one observed declaration.
#[derive(Clone)]
pub struct GuardHandle {
    slot: Arc<Slot>,
}

impl GuardHandle {
    /// Engine-assigned identity.
    pub fn id(&self) -> DeclarationId {
        self.slot.declaration.id
    }

    /// The observed declaration.
    pub fn declaration(&self) -> &Arc<GuardDeclaration> {
        &self.slot.declaration
    }

    /// Whether the declaration resolved and its checks are live.
    pub fn is_armed(&self) -> bool {
        matches!(self.slot.outcome.get(), Some(Ok(_)))
    }

    /// The resolution failure that keeps this declaration unarmed.
    pub fn resolution_error(&self) -> Option<&ResolutionError> {
        match self.slot.outcome.get() {
            Some(Err(err)) => Some(err),
            _ => None,
        }
    }

    /// The resolved checker, if the declaration is armed.
    pub fn resolved(&self) -> Option<&Arc<ResolvedChecker>> {
        match self.slot.outcome.get() {
            Some(Ok(resolved)) => Some(resolved),
            _ => None,
        }
    }

    pub(crate) fn slot(&self) -> &Slot {
        &self.slot
    }
}

impl fmt::Debug for GuardHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardHandle")
            .field("id", &self.id())
            .field("declaration", &self.slot.declaration.to_string())
            .field("armed", &self.is_armed())
            .finish()
    }
}

#[derive(Default)]
struct Inner {
    slots: Vec<Arc<Slot>>,
    index: HashMap<(DeclarationSite, GuardKind), DeclarationId>,
}

/// Arena of observed declarations.
#[derive(Default)]
pub struct CheckerStore {
    inner: RwLock<Inner>,
}

impl CheckerStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the slot for `(site, kind)`, creating it on first observation.
    ///
    /// The first observation owns the declaration's identity; `create`
    /// receives the new id and is not called for repeated observations.
    /// The boolean is true when the slot was created by this call.
    pub(crate) fn insert_or_get<F>(
        &self,
        site: &DeclarationSite,
        kind: &GuardKind,
        create: F,
    ) -> (GuardHandle, bool)
    where
        F: FnOnce(DeclarationId) -> GuardDeclaration,
    {
        let key = (site.clone(), kind.clone());
        {
            let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(handle) = inner.handle_for(&key) {
                return (handle, false);
            }
        }

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = inner.handle_for(&key) {
            return (handle, false);
        }

        let id = DeclarationId(inner.slots.len() as u64);
        let slot = Arc::new(Slot {
            declaration: Arc::new(create(id)),
            outcome: OnceLock::new(),
        });
        inner.slots.push(Arc::clone(&slot));
        inner.index.insert(key, id);
        (GuardHandle { slot }, true)
    }

    /// Looks up a declaration by id.
    pub fn get(&self, id: DeclarationId) -> Option<GuardHandle> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.slot(id).map(|slot| GuardHandle {
            slot: Arc::clone(slot),
        })
    }

    /// Looks up a declaration by site and canonical kind.
    pub fn find(&self, site: &DeclarationSite, kind: &GuardKind) -> Option<GuardHandle> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.handle_for(&(site.clone(), kind.clone()))
    }

    /// Handles of every observed declaration, in observation order.
    pub fn snapshot(&self) -> Vec<GuardHandle> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .slots
            .iter()
            .map(|slot| GuardHandle {
                slot: Arc::clone(slot),
            })
            .collect()
    }

    /// Number of observed declarations.
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .slots
            .len()
    }

    /// Returns true if nothing was observed yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Inner {
    fn slot(&self, id: DeclarationId) -> Option<&Arc<Slot>> {
        usize::try_from(id.0).ok().and_then(|index| self.slots.get(index))
    }

    fn handle_for(&self, key: &(DeclarationSite, GuardKind)) -> Option<GuardHandle> {
        let id = self.index.get(key)?;
        self.slot(*id).map(|slot| GuardHandle {
            slot: Arc::clone(slot),
        })
    }
}

impl fmt::Debug for CheckerStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckerStore")
            .field("declarations", &self.len())
            .finish()
    }
}
