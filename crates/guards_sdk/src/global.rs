//! Process-wide engine.
//!
//! Injected code reaches the engine through this module instead of passing it
//! around. The installed engine is an immutable snapshot: `reload` swaps in a
//! new one, and callers holding the previous `Arc` keep using it until they
//! drop it.

use crate::{Result, SdkError};
use guards_engine::{Engine, ResolutionError};
use guards_parser::load_file;
use std::path::Path;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::{info, warn};

static ENGINE: OnceLock<RwLock<Option<Arc<Engine>>>> = OnceLock::new();

fn slot() -> &'static RwLock<Option<Arc<Engine>>> {
    ENGINE.get_or_init(|| RwLock::new(None))
}

/// Installs the process-wide engine.
///
/// Fails with `AlreadyInstalled` if an engine is installed; use [`reload`]
/// to replace it.
pub fn install(engine: Engine) -> Result<Arc<Engine>> {
    let mut current = slot().write().unwrap_or_else(PoisonError::into_inner);
    if current.is_some() {
        return Err(SdkError::AlreadyInstalled);
    }
    let engine = Arc::new(engine);
    *current = Some(Arc::clone(&engine));
    info!(mode = %engine.config().mode, "Installed guard engine");
    Ok(engine)
}

/// Replaces the process-wide engine, returning the previous one.
pub fn reload(engine: Engine) -> Option<Arc<Engine>> {
    let mut current = slot().write().unwrap_or_else(PoisonError::into_inner);
    let previous = current.replace(Arc::new(engine));
    info!(replaced = previous.is_some(), "Reloaded guard engine");
    previous
}

/// Removes the process-wide engine, returning it.
pub fn uninstall() -> Option<Arc<Engine>> {
    slot()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
}

/// Returns the process-wide engine.
pub fn engine() -> Result<Arc<Engine>> {
    slot()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .ok_or(SdkError::NotInstalled)
}

/// Loads a manifest file and makes its engine the process-wide one.
///
/// Declarations that fail to resolve do not fail the load; they are
/// returned so the host can report them.
pub fn load_manifest(path: &Path) -> Result<Vec<ResolutionError>> {
    let loaded = load_file(path)?;
    for failure in &loaded.failures {
        warn!(site = %failure.site(), error = %failure, "Manifest declaration is not armed");
    }
    reload(loaded.engine);
    Ok(loaded.failures)
}
