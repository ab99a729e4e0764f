//! # Guards SDK
//!
//! Public API of the Guards contract engine.
//!
//! This crate re-exports the data model, the engine and the manifest parser,
//! keeps a process-wide engine for injected code to reach, and offers
//! [`Guarded`] to run a function body between its entry and exit checks.
//!
//! ## Example
//!
//! ```rust
//! use guards_sdk::prelude::*;
//! use std::sync::Arc;
//!
//! let manifest = parse_yaml(r#"
//! declarations:
//!   - kind: NotEmpty
//!     site: "Greeter::greet#0"
//!     type: String
//! "#).unwrap();
//! let loaded = manifest.load().unwrap();
//!
//! let greet = Guarded::for_function(Arc::new(loaded.engine), "Greeter::greet");
//! let name = Value::from("Ada");
//! let greeting = greet.call(&[name], || Ok(String::from("Hello, Ada"))).unwrap();
//! assert_eq!(greeting, "Hello, Ada");
//! assert!(greet.call(&[Value::from("")], || Ok(String::new())).is_err());
//! ```

mod error;
mod global;
mod guarded;

pub use error::*;
pub use global::*;
pub use guarded::*;

pub use guards_core;
pub use guards_engine;
pub use guards_parser;

/// Commonly used types from every Guards crate.
pub mod prelude {
    pub use crate::{Guarded, SdkError, engine, install, load_manifest, reload};
    pub use guards_core::{
        DeclarationBuilder, DeclarationSite, DeclarationSource, EnforcementMode, EngineConfig,
        GuardKind, Phase, PrimitiveType, Relation, RelationFact, RelationKind, Value, ValueType,
    };
    pub use guards_engine::{
        EnforceError, Engine, EngineBuilder, GuardError, GuardHandle, ResolutionError, Verdict,
        ViolationRecord,
    };
    pub use guards_parser::{GuardManifest, LoadedManifest, parse_file, parse_toml, parse_yaml};
}
