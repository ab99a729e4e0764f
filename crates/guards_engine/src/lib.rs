//! # Guards Engine
//!
//! Contract resolution and enforcement. Given a guard declaration and the
//! static type of the value it decorates, the engine picks the one checking
//! method that fits best, caches it per declaration, and runs it every time
//! the guarded function is entered or returns.
//!
//! - **Type conversion lattice**: ranks how well an offered type reaches a
//!   checking method's accepted type (widening, unboxing, upcasts)
//! - **Handler registry**: guard kind → lazily built handler descriptor
//! - **Checker resolver**: strictly cheapest method, or an ambiguity error
//! - **Checker store**: once-per-declaration resolution, shared by all threads
//! - **Enforcement**: entry/exit checks, null policy and failure modes
//! - **Relation algebra**: static consistency analysis between guard kinds
//!
//! ## Example
//!
//! ```rust
//! use guards_core::{DeclarationBuilder, EngineConfig, Value, ValueType};
//! use guards_engine::Engine;
//!
//! let engine = Engine::new(EngineConfig::default()).unwrap();
//!
//! let source = DeclarationBuilder::new("NotNull", ValueType::object())
//!     .returns("Repo::find")
//!     .build();
//! let handle = engine.observe(source).unwrap();
//!
//! let verdict = engine.check_exit(handle.id(), &Value::Null).unwrap();
//! if let Some(violation) = verdict.violation() {
//!     println!("{}", violation);
//! }
//! ```

mod engine;
mod enforcement;
mod error;
pub mod handlers;
mod hierarchy;
mod lattice;
mod message;
mod registry;
mod relations;
mod resolver;
mod store;

pub use engine::*;
pub use enforcement::*;
pub use error::*;
pub use hierarchy::*;
pub use lattice::*;
pub use message::*;
pub use registry::*;
pub use relations::*;
pub use resolver::*;
pub use store::*;
