//! # Guards Core
//!
//! Core data structures and types for the Guards contract engine.
//!
//! A guard is a declarative contract attached to a function parameter or
//! return value ("not null", "non-negative", "within [a, b]"). This crate
//! provides the data model shared by the engine, the manifest parser and the
//! SDK.
//!
//! ## Key Concepts
//!
//! - **ValueType**: the declared (static) type of a guarded value
//! - **Value**: the runtime value observed at a function boundary
//! - **DeclarationSource / GuardDeclaration**: one guard applied to one site
//! - **EngineConfig**: the immutable configuration snapshot
//! - **RelationFact**: static relations between guard kinds
//!
//! ## Example
//!
//! ```rust
//! use guards_core::{DeclarationBuilder, PrimitiveType, ValueType};
//!
//! let source = DeclarationBuilder::new("NotNegative", ValueType::Primitive(PrimitiveType::Int64))
//!     .parameter("Account::withdraw", 0)
//!     .build();
//!
//! assert_eq!(source.kind, "NotNegative");
//! ```

pub mod builder;
pub mod config;
pub mod declaration;
pub mod error;
pub mod relation;
pub mod types;
pub mod value;

pub use builder::*;
pub use config::*;
pub use declaration::*;
pub use error::*;
pub use relation::*;
pub use types::*;
pub use value::*;
