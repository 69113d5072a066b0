//! Stackcraft core
//!
//! The typed resource model and everything a resource module derives from
//! it before touching a provider:
//!
//! - [`loader`]: reads a YAML/JSON stack input and types it per kind
//! - [`validate`]: schema-level rules for specs
//! - [`labels`] and [`naming`]: pure locals helpers
//! - [`module`]: the [`ResourceModule`] harness every kind implements

pub mod error;
pub mod labels;
pub mod loader;
pub mod model;
pub mod module;
pub mod naming;
pub mod validate;

// Re-exports
pub use error::{Result, StackInputError};
pub use loader::{InputFormat, RawStackInput};
pub use model::*;
pub use module::{ResourceModule, run_module};
pub use naming::{NameRules, sanitize_name};
pub use validate::Validate;
