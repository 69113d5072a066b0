//! Resource model
//!
//! Every stack input wraps one [`CloudResource`] (metadata plus a
//! kind-specific spec) and an optional provider configuration.

mod dns;
mod kind;
mod resource;

// Re-exports
pub use dns::*;
pub use kind::*;
pub use resource::*;
