//! Stackcraft resource orchestration seam
//!
//! This crate is the boundary between resource modules and the engine that
//! actually reconciles cloud resources. Modules never talk to cloud APIs:
//! they hand typed arguments to a [`Context`], which forwards them to an
//! [`Engine`] one registration at a time.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 stackcraft CLI                   │
//! │          (stackcraft preview / up / ...)         │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               stackcraft-cloud                   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  Context: register / export / warn        │   │
//! │  └──────────────────┬───────────────────────┘   │
//! │  ┌──────────────────▼───────┐ ┌─────────────┐   │
//! │  │  trait Engine            │ │ Plan, State │   │
//! │  └──────────────────────────┘ └─────────────┘   │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │  cloudflare   │ │ aws, gcp, ... │
//! │    modules    │ │    modules    │
//! └───────────────┘ └───────────────┘
//! ```

pub mod context;
pub mod engine;
pub mod error;
pub mod output;
pub mod plan;
pub mod provider;
pub mod recording;
pub mod resource;
pub mod state;

// Re-exports
pub use context::{Context, RunResult};
pub use engine::Engine;
pub use error::{CloudError, Result, ResultExt};
pub use output::OutputMap;
pub use plan::{Action, ActionType, Plan, PlanSummary};
pub use provider::{AuthStatus, CloudProvider};
pub use recording::RecordingEngine;
pub use resource::{
    ProviderRef, REDACTED, ResourceOptions, ResourceRef, ResourceRequest, redact, urn,
};
pub use state::{DEFAULT_STATE_DIR, ResourceState, StackState, StateLock, StateManager};
