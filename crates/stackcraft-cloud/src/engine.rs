//! Orchestration engine trait definition

use crate::error::Result;
use crate::resource::{ResourceRef, ResourceRequest};
use async_trait::async_trait;

/// Resource orchestration engine
///
/// The engine owns dependency resolution, diffing and reconciliation.
/// Resource modules only hand it registration requests, one at a time,
/// in dependency order.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Returns the engine name (e.g., "recording")
    fn name(&self) -> &str;

    /// Register a single resource and return a handle to it
    async fn register_resource(&self, request: ResourceRequest) -> Result<ResourceRef>;
}
