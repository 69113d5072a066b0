//! In-memory engine that records registrations
//!
//! Used for previews, for `stackcraft up` (which persists the recorded
//! registrations as stack state) and in tests.

use crate::engine::Engine;
use crate::error::{CloudError, Result};
use crate::resource::{ResourceRef, ResourceRequest, redact};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;

/// Engine that keeps every registration in order
#[derive(Debug, Default)]
pub struct RecordingEngine {
    registrations: Mutex<Vec<ResourceRef>>,
    fail_on: Option<String>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that rejects every registration of `type_token`
    pub fn failing_on(type_token: impl Into<String>) -> Self {
        Self {
            registrations: Mutex::new(Vec::new()),
            fail_on: Some(type_token.into()),
        }
    }

    /// All registrations so far, in order
    pub fn registrations(&self) -> Vec<ResourceRef> {
        self.lock().clone()
    }

    pub fn by_type(&self, type_token: &str) -> Vec<ResourceRef> {
        self.lock()
            .iter()
            .filter(|r| r.type_token == type_token)
            .cloned()
            .collect()
    }

    pub fn find(&self, type_token: &str, name: &str) -> Option<ResourceRef> {
        self.lock()
            .iter()
            .find(|r| r.type_token == type_token && r.name == name)
            .cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ResourceRef>> {
        self.registrations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Physical id: the name handed to the provider, else the logical name
fn physical_id(request: &ResourceRequest) -> String {
    ["/name", "/bucket", "/metadata/name"]
        .iter()
        .filter_map(|pointer| request.args.pointer(pointer).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .unwrap_or(request.name.as_str())
        .to_string()
}

#[async_trait]
impl Engine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    async fn register_resource(&self, request: ResourceRequest) -> Result<ResourceRef> {
        if self.fail_on.as_deref() == Some(request.type_token.as_str()) {
            return Err(CloudError::ResourceRegistration {
                type_token: request.type_token,
                name: request.name,
                message: "rejected by engine".to_string(),
            });
        }

        let mut registrations = self.lock();
        if registrations.iter().any(|r| r.urn == request.urn) {
            return Err(CloudError::DuplicateResource(request.urn));
        }

        let args = redact(&request.args, &request.options.secrets);
        let resource = ResourceRef {
            id: physical_id(&request),
            outputs: args.clone(),
            args,
            urn: request.urn,
            type_token: request.type_token,
            name: request.name,
            options: request.options,
        };

        registrations.push(resource.clone());
        Ok(resource)
    }
}
