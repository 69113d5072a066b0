use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identity of a resource, shared by every kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudResourceMetadata {
    pub name: String,

    /// Stable id assigned by the control plane
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub org: String,

    #[serde(default)]
    pub env: String,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// A resource of some kind with its typed spec
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudResource<S> {
    #[serde(default)]
    pub api_version: String,

    pub kind: String,

    pub metadata: CloudResourceMetadata,

    pub spec: S,
}

/// The payload a module is invoked with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackInput<S, P> {
    pub target: CloudResource<S>,

    /// Provider credentials; absent means use the environment
    #[serde(alias = "provider_config")]
    pub provider_config: Option<P>,
}

impl<S, P> StackInput<S, P> {
    pub fn metadata(&self) -> &CloudResourceMetadata {
        &self.target.metadata
    }

    pub fn spec(&self) -> &S {
        &self.target.spec
    }
}
