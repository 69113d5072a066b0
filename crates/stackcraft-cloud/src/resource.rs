//! Resource registration types exchanged with an [`Engine`](crate::Engine)

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder written over secret argument values before they leave the engine
pub const REDACTED: &str = "[secret]";

/// Builds the stable identifier of a resource within a stack
pub fn urn(stack: &str, project: &str, type_token: &str, name: &str) -> String {
    format!("urn:stackcraft:{}::{}::{}::{}", stack, project, type_token, name)
}

/// A request to create (or adopt) one resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRequest {
    pub urn: String,

    /// Provider type token, e.g. `cloudflare:index/r2Bucket:R2Bucket`
    pub type_token: String,

    /// Logical name, unique per type within a stack
    pub name: String,

    /// Provider arguments
    pub args: Value,

    pub options: ResourceOptions,
}

/// Options that attach a resource to its provider and its dependencies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceOptions {
    /// Explicit provider, absent means the engine default for the package
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderRef>,

    /// URN of the parent resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    /// URNs this resource must be created after
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    /// JSON pointers into `args` whose values must never be persisted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<String>,
}

impl ResourceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider(mut self, provider: &ProviderRef) -> Self {
        self.provider = Some(provider.clone());
        self
    }

    pub fn parent(mut self, parent: &ResourceRef) -> Self {
        self.parent = Some(parent.urn.clone());
        self
    }

    pub fn depends_on(mut self, resource: &ResourceRef) -> Self {
        self.depends_on.push(resource.urn.clone());
        self
    }

    pub fn secret(mut self, pointer: impl Into<String>) -> Self {
        self.secrets.push(pointer.into());
        self
    }
}

/// Handle to a registered provider resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRef {
    pub urn: String,
    pub id: String,

    /// Provider package, e.g. `cloudflare`
    pub package: String,
}

impl ProviderRef {
    /// Reference string in the form `{urn}::{id}`
    pub fn reference(&self) -> String {
        format!("{}::{}", self.urn, self.id)
    }
}

/// Handle to a registered resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub urn: String,
    pub id: String,
    pub type_token: String,
    pub name: String,

    /// Arguments as registered, with secrets redacted
    pub args: Value,

    /// Outputs the engine knows at registration time
    #[serde(default)]
    pub outputs: Value,

    #[serde(default)]
    pub options: ResourceOptions,
}

impl ResourceRef {
    /// An output value, `Null` when the engine only learns it after apply
    pub fn output(&self, key: &str) -> Value {
        self.outputs.get(key).cloned().unwrap_or(Value::Null)
    }

    pub fn output_str(&self, key: &str) -> Option<&str> {
        self.outputs.get(key).and_then(Value::as_str)
    }
}

/// Returns a copy of `args` with every pointer in `secrets` replaced by [`REDACTED`]
pub fn redact(args: &Value, secrets: &[String]) -> Value {
    let mut redacted = args.clone();
    for pointer in secrets {
        if let Some(slot) = redacted.pointer_mut(pointer) {
            *slot = Value::String(REDACTED.to_string());
        }
    }
    redacted
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_urn_format() {
        assert_eq!(
            urn("dev", "web", "cloudflare:index/r2Bucket:R2Bucket", "bucket"),
            "urn:stackcraft:dev::web::cloudflare:index/r2Bucket:R2Bucket::bucket"
        );
    }

    #[test]
    fn test_redact_nested_secret() {
        let args = json!({
            "metadata": { "name": "token" },
            "stringData": { "apiKey": "abc123" }
        });
        let redacted = redact(&args, &["/stringData/apiKey".to_string(), "/missing".to_string()]);

        assert_eq!(redacted["stringData"]["apiKey"], REDACTED);
        assert_eq!(redacted["metadata"]["name"], "token");
    }

    #[test]
    fn test_unknown_output_is_null() {
        let resource = ResourceRef {
            urn: "urn".into(),
            id: "zone".into(),
            type_token: "aws-native:route53:HostedZone".into(),
            name: "zone".into(),
            args: json!({}),
            outputs: json!({ "name": "example.com" }),
            options: ResourceOptions::new(),
        };

        assert_eq!(resource.output("nameServers"), Value::Null);
        assert_eq!(resource.output_str("name"), Some("example.com"));
    }
}
