//! Cloud provider trait definition

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cloud provider abstraction trait
///
/// Every provider package (Cloudflare, AWS, GCP, Azure, Kubernetes)
/// implements this trait so the context can register it as a provider
/// resource and the CLI can check its credentials.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Returns the provider package name (e.g., "cloudflare", "aws")
    fn name(&self) -> &str;

    /// Returns the provider display name for UI
    fn display_name(&self) -> &str;

    /// Provider resource arguments, with secrets already redacted
    fn provider_args(&self) -> Value;

    /// Check if the provider is properly configured and authenticated
    async fn check_auth(&self) -> Result<AuthStatus>;
}

/// Outcome of a provider credential check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuthStatus {
    /// The provider accepted the credentials; `identity` names who they belong to
    Authenticated { identity: String },
    /// Missing or rejected credentials
    Rejected { reason: String },
}

impl AuthStatus {
    pub fn ok(identity: impl Into<String>) -> Self {
        Self::Authenticated {
            identity: identity.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    pub fn identity(&self) -> Option<&str> {
        match self {
            Self::Authenticated { identity } => Some(identity),
            Self::Rejected { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Authenticated { .. } => None,
            Self::Rejected { reason } => Some(reason),
        }
    }
}

impl std::fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authenticated { identity } => write!(f, "authenticated as {}", identity),
            Self::Rejected { reason } => write!(f, "not authenticated: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_status_accessors() {
        let ok = AuthStatus::ok("user@example.com");
        assert!(ok.is_authenticated());
        assert_eq!(ok.identity(), Some("user@example.com"));
        assert_eq!(ok.reason(), None);
        assert_eq!(ok.to_string(), "authenticated as user@example.com");

        let failed = AuthStatus::failed("token expired");
        assert!(!failed.is_authenticated());
        assert_eq!(failed.identity(), None);
        assert_eq!(failed.to_string(), "not authenticated: token expired");
    }

    #[test]
    fn test_auth_status_json_is_tagged() {
        let json = serde_json::to_value(AuthStatus::failed("no token")).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "rejected", "reason": "no token" }));
    }
}
