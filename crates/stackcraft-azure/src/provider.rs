//! Azure provider factory
//!
//! A service principal (`clientId`, `clientSecret`, `tenantId`,
//! `subscriptionId`) from `providerConfig`, or the `ARM_*` variables the
//! provider reads itself when the input carries none.

use crate::error::{AzureError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use stackcraft_cloud::{AuthStatus, CloudError, CloudProvider, REDACTED};
use std::fmt;

const LOGIN_BASE: &str = "https://login.microsoftonline.com";
const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

/// `providerConfig` for Azure kinds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AzureProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
    pub subscription_id: String,
}

impl AzureProviderConfig {
    fn from_env() -> Option<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Some(Self {
            client_id: var("ARM_CLIENT_ID")?,
            client_secret: var("ARM_CLIENT_SECRET")?,
            tenant_id: var("ARM_TENANT_ID")?,
            subscription_id: var("ARM_SUBSCRIPTION_ID")?,
        })
    }
}

/// Azure provider
pub struct AzureProvider {
    principal: Option<AzureProviderConfig>,
    client: reqwest::Client,
}

impl fmt::Debug for AzureProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureProvider")
            .field("client_id", &self.principal.as_ref().map(|p| p.client_id.as_str()))
            .field("tenant_id", &self.principal.as_ref().map(|p| p.tenant_id.as_str()))
            .field("subscription_id", &self.subscription_id())
            .finish_non_exhaustive()
    }
}

impl AzureProvider {
    pub fn from_config(config: Option<&AzureProviderConfig>) -> stackcraft_cloud::Result<Self> {
        if let Some(config) = config {
            let fields = [
                ("client_id", &config.client_id),
                ("client_secret", &config.client_secret),
                ("tenant_id", &config.tenant_id),
                ("subscription_id", &config.subscription_id),
            ];
            for (field, value) in fields {
                if value.trim().is_empty() {
                    return Err(CloudError::provider("azure", format!("{} is required", field)));
                }
            }
        }

        Ok(Self {
            principal: config.cloned(),
            client: reqwest::Client::new(),
        })
    }

    /// Provider built from `ARM_CLIENT_ID`, `ARM_CLIENT_SECRET`,
    /// `ARM_TENANT_ID` and `ARM_SUBSCRIPTION_ID`
    pub fn from_env() -> stackcraft_cloud::Result<Self> {
        Self::from_config(AzureProviderConfig::from_env().as_ref())
    }

    pub fn subscription_id(&self) -> Option<&str> {
        self.principal.as_ref().map(|p| p.subscription_id.as_str())
    }

    /// Client-credentials grant against Azure AD
    async fn request_token(&self, principal: &AzureProviderConfig) -> Result<()> {
        let url = format!("{}/{}/oauth2/v2.0/token", LOGIN_BASE, principal.tenant_id);
        tracing::debug!(tenant = %principal.tenant_id, "requesting Azure AD token");
        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", principal.client_id.as_str()),
                ("client_secret", principal.client_secret.as_str()),
                ("scope", MANAGEMENT_SCOPE),
            ])
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }

        let body: TokenErrorResponse = response.json().await?;
        Err(AzureError::TokenError(body.error_description.unwrap_or(body.error)))
    }
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[async_trait]
impl CloudProvider for AzureProvider {
    fn name(&self) -> &str {
        "azure"
    }

    fn display_name(&self) -> &str {
        "Azure"
    }

    fn provider_args(&self) -> Value {
        match &self.principal {
            Some(p) => json!({
                "clientId": p.client_id,
                "clientSecret": REDACTED,
                "tenantId": p.tenant_id,
                "subscriptionId": p.subscription_id,
            }),
            None => json!({}),
        }
    }

    async fn check_auth(&self) -> stackcraft_cloud::Result<AuthStatus> {
        let principal = match self.principal.clone().or_else(AzureProviderConfig::from_env) {
            Some(principal) => principal,
            None => {
                return Ok(AuthStatus::failed(
                    "ARM_CLIENT_ID, ARM_CLIENT_SECRET, ARM_TENANT_ID and ARM_SUBSCRIPTION_ID must be set",
                ));
            }
        };

        match self.request_token(&principal).await {
            Ok(()) => Ok(AuthStatus::ok(format!(
                "{} (subscription {})",
                principal.client_id, principal.subscription_id
            ))),
            Err(e) => Ok(AuthStatus::failed(e.to_string())),
        }
    }
}
