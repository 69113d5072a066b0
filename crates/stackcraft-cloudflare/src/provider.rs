//! Cloudflare provider factory
//!
//! Credentials come from the stack input's `providerConfig`, or from
//! `CLOUDFLARE_API_TOKEN` when the input carries none.

use crate::error::{CloudflareError, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use stackcraft_cloud::{AuthStatus, CloudError, CloudProvider, REDACTED};
use std::sync::LazyLock;

const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

static API_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{40}$").expect("valid api token pattern"));
static API_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{37}$").expect("valid api key pattern"));

/// `providerConfig` for Cloudflare kinds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudflareProviderConfig {
    #[serde(default)]
    pub api_token: Option<String>,

    /// Global API key, used together with `email`
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Credentials {
    /// Whatever the engine finds in its environment
    Environment,
    ApiToken(String),
    ApiKey { key: String, email: String },
}

/// Cloudflare provider
pub struct CloudflareProvider {
    credentials: Credentials,
    client: reqwest::Client,
}

impl CloudflareProvider {
    /// Validate explicit credentials, or fall back to the environment
    pub fn from_config(config: Option<&CloudflareProviderConfig>) -> stackcraft_cloud::Result<Self> {
        let credentials = match config {
            None => Credentials::Environment,
            Some(config) => Self::credentials(config)?,
        };
        Ok(Self {
            credentials,
            client: reqwest::Client::new(),
        })
    }

    /// Provider built from `CLOUDFLARE_API_TOKEN`
    pub fn from_env() -> stackcraft_cloud::Result<Self> {
        let config = std::env::var("CLOUDFLARE_API_TOKEN")
            .ok()
            .map(|token| CloudflareProviderConfig {
                api_token: Some(token),
                ..Default::default()
            });
        Self::from_config(config.as_ref())
    }

    fn credentials(config: &CloudflareProviderConfig) -> stackcraft_cloud::Result<Credentials> {
        let invalid = |message: &str| CloudError::provider("cloudflare", message);

        match (&config.api_token, &config.api_key, &config.email) {
            (Some(token), None, _) => {
                if !API_TOKEN.is_match(token) {
                    return Err(invalid("api_token must be 40 characters of [A-Za-z0-9_-]"));
                }
                Ok(Credentials::ApiToken(token.clone()))
            }
            (None, Some(key), Some(email)) => {
                if !API_KEY.is_match(key) {
                    return Err(invalid("api_key must be 37 lower-case hexadecimal characters"));
                }
                if !email.contains('@') {
                    return Err(invalid("email must be a valid address"));
                }
                Ok(Credentials::ApiKey {
                    key: key.clone(),
                    email: email.clone(),
                })
            }
            (None, Some(_), None) => Err(invalid("api_key requires email")),
            (Some(_), Some(_), _) => Err(invalid("set either api_token or api_key, not both")),
            (None, None, _) => Err(invalid("api_token or api_key is required")),
        }
    }

    fn env_token() -> Option<String> {
        std::env::var("CLOUDFLARE_API_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
    }

    async fn verify_token(&self, token: &str) -> Result<String> {
        let url = format!("{}/user/tokens/verify", CLOUDFLARE_API_BASE);
        tracing::debug!("verifying Cloudflare API token");
        let response = self.client.get(&url).bearer_auth(token).send().await?;
        let api_response: ApiResponse<TokenVerification> = response.json().await?;

        let result = api_response.into_result()?;
        Ok(format!("token {} ({})", result.id, result.status))
    }

    async fn verify_key(&self, key: &str, email: &str) -> Result<String> {
        let url = format!("{}/user", CLOUDFLARE_API_BASE);
        let response = self
            .client
            .get(&url)
            .header("X-Auth-Email", email)
            .header("X-Auth-Key", key)
            .send()
            .await?;
        let api_response: ApiResponse<ApiUser> = response.json().await?;

        Ok(api_response.into_result()?.email)
    }
}

#[async_trait]
impl CloudProvider for CloudflareProvider {
    fn name(&self) -> &str {
        "cloudflare"
    }

    fn display_name(&self) -> &str {
        "Cloudflare"
    }

    fn provider_args(&self) -> Value {
        match &self.credentials {
            Credentials::Environment => json!({}),
            Credentials::ApiToken(_) => json!({ "apiToken": REDACTED }),
            Credentials::ApiKey { email, .. } => json!({ "apiKey": REDACTED, "email": email }),
        }
    }

    async fn check_auth(&self) -> stackcraft_cloud::Result<AuthStatus> {
        let verified = match &self.credentials {
            Credentials::ApiToken(token) => self.verify_token(token).await,
            Credentials::ApiKey { key, email } => self.verify_key(key, email).await,
            Credentials::Environment => match Self::env_token() {
                Some(token) => self.verify_token(&token).await,
                None => return Ok(AuthStatus::failed("CLOUDFLARE_API_TOKEN is not set")),
            },
        };

        match verified {
            Ok(info) => Ok(AuthStatus::ok(info)),
            Err(e) => Ok(AuthStatus::failed(e.to_string())),
        }
    }
}

// API response types

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    result: Option<T>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T> {
        if !self.success {
            let error_msg = self
                .errors
                .first()
                .map(|e| format!("{} (code {})", e.message, e.code))
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(CloudflareError::ApiError(error_msg));
        }
        self.result
            .ok_or_else(|| CloudflareError::ApiError("empty result".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: i32,
    message: String,
}

#[derive(Debug, Deserialize)]
struct TokenVerification {
    id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    email: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const TOKEN: &str = "abcdefghijklmnopqrstuvwxyz0123456789_-AB";

    #[test]
    fn test_absent_config_uses_environment() {
        let provider = CloudflareProvider::from_config(None).unwrap();
        assert_eq!(provider.credentials, Credentials::Environment);
        assert_eq!(provider.provider_args(), json!({}));
    }

    #[test]
    fn test_api_token_is_redacted() {
        let config = CloudflareProviderConfig {
            api_token: Some(TOKEN.into()),
            ..Default::default()
        };
        let provider = CloudflareProvider::from_config(Some(&config)).unwrap();

        assert_eq!(provider.provider_args(), json!({ "apiToken": "[secret]" }));
        assert!(!provider.provider_args().to_string().contains(TOKEN));
    }

    #[test]
    fn test_api_key_requires_email() {
        let config = CloudflareProviderConfig {
            api_key: Some("0123456789abcdef0123456789abcdef01234".into()),
            ..Default::default()
        };
        let err = CloudflareProvider::from_config(Some(&config)).err().unwrap();
        assert!(matches!(err, CloudError::ProviderInitialization { .. }));

        let config = CloudflareProviderConfig {
            email: Some("ops@example.com".into()),
            ..config
        };
        let provider = CloudflareProvider::from_config(Some(&config)).unwrap();
        assert_eq!(
            provider.provider_args(),
            json!({ "apiKey": "[secret]", "email": "ops@example.com" })
        );
    }

    #[test]
    fn test_malformed_token() {
        let config = CloudflareProviderConfig {
            api_token: Some("too-short".into()),
            ..Default::default()
        };
        let err = CloudflareProvider::from_config(Some(&config)).err().unwrap();
        assert!(err.to_string().starts_with("failed to create cloudflare provider"));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        temp_env::with_var("CLOUDFLARE_API_TOKEN", Some(TOKEN), || {
            let provider = CloudflareProvider::from_env().unwrap();
            assert_eq!(provider.credentials, Credentials::ApiToken(TOKEN.into()));
        });
        temp_env::with_var_unset("CLOUDFLARE_API_TOKEN", || {
            let provider = CloudflareProvider::from_env().unwrap();
            assert_eq!(provider.credentials, Credentials::Environment);
        });
    }

    #[tokio::test]
    #[serial]
    async fn test_check_auth_without_token() {
        unsafe {
            std::env::remove_var("CLOUDFLARE_API_TOKEN");
        }
        let provider = CloudflareProvider::from_config(None).unwrap();
        let status = provider.check_auth().await.unwrap();

        assert!(!status.is_authenticated());
        assert_eq!(status.reason(), Some("CLOUDFLARE_API_TOKEN is not set"));
    }

    #[test]
    fn test_api_response_error() {
        let response: ApiResponse<TokenVerification> = serde_json::from_str(
            r#"{"success": false, "result": null, "errors": [{"code": 1000, "message": "Invalid API Token"}]}"#,
        )
        .unwrap();
        let err = response.into_result().unwrap_err();
        assert_eq!(err.to_string(), "Cloudflare API error: Invalid API Token (code 1000)");
    }
}
