//! `CloudflareR2Bucket`: an R2 bucket with optional public and custom domains

use crate::error::{CloudflareError, Result};
use crate::provider::{CloudflareProvider, CloudflareProviderConfig};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use stackcraft_cloud::{Context, ResourceOptions, ResultExt};
use stackcraft_core::validate::{self, Validate};
use stackcraft_core::{CloudResourceKind, ResourceModule, StackInput, labels};
use std::collections::BTreeMap;
use std::sync::LazyLock;

const R2_BUCKET: &str = "cloudflare:index/r2Bucket:R2Bucket";
const R2_MANAGED_DOMAIN: &str = "cloudflare:index/r2ManagedDomain:R2ManagedDomain";
const R2_CUSTOM_DOMAIN: &str = "cloudflare:index/r2CustomDomain:R2CustomDomain";

static BUCKET_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*[a-z0-9]$").expect("valid bucket name pattern"));

/// Jurisdiction hint for where R2 stores the bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CloudflareR2Location {
    Apac,
    Eeur,
    Enam,
    Weur,
    Wnam,
    Oc,
    #[default]
    #[serde(other)]
    Unspecified,
}

impl CloudflareR2Location {
    /// Literal passed to the provider; `auto` lets Cloudflare choose
    pub fn as_provider_str(&self) -> &'static str {
        match self {
            CloudflareR2Location::Unspecified => "auto",
            CloudflareR2Location::Apac => "APAC",
            CloudflareR2Location::Eeur => "EEUR",
            CloudflareR2Location::Enam => "ENAM",
            CloudflareR2Location::Weur => "WEUR",
            CloudflareR2Location::Wnam => "WNAM",
            CloudflareR2Location::Oc => "OC",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CloudflareR2CustomDomain {
    pub enabled: bool,
    pub zone_id: String,
    pub domain: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CloudflareR2BucketSpec {
    pub bucket_name: String,
    pub account_id: String,
    pub location: CloudflareR2Location,

    /// Expose the bucket on its `r2.dev` managed domain
    pub public_access: bool,

    /// R2 has no object versioning; setting this only produces a warning
    pub versioning_enabled: bool,

    pub custom_domain: Option<CloudflareR2CustomDomain>,
}

impl Validate for CloudflareR2BucketSpec {
    fn validate(&self) -> stackcraft_core::Result<()> {
        validate::require("spec.bucket_name", &self.bucket_name)?;
        validate::length_between("spec.bucket_name", &self.bucket_name, 3, 63)?;
        validate::matches(
            "spec.bucket_name",
            &self.bucket_name,
            &BUCKET_NAME,
            "lower-case letters, digits and hyphens",
        )?;
        validate::hex_id("spec.account_id", &self.account_id)?;

        if let Some(domain) = self.custom_domain.as_ref().filter(|d| d.enabled) {
            validate::require("spec.custom_domain.zone_id", &domain.zone_id)?;
            validate::require("spec.custom_domain.domain", &domain.domain)?;
        }
        Ok(())
    }
}

/// Values derived from the input before anything is registered
#[derive(Debug, Clone, PartialEq)]
pub struct R2BucketLocals {
    pub labels: BTreeMap<String, String>,
    pub location: &'static str,
}

impl R2BucketLocals {
    pub fn new(input: &StackInput<CloudflareR2BucketSpec, CloudflareProviderConfig>) -> Self {
        Self {
            labels: labels::standard_labels(input.metadata(), CloudResourceKind::CloudflareR2Bucket),
            location: input.spec().location.as_provider_str(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct R2BucketArgs<'a> {
    account_id: &'a str,
    name: &'a str,
    location: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct R2ManagedDomainArgs<'a> {
    account_id: &'a str,
    bucket_name: &'a str,
    enabled: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct R2CustomDomainArgs<'a> {
    account_id: &'a str,
    bucket_name: &'a str,
    domain: &'a str,
    zone_id: &'a str,
    enabled: bool,
}

pub struct R2BucketModule;

#[async_trait]
impl ResourceModule for R2BucketModule {
    const KIND: CloudResourceKind = CloudResourceKind::CloudflareR2Bucket;
    type Spec = CloudflareR2BucketSpec;
    type ProviderConfig = CloudflareProviderConfig;
    type Error = CloudflareError;

    async fn resources(
        ctx: &mut Context,
        input: &StackInput<CloudflareR2BucketSpec, CloudflareProviderConfig>,
    ) -> Result<()> {
        let spec = input.spec();
        let locals = R2BucketLocals::new(input);

        let provider = CloudflareProvider::from_config(input.provider_config.as_ref())?;
        let provider = ctx.register_provider("cloudflare", &provider).await?;

        let bucket = ctx
            .register(
                R2_BUCKET,
                "bucket",
                &R2BucketArgs {
                    account_id: &spec.account_id,
                    name: &spec.bucket_name,
                    location: locals.location,
                },
                ResourceOptions::new().provider(&provider),
            )
            .await
            .with_context(|| format!("failed to create r2 bucket {}", spec.bucket_name))?;

        if spec.public_access {
            ctx.register(
                R2_MANAGED_DOMAIN,
                "managed-domain",
                &R2ManagedDomainArgs {
                    account_id: &spec.account_id,
                    bucket_name: &bucket.id,
                    enabled: true,
                },
                ResourceOptions::new().provider(&provider).depends_on(&bucket),
            )
            .await
            .with_context(|| format!("failed to enable public access for {}", spec.bucket_name))?;
        }

        let custom_domain = spec.custom_domain.as_ref().filter(|d| d.enabled);
        if let Some(domain) = custom_domain {
            ctx.register(
                R2_CUSTOM_DOMAIN,
                "custom-domain",
                &R2CustomDomainArgs {
                    account_id: &spec.account_id,
                    bucket_name: &bucket.id,
                    domain: &domain.domain,
                    zone_id: &domain.zone_id,
                    enabled: true,
                },
                ResourceOptions::new().provider(&provider).depends_on(&bucket),
            )
            .await
            .with_context(|| format!("failed to attach custom domain {}", domain.domain))?;
        }

        if spec.versioning_enabled {
            ctx.warn(format!(
                "versioning is not supported for R2 buckets; ignoring versioning_enabled on {}",
                spec.bucket_name
            ));
        }

        ctx.export("bucket_name", bucket.output("name"))?;
        if let Some(domain) = custom_domain {
            ctx.export("custom_domain_url", format!("https://{}", domain.domain))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stackcraft_cloud::{CloudError, RecordingEngine, RunResult};
    use stackcraft_core::{InputFormat, RawStackInput, StackInputError, run_module};
    use std::sync::Arc;

    const ACCOUNT: &str = "00000000000000000000000000000000";

    async fn provision(yaml: &str) -> (Arc<RecordingEngine>, Result<RunResult>) {
        let raw = RawStackInput::parse(yaml, InputFormat::Yaml).unwrap();
        let engine = Arc::new(RecordingEngine::new());
        let mut ctx = Context::new(engine.clone(), "test", "dev");
        let result = run_module::<R2BucketModule>(&mut ctx, raw)
            .await
            .map(|_| ctx.finish());
        (engine, result)
    }

    fn input(spec: &str) -> String {
        format!(
            "target:\n  kind: CloudflareR2Bucket\n  metadata:\n    name: assets\n  spec:\n{}",
            spec
        )
    }

    #[test]
    fn test_location_literals() {
        assert_eq!(CloudflareR2Location::Weur.as_provider_str(), "WEUR");
        assert_eq!(CloudflareR2Location::Unspecified.as_provider_str(), "auto");

        let parsed: CloudflareR2Location = serde_json::from_value(json!("OC")).unwrap();
        assert_eq!(parsed, CloudflareR2Location::Oc);
        let unknown: CloudflareR2Location = serde_json::from_value(json!("MARS")).unwrap();
        assert_eq!(unknown, CloudflareR2Location::Unspecified);
    }

    #[tokio::test]
    async fn test_minimal_bucket() {
        let yaml = input(&format!(
            "    bucketName: test-bucket\n    accountId: \"{}\"\n    location: WEUR\n",
            ACCOUNT
        ));
        let (engine, result) = provision(&yaml).await;
        let result = result.unwrap();

        let bucket = engine.find(R2_BUCKET, "bucket").unwrap();
        assert_eq!(bucket.args["location"], "WEUR");
        assert_eq!(bucket.args["name"], "test-bucket");
        assert_eq!(bucket.args["accountId"], ACCOUNT);
        assert!(bucket.options.provider.is_some());

        assert_eq!(result.outputs.get_str("bucket_name"), Some("test-bucket"));
        assert!(!result.outputs.contains_key("custom_domain_url"));
        assert!(engine.by_type(R2_MANAGED_DOMAIN).is_empty());
        assert!(engine.by_type(R2_CUSTOM_DOMAIN).is_empty());
    }

    #[tokio::test]
    async fn test_unspecified_location_is_auto() {
        let yaml = input(&format!("    bucketName: test-bucket\n    accountId: \"{}\"\n", ACCOUNT));
        let (engine, result) = provision(&yaml).await;
        result.unwrap();

        assert_eq!(engine.find(R2_BUCKET, "bucket").unwrap().args["location"], "auto");
    }

    #[tokio::test]
    async fn test_public_and_custom_domain() {
        let yaml = input(&format!(
            "    bucketName: media\n    accountId: \"{}\"\n    publicAccess: true\n    customDomain:\n      enabled: true\n      zoneId: zone-1\n      domain: media.example.com\n",
            ACCOUNT
        ));
        let (engine, result) = provision(&yaml).await;
        let result = result.unwrap();

        let managed = engine.find(R2_MANAGED_DOMAIN, "managed-domain").unwrap();
        assert_eq!(managed.args["bucketName"], "media");
        assert_eq!(managed.args["enabled"], true);

        let custom = engine.find(R2_CUSTOM_DOMAIN, "custom-domain").unwrap();
        assert_eq!(custom.args["zoneId"], "zone-1");
        assert_eq!(custom.args["domain"], "media.example.com");

        assert_eq!(
            result.outputs.get_str("custom_domain_url"),
            Some("https://media.example.com")
        );
    }

    #[tokio::test]
    async fn test_disabled_custom_domain_skips_registration() {
        let yaml = input(&format!(
            "    bucketName: media\n    accountId: \"{}\"\n    customDomain:\n      enabled: false\n",
            ACCOUNT
        ));
        let (engine, result) = provision(&yaml).await;
        result.unwrap();
        assert!(engine.by_type(R2_CUSTOM_DOMAIN).is_empty());
    }

    #[tokio::test]
    async fn test_versioning_warns() {
        let yaml = input(&format!(
            "    bucketName: media\n    accountId: \"{}\"\n    versioningEnabled: true\n",
            ACCOUNT
        ));
        let (_, result) = provision(&yaml).await;
        let result = result.unwrap();

        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("versioning is not supported"));
    }

    #[tokio::test]
    async fn test_invalid_specs_register_nothing() {
        let cases = [
            format!("    bucketName: ab\n    accountId: \"{}\"\n", ACCOUNT),
            format!("    bucketName: Test_Bucket\n    accountId: \"{}\"\n", ACCOUNT),
            "    bucketName: test-bucket\n    accountId: \"123\"\n".to_string(),
            "    bucketName: test-bucket\n    accountId: ZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZ\n".to_string(),
            format!("    accountId: \"{}\"\n", ACCOUNT),
            format!(
                "    bucketName: media\n    accountId: \"{}\"\n    customDomain:\n      enabled: true\n      domain: media.example.com\n",
                ACCOUNT
            ),
        ];

        for spec in cases {
            let (engine, result) = provision(&input(&spec)).await;
            assert!(
                matches!(
                    result,
                    Err(CloudflareError::Input(StackInputError::Validation { .. }))
                ),
                "expected validation error for {}",
                spec
            );
            assert!(engine.registrations().is_empty());
        }
    }

    #[tokio::test]
    async fn test_failure_is_wrapped_and_aborts() {
        let yaml = input(&format!(
            "    bucketName: media\n    accountId: \"{}\"\n    publicAccess: true\n",
            ACCOUNT
        ));
        let raw = RawStackInput::parse(&yaml, InputFormat::Yaml).unwrap();
        let engine = Arc::new(RecordingEngine::failing_on(R2_BUCKET));
        let mut ctx = Context::new(engine.clone(), "test", "dev");

        let err = run_module::<R2BucketModule>(&mut ctx, raw).await.unwrap_err();
        let CloudflareError::Cloud(err) = err else {
            panic!("expected cloud error, got {err:?}");
        };
        assert!(err.to_string().starts_with("failed to create r2 bucket media"));
        assert!(matches!(err.root_cause(), CloudError::ResourceRegistration { .. }));
        assert!(engine.by_type(R2_MANAGED_DOMAIN).is_empty());
        assert!(ctx.outputs().is_empty());
    }
}
