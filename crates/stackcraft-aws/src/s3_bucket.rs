//! `AwsS3Bucket`: a private-by-default bucket and its configuration resources

use crate::error::{AwsError, Result};
use crate::provider::{AwsProvider, AwsProviderConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stackcraft_cloud::{Context, ResourceOptions, ResultExt};
use stackcraft_core::validate::{self, Validate};
use stackcraft_core::{CloudResourceKind, ResourceModule, StackInput, labels};
use std::collections::BTreeMap;

const BUCKET: &str = "aws:s3/bucketV2:BucketV2";
const VERSIONING: &str = "aws:s3/bucketVersioningV2:BucketVersioningV2";
const ENCRYPTION: &str =
    "aws:s3/bucketServerSideEncryptionConfigurationV2:BucketServerSideEncryptionConfigurationV2";
const PUBLIC_ACCESS_BLOCK: &str = "aws:s3/bucketPublicAccessBlock:BucketPublicAccessBlock";
const OWNERSHIP_CONTROLS: &str = "aws:s3/bucketOwnershipControls:BucketOwnershipControls";
const LIFECYCLE: &str = "aws:s3/bucketLifecycleConfigurationV2:BucketLifecycleConfigurationV2";
const LOGGING: &str = "aws:s3/bucketLoggingV2:BucketLoggingV2";
const CORS: &str = "aws:s3/bucketCorsConfigurationV2:BucketCorsConfigurationV2";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EncryptionType {
    SseS3,
    SseKms,
    #[default]
    #[serde(other)]
    Unspecified,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageClass {
    Standard,
    StandardIa,
    OneZoneIa,
    IntelligentTiering,
    GlacierInstantRetrieval,
    GlacierFlexibleRetrieval,
    GlacierDeepArchive,
    #[default]
    #[serde(other)]
    Unspecified,
}

impl StorageClass {
    /// S3 API literal, `None` when unspecified
    pub fn as_provider_str(&self) -> Option<&'static str> {
        match self {
            StorageClass::Unspecified => None,
            StorageClass::Standard => Some("STANDARD"),
            StorageClass::StandardIa => Some("STANDARD_IA"),
            StorageClass::OneZoneIa => Some("ONEZONE_IA"),
            StorageClass::IntelligentTiering => Some("INTELLIGENT_TIERING"),
            StorageClass::GlacierInstantRetrieval => Some("GLACIER_IR"),
            StorageClass::GlacierFlexibleRetrieval => Some("GLACIER"),
            StorageClass::GlacierDeepArchive => Some("DEEP_ARCHIVE"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LifecycleRule {
    pub id: String,
    pub enabled: bool,
    pub prefix: String,
    pub transition_days: u32,
    pub transition_storage_class: StorageClass,
    pub expiration_days: u32,
    pub noncurrent_version_expiration_days: u32,
    pub abort_incomplete_multipart_upload_days: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReplicationConfig {
    pub enabled: bool,
    pub role_arn: String,
    pub destination_bucket_arn: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingConfig {
    pub enabled: bool,
    pub target_bucket: String,
    pub target_prefix: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CorsRule {
    pub allowed_methods: Vec<String>,
    pub allowed_origins: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub expose_headers: Vec<String>,
    pub max_age_seconds: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CorsConfig {
    pub cors_rules: Vec<CorsRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AwsS3BucketSpec {
    pub aws_region: String,
    pub force_destroy: bool,
    pub is_public: bool,
    pub versioning_enabled: bool,
    pub encryption_type: EncryptionType,
    pub kms_key_id: String,
    pub tags: BTreeMap<String, String>,
    pub lifecycle_rules: Vec<LifecycleRule>,
    pub replication: Option<ReplicationConfig>,
    pub logging: Option<LoggingConfig>,
    pub cors: Option<CorsConfig>,
}

impl Validate for AwsS3BucketSpec {
    fn validate(&self) -> stackcraft_core::Result<()> {
        validate::reject_if(
            self.encryption_type == EncryptionType::SseKms && self.kms_key_id.trim().is_empty(),
            "spec.kms_key_id",
            "kms_key_id is required when encryption_type is SSE_KMS",
        )?;
        for (i, rule) in self.lifecycle_rules.iter().enumerate() {
            validate::reject_if(
                rule.id.trim().is_empty(),
                &format!("spec.lifecycle_rules[{}].id", i),
                "lifecycle rule id is required",
            )?;
        }
        if let Some(logging) = self.logging.as_ref().filter(|l| l.enabled) {
            validate::reject_if(
                logging.target_bucket.trim().is_empty(),
                "spec.logging.target_bucket",
                "logging target_bucket is required",
            )?;
        }
        if let Some(cors) = &self.cors {
            for (i, rule) in cors.cors_rules.iter().enumerate() {
                validate::reject_if(
                    rule.allowed_methods.is_empty() || rule.allowed_origins.is_empty(),
                    &format!("spec.cors.cors_rules[{}]", i),
                    "CORS rule must have at least one allowed method and origin",
                )?;
            }
        }
        Ok(())
    }
}

/// Values derived from the input before anything is registered
#[derive(Debug, Clone, PartialEq)]
pub struct S3BucketLocals {
    pub bucket_name: String,
    /// Standard labels overlaid with `spec.tags`
    pub tags: BTreeMap<String, String>,
}

impl S3BucketLocals {
    pub fn new(input: &StackInput<AwsS3BucketSpec, AwsProviderConfig>) -> Self {
        let standard = labels::standard_labels(input.metadata(), CloudResourceKind::AwsS3Bucket);
        Self {
            bucket_name: input.metadata().name.clone(),
            tags: labels::merge_labels(&standard, &input.spec().tags),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BucketArgs<'a> {
    bucket: &'a str,
    force_destroy: bool,
    tags: &'a BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VersioningArgs<'a> {
    bucket: &'a str,
    versioning_configuration: VersioningConfiguration,
}

#[derive(Debug, Serialize)]
struct VersioningConfiguration {
    status: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EncryptionByDefault<'a> {
    sse_algorithm: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kms_master_key_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EncryptionRule<'a> {
    apply_server_side_encryption_by_default: EncryptionByDefault<'a>,
    bucket_key_enabled: bool,
}

#[derive(Debug, Serialize)]
struct EncryptionArgs<'a> {
    bucket: &'a str,
    rules: Vec<EncryptionRule<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicAccessBlockArgs<'a> {
    bucket: &'a str,
    block_public_acls: bool,
    block_public_policy: bool,
    ignore_public_acls: bool,
    restrict_public_buckets: bool,
}

#[derive(Debug, Serialize)]
struct OwnershipControlsArgs<'a> {
    bucket: &'a str,
    rule: OwnershipRule,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OwnershipRule {
    object_ownership: &'static str,
}

#[derive(Debug, Serialize)]
struct LifecycleFilter<'a> {
    prefix: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LifecycleTransition {
    days: u32,
    storage_class: &'static str,
}

#[derive(Debug, Serialize)]
struct LifecycleExpiration {
    days: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NoncurrentVersionExpiration {
    noncurrent_days: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AbortIncompleteMultipartUpload {
    days_after_initiation: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LifecycleRuleArgs<'a> {
    id: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<LifecycleFilter<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    transitions: Vec<LifecycleTransition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expiration: Option<LifecycleExpiration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    noncurrent_version_expiration: Option<NoncurrentVersionExpiration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    abort_incomplete_multipart_upload: Option<AbortIncompleteMultipartUpload>,
}

impl<'a> From<&'a LifecycleRule> for LifecycleRuleArgs<'a> {
    fn from(rule: &'a LifecycleRule) -> Self {
        let transition = rule
            .transition_storage_class
            .as_provider_str()
            .filter(|_| rule.transition_days > 0)
            .map(|storage_class| LifecycleTransition {
                days: rule.transition_days,
                storage_class,
            });

        Self {
            id: &rule.id,
            status: if rule.enabled { "Enabled" } else { "Disabled" },
            filter: (!rule.prefix.is_empty()).then(|| LifecycleFilter { prefix: &rule.prefix }),
            transitions: transition.into_iter().collect(),
            expiration: (rule.expiration_days > 0).then(|| LifecycleExpiration {
                days: rule.expiration_days,
            }),
            noncurrent_version_expiration: (rule.noncurrent_version_expiration_days > 0).then(|| {
                NoncurrentVersionExpiration {
                    noncurrent_days: rule.noncurrent_version_expiration_days,
                }
            }),
            abort_incomplete_multipart_upload: (rule.abort_incomplete_multipart_upload_days > 0)
                .then(|| AbortIncompleteMultipartUpload {
                    days_after_initiation: rule.abort_incomplete_multipart_upload_days,
                }),
        }
    }
}

#[derive(Debug, Serialize)]
struct LifecycleArgs<'a> {
    bucket: &'a str,
    rules: Vec<LifecycleRuleArgs<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoggingArgs<'a> {
    bucket: &'a str,
    target_bucket: &'a str,
    target_prefix: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CorsRuleArgs<'a> {
    allowed_methods: &'a [String],
    allowed_origins: &'a [String],
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    allowed_headers: &'a [String],
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    expose_headers: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_age_seconds: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CorsArgs<'a> {
    bucket: &'a str,
    cors_rules: Vec<CorsRuleArgs<'a>>,
}

fn encryption_rule(spec: &AwsS3BucketSpec) -> EncryptionRule<'_> {
    let by_default = match spec.encryption_type {
        EncryptionType::SseKms => EncryptionByDefault {
            sse_algorithm: "aws:kms",
            kms_master_key_id: Some(&spec.kms_key_id),
        },
        EncryptionType::SseS3 | EncryptionType::Unspecified => EncryptionByDefault {
            sse_algorithm: "AES256",
            kms_master_key_id: None,
        },
    };
    EncryptionRule {
        apply_server_side_encryption_by_default: by_default,
        bucket_key_enabled: true,
    }
}

pub struct S3BucketModule;

#[async_trait]
impl ResourceModule for S3BucketModule {
    const KIND: CloudResourceKind = CloudResourceKind::AwsS3Bucket;
    type Spec = AwsS3BucketSpec;
    type ProviderConfig = AwsProviderConfig;
    type Error = AwsError;

    async fn resources(
        ctx: &mut Context,
        input: &StackInput<AwsS3BucketSpec, AwsProviderConfig>,
    ) -> Result<()> {
        let spec = input.spec();
        let locals = S3BucketLocals::new(input);

        let provider = AwsProvider::from_config(input.provider_config.as_ref())?;
        let provider = ctx.register_provider("classic-provider", &provider).await?;
        let options = || ResourceOptions::new().provider(&provider);

        let bucket = ctx
            .register(
                BUCKET,
                "bucket",
                &BucketArgs {
                    bucket: &locals.bucket_name,
                    force_destroy: spec.force_destroy,
                    tags: &locals.tags,
                },
                options(),
            )
            .await
            .context("failed to create S3 bucket")?;
        let bucket_id = bucket.id.as_str();

        if spec.versioning_enabled {
            ctx.register(
                VERSIONING,
                "versioning",
                &VersioningArgs {
                    bucket: bucket_id,
                    versioning_configuration: VersioningConfiguration { status: "Enabled" },
                },
                options().depends_on(&bucket),
            )
            .await
            .context("failed to enable bucket versioning")?;
        }

        ctx.register(
            ENCRYPTION,
            "encryption",
            &EncryptionArgs {
                bucket: bucket_id,
                rules: vec![encryption_rule(spec)],
            },
            options().depends_on(&bucket),
        )
        .await
        .context("failed to configure bucket encryption")?;

        let block = !spec.is_public;
        ctx.register(
            PUBLIC_ACCESS_BLOCK,
            "public-access-block",
            &PublicAccessBlockArgs {
                bucket: bucket_id,
                block_public_acls: block,
                block_public_policy: block,
                ignore_public_acls: block,
                restrict_public_buckets: block,
            },
            options().depends_on(&bucket),
        )
        .await
        .context("failed to configure public access block")?;

        ctx.register(
            OWNERSHIP_CONTROLS,
            "ownership-controls",
            &OwnershipControlsArgs {
                bucket: bucket_id,
                rule: OwnershipRule {
                    object_ownership: "BucketOwnerEnforced",
                },
            },
            options().depends_on(&bucket),
        )
        .await
        .context("failed to configure ownership controls")?;

        if !spec.lifecycle_rules.is_empty() {
            ctx.register(
                LIFECYCLE,
                "lifecycle",
                &LifecycleArgs {
                    bucket: bucket_id,
                    rules: spec.lifecycle_rules.iter().map(LifecycleRuleArgs::from).collect(),
                },
                options().depends_on(&bucket),
            )
            .await
            .context("failed to configure lifecycle rules")?;
        }

        if spec.replication.as_ref().is_some_and(|r| r.enabled) {
            ctx.warn(
                "replication is specified but not supported by this module; configure it outside of stackcraft",
            );
        }

        if let Some(logging) = spec.logging.as_ref().filter(|l| l.enabled) {
            ctx.register(
                LOGGING,
                "logging",
                &LoggingArgs {
                    bucket: bucket_id,
                    target_bucket: &logging.target_bucket,
                    target_prefix: &logging.target_prefix,
                },
                options().depends_on(&bucket),
            )
            .await
            .context("failed to configure logging")?;
        }

        if let Some(cors) = spec.cors.as_ref().filter(|c| !c.cors_rules.is_empty()) {
            let cors_rules = cors
                .cors_rules
                .iter()
                .map(|rule| CorsRuleArgs {
                    allowed_methods: &rule.allowed_methods,
                    allowed_origins: &rule.allowed_origins,
                    allowed_headers: &rule.allowed_headers,
                    expose_headers: &rule.expose_headers,
                    max_age_seconds: (rule.max_age_seconds > 0).then_some(rule.max_age_seconds),
                })
                .collect();
            ctx.register(
                CORS,
                "cors",
                &CorsArgs {
                    bucket: bucket_id,
                    cors_rules,
                },
                options().depends_on(&bucket),
            )
            .await
            .context("failed to configure CORS")?;
        }

        ctx.export("bucket_id", bucket.output("bucket"))?;
        ctx.export("bucket_arn", bucket.output("arn"))?;
        ctx.export("region", spec.aws_region.clone())?;
        ctx.export("bucket_regional_domain_name", bucket.output("bucketRegionalDomainName"))?;
        ctx.export("hosted_zone_id", bucket.output("hostedZoneId"))?;
        Ok(())
    }
}
