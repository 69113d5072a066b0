//! `GcpGcsBucket`: a Cloud Storage bucket and its IAM bindings

use crate::error::{GcpError, Result};
use crate::provider::{GcpProvider, GcpProviderConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stackcraft_cloud::{Context, ResourceOptions, ResultExt};
use stackcraft_core::naming::{self, GCP_LABEL_VALUE};
use stackcraft_core::validate::{self, Validate};
use stackcraft_core::{CloudResourceKind, ResourceModule, StackInput, labels};
use std::collections::BTreeMap;

const BUCKET: &str = "gcp:storage/bucket:Bucket";
const BUCKET_IAM_BINDING: &str = "gcp:storage/bucketIAMBinding:BucketIAMBinding";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GcsStorageClass {
    Standard,
    Nearline,
    Coldline,
    Archive,
    #[default]
    #[serde(other)]
    Unspecified,
}

impl GcsStorageClass {
    pub fn as_provider_str(&self) -> &'static str {
        match self {
            GcsStorageClass::Unspecified | GcsStorageClass::Standard => "STANDARD",
            GcsStorageClass::Nearline => "NEARLINE",
            GcsStorageClass::Coldline => "COLDLINE",
            GcsStorageClass::Archive => "ARCHIVE",
        }
    }

    fn is_specified(&self) -> bool {
        *self != GcsStorageClass::Unspecified
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LifecycleAction {
    /// `Delete`, `SetStorageClass` or `AbortIncompleteMultipartUpload`
    #[serde(rename = "type")]
    pub action_type: String,
    pub storage_class: GcsStorageClass,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LifecycleCondition {
    pub age_days: u32,
    /// RFC 3339 date, e.g. `2024-01-01`
    pub created_before: String,
    pub num_newer_versions: u32,
    pub matches_storage_class: Vec<GcsStorageClass>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleRule {
    pub action: LifecycleAction,
    pub condition: LifecycleCondition,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EncryptionConfig {
    pub kms_key_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CorsRule {
    pub methods: Vec<String>,
    pub origins: Vec<String>,
    pub response_headers: Vec<String>,
    pub max_age_seconds: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WebsiteConfig {
    pub main_page_suffix: String,
    pub not_found_page: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetentionPolicy {
    pub retention_period_seconds: u64,
    pub is_locked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingConfig {
    pub log_bucket: String,
    pub log_object_prefix: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IamBinding {
    pub role: String,
    pub members: Vec<String>,
    /// CEL expression; empty means unconditional
    pub condition: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GcpGcsBucketSpec {
    pub gcp_project_id: String,
    pub location: String,
    pub uniform_bucket_level_access_enabled: bool,
    pub storage_class: GcsStorageClass,
    pub versioning_enabled: bool,
    pub lifecycle_rules: Vec<LifecycleRule>,
    pub encryption: Option<EncryptionConfig>,
    pub cors_rules: Vec<CorsRule>,
    pub website: Option<WebsiteConfig>,
    pub retention_policy: Option<RetentionPolicy>,
    pub requester_pays: bool,
    pub logging: Option<LoggingConfig>,
    /// `enforced` or `inherited`
    pub public_access_prevention: String,
    pub iam_bindings: Vec<IamBinding>,
}

impl Validate for GcpGcsBucketSpec {
    fn validate(&self) -> stackcraft_core::Result<()> {
        validate::require("spec.gcp_project_id", &self.gcp_project_id)?;
        validate::require("spec.location", &self.location)?;
        for (i, rule) in self.lifecycle_rules.iter().enumerate() {
            validate::require(
                &format!("spec.lifecycle_rules[{}].action.type", i),
                &rule.action.action_type,
            )?;
        }
        for (i, binding) in self.iam_bindings.iter().enumerate() {
            validate::require(&format!("spec.iam_bindings[{}].role", i), &binding.role)?;
            validate::reject_if(
                binding.members.is_empty(),
                &format!("spec.iam_bindings[{}].members", i),
                "at least one member is required",
            )?;
        }
        Ok(())
    }
}

/// Values derived from the input before anything is registered
#[derive(Debug, Clone, PartialEq)]
pub struct GcsBucketLocals {
    pub bucket_name: String,
    /// Standard labels with values made legal for GCP
    pub gcp_labels: BTreeMap<String, String>,
}

impl GcsBucketLocals {
    pub fn new(input: &StackInput<GcpGcsBucketSpec, GcpProviderConfig>) -> Self {
        let gcp_labels = labels::standard_labels(input.metadata(), CloudResourceKind::GcpGcsBucket)
            .into_iter()
            .map(|(key, value)| {
                let value = naming::sanitize_name(&value.replace('.', "-"), &GCP_LABEL_VALUE);
                (key, value)
            })
            .collect();

        Self {
            bucket_name: input.metadata().name.clone(),
            gcp_labels,
        }
    }
}

#[derive(Debug, Serialize)]
struct EnabledFlag {
    enabled: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LifecycleActionArgs<'a> {
    #[serde(rename = "type")]
    action_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    storage_class: Option<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LifecycleConditionArgs<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_before: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_newer_versions: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    matches_storage_classes: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
struct LifecycleRuleArgs<'a> {
    action: LifecycleActionArgs<'a>,
    condition: LifecycleConditionArgs<'a>,
}

impl<'a> From<&'a LifecycleRule> for LifecycleRuleArgs<'a> {
    fn from(rule: &'a LifecycleRule) -> Self {
        let condition = &rule.condition;
        Self {
            action: LifecycleActionArgs {
                action_type: &rule.action.action_type,
                storage_class: rule
                    .action
                    .storage_class
                    .is_specified()
                    .then(|| rule.action.storage_class.as_provider_str()),
            },
            condition: LifecycleConditionArgs {
                age: (condition.age_days > 0).then_some(condition.age_days),
                created_before: Some(condition.created_before.as_str()).filter(|d| !d.is_empty()),
                num_newer_versions: (condition.num_newer_versions > 0)
                    .then_some(condition.num_newer_versions),
                matches_storage_classes: condition
                    .matches_storage_class
                    .iter()
                    .map(GcsStorageClass::as_provider_str)
                    .collect(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EncryptionArgs<'a> {
    default_kms_key_name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CorsArgs<'a> {
    methods: &'a [String],
    origins: &'a [String],
    response_headers: &'a [String],
    max_age_seconds: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RetentionPolicyArgs {
    retention_period: u64,
    is_locked: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoggingArgs<'a> {
    log_bucket: &'a str,
    log_object_prefix: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BucketArgs<'a> {
    force_destroy: bool,
    labels: &'a BTreeMap<String, String>,
    location: &'a str,
    name: &'a str,
    project: &'a str,
    uniform_bucket_level_access: EnabledFlag,
    #[serde(skip_serializing_if = "Option::is_none")]
    storage_class: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    versioning: Option<EnabledFlag>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    lifecycle_rules: Vec<LifecycleRuleArgs<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    encryption: Option<EncryptionArgs<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    cors: Vec<CorsArgs<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    website: Option<&'a WebsiteConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retention_policy: Option<RetentionPolicyArgs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    requester_pays: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    logging: Option<LoggingArgs<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    public_access_prevention: Option<&'a str>,
}

impl<'a> BucketArgs<'a> {
    fn new(spec: &'a GcpGcsBucketSpec, locals: &'a GcsBucketLocals) -> Self {
        Self {
            force_destroy: true,
            labels: &locals.gcp_labels,
            location: &spec.location,
            name: &locals.bucket_name,
            project: &spec.gcp_project_id,
            uniform_bucket_level_access: EnabledFlag {
                enabled: spec.uniform_bucket_level_access_enabled,
            },
            storage_class: spec
                .storage_class
                .is_specified()
                .then(|| spec.storage_class.as_provider_str()),
            versioning: spec.versioning_enabled.then_some(EnabledFlag { enabled: true }),
            lifecycle_rules: spec.lifecycle_rules.iter().map(LifecycleRuleArgs::from).collect(),
            encryption: spec
                .encryption
                .as_ref()
                .filter(|e| !e.kms_key_name.is_empty())
                .map(|e| EncryptionArgs {
                    default_kms_key_name: &e.kms_key_name,
                }),
            cors: spec
                .cors_rules
                .iter()
                .map(|rule| CorsArgs {
                    methods: &rule.methods,
                    origins: &rule.origins,
                    response_headers: &rule.response_headers,
                    max_age_seconds: rule.max_age_seconds,
                })
                .collect(),
            website: spec.website.as_ref(),
            retention_policy: spec.retention_policy.as_ref().map(|p| RetentionPolicyArgs {
                retention_period: p.retention_period_seconds,
                is_locked: p.is_locked,
            }),
            requester_pays: spec.requester_pays.then_some(true),
            logging: spec.logging.as_ref().map(|l| LoggingArgs {
                log_bucket: &l.log_bucket,
                log_object_prefix: &l.log_object_prefix,
            }),
            public_access_prevention: Some(spec.public_access_prevention.as_str())
                .filter(|p| !p.is_empty()),
        }
    }
}

#[derive(Debug, Serialize)]
struct IamConditionArgs<'a> {
    expression: &'a str,
    title: String,
}

#[derive(Debug, Serialize)]
struct BucketIamBindingArgs<'a> {
    bucket: &'a str,
    role: &'a str,
    members: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    condition: Option<IamConditionArgs<'a>>,
}

pub struct GcsBucketModule;

#[async_trait]
impl ResourceModule for GcsBucketModule {
    const KIND: CloudResourceKind = CloudResourceKind::GcpGcsBucket;
    type Spec = GcpGcsBucketSpec;
    type ProviderConfig = GcpProviderConfig;
    type Error = GcpError;

    async fn resources(
        ctx: &mut Context,
        input: &StackInput<GcpGcsBucketSpec, GcpProviderConfig>,
    ) -> Result<()> {
        let spec = input.spec();
        let locals = GcsBucketLocals::new(input);

        let provider = GcpProvider::from_config(input.provider_config.as_ref())?;
        let provider = ctx.register_provider("gcp", &provider).await?;

        let bucket = ctx
            .register(
                BUCKET,
                &locals.bucket_name,
                &BucketArgs::new(spec, &locals),
                ResourceOptions::new().provider(&provider),
            )
            .await
            .context("failed to create bucket resource")?;

        for (i, binding) in spec.iam_bindings.iter().enumerate() {
            let condition = (!binding.condition.is_empty()).then(|| IamConditionArgs {
                expression: &binding.condition,
                title: format!("condition-{}", i),
            });
            ctx.register(
                BUCKET_IAM_BINDING,
                &format!("{}-iam-{}", locals.bucket_name, i),
                &BucketIamBindingArgs {
                    bucket: &bucket.id,
                    role: &binding.role,
                    members: &binding.members,
                    condition,
                },
                ResourceOptions::new().provider(&provider).parent(&bucket),
            )
            .await
            .with_context(|| format!("failed to create IAM binding {}", i))?;
        }

        ctx.export("bucket_id", bucket.id.clone())?;
        Ok(())
    }
}
