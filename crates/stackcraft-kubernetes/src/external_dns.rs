//! `KubernetesExternalDns`: the external-dns Helm chart wired to one DNS
//! provider (Cloud DNS, Route 53, Azure DNS or Cloudflare)

use crate::error::{KubernetesError, Result};
use crate::provider::{KubernetesProvider, KubernetesProviderConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use stackcraft_cloud::{Context, ResourceOptions, ResultExt};
use stackcraft_core::naming::{self, DNS_LABEL, HELM_RELEASE};
use stackcraft_core::validate::{self, Validate};
use stackcraft_core::{CloudResourceKind, ResourceModule, StackInput};
use std::collections::BTreeMap;

const NAMESPACE: &str = "kubernetes:core/v1:Namespace";
const SECRET: &str = "kubernetes:core/v1:Secret";
const SERVICE_ACCOUNT: &str = "kubernetes:core/v1:ServiceAccount";
const HELM_RELEASE_TYPE: &str = "kubernetes:helm.sh/v3:Release";

pub const DEFAULT_NAMESPACE: &str = "external-dns";
pub const DEFAULT_HELM_CHART_VERSION: &str = "1.19.0";
const HELM_CHART_NAME: &str = "external-dns";
const HELM_CHART_REPO: &str = "https://kubernetes-sigs.github.io/external-dns/";
const HELM_TIMEOUT_SECONDS: u32 = 180;

const CLOUDFLARE_TOKEN_KEY: &str = "apiKey";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GkeConfig {
    pub project_id: String,
    pub dns_zone_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EksConfig {
    pub route53_zone_id: String,

    /// IRSA role; empty leaves the service account unannotated
    pub irsa_role_arn_override: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AksConfig {
    pub dns_zone_id: String,
    pub managed_identity_client_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CloudflareConfig {
    pub api_token: String,
    pub dns_zone_id: String,
    pub is_proxied: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KubernetesExternalDnsSpec {
    pub namespace: String,
    pub create_namespace: bool,

    /// Image tag; empty keeps the chart's default
    pub external_dns_version: String,
    pub helm_chart_version: String,

    pub gke: Option<GkeConfig>,
    pub eks: Option<EksConfig>,
    pub aks: Option<AksConfig>,
    pub cloudflare: Option<CloudflareConfig>,
}

/// The one DNS provider external-dns manages records in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsTarget<'a> {
    Gke(&'a GkeConfig),
    Eks(&'a EksConfig),
    Aks(&'a AksConfig),
    Cloudflare(&'a CloudflareConfig),
}

impl KubernetesExternalDnsSpec {
    /// `None` unless exactly one provider block is set
    pub fn target(&self) -> Option<DnsTarget<'_>> {
        let targets: Vec<DnsTarget<'_>> = [
            self.gke.as_ref().map(DnsTarget::Gke),
            self.eks.as_ref().map(DnsTarget::Eks),
            self.aks.as_ref().map(DnsTarget::Aks),
            self.cloudflare.as_ref().map(DnsTarget::Cloudflare),
        ]
        .into_iter()
        .flatten()
        .collect();

        match targets.as_slice() {
            [target] => Some(*target),
            _ => None,
        }
    }
}

impl Validate for KubernetesExternalDnsSpec {
    fn validate(&self) -> stackcraft_core::Result<()> {
        let Some(target) = self.target() else {
            return Err(stackcraft_core::StackInputError::validation(
                "spec.provider_config",
                "must be set (gke, eks, aks, or cloudflare)",
            ));
        };

        match target {
            DnsTarget::Gke(gke) => {
                validate::require("spec.gke.project_id", &gke.project_id)?;
                validate::require("spec.gke.dns_zone_id", &gke.dns_zone_id)
            }
            DnsTarget::Eks(eks) => validate::require("spec.eks.route53_zone_id", &eks.route53_zone_id),
            DnsTarget::Aks(aks) => validate::require("spec.aks.dns_zone_id", &aks.dns_zone_id),
            DnsTarget::Cloudflare(cf) => {
                validate::require("spec.cloudflare.api_token", &cf.api_token)?;
                validate::require("spec.cloudflare.dns_zone_id", &cf.dns_zone_id)
            }
        }
    }
}

/// Values derived from the input before anything is registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalDnsLocals {
    pub namespace: String,
    pub release_name: String,

    /// Kubernetes service account, named after the release
    pub ksa_name: String,
    pub helm_chart_version: String,
    pub cloudflare_secret_name: String,
}

impl ExternalDnsLocals {
    pub fn new(input: &StackInput<KubernetesExternalDnsSpec, KubernetesProviderConfig>) -> Self {
        let spec = input.spec();
        let name = &input.metadata().name;
        let release_name = naming::sanitize_name(name, &HELM_RELEASE);

        let cloudflare_secret_name = naming::sanitize_name(
            &format!("{}-cloudflare-api-token", release_name),
            &DNS_LABEL,
        );

        Self {
            namespace: naming::resolve_or_default(Some(spec.namespace.as_str()), DEFAULT_NAMESPACE),
            ksa_name: release_name.clone(),
            release_name,
            helm_chart_version: naming::resolve_or_default(
                Some(spec.helm_chart_version.as_str()),
                DEFAULT_HELM_CHART_VERSION,
            ),
            cloudflare_secret_name,
        }
    }

    /// Google service account the KSA impersonates through Workload Identity
    pub fn gsa_email(&self, project_id: &str) -> String {
        format!("{}@{}.iam.gserviceaccount.com", self.ksa_name, project_id)
    }
}

#[derive(Debug, Serialize)]
struct ObjectMeta<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    annotations: BTreeMap<&'static str, String>,
}

#[derive(Debug, Serialize)]
struct MetadataOnly<'a> {
    metadata: ObjectMeta<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SecretArgs<'a> {
    metadata: ObjectMeta<'a>,
    string_data: BTreeMap<&'static str, &'a str>,
}

#[derive(Debug, Serialize)]
struct RepositoryOpts {
    repo: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReleaseArgs<'a> {
    name: &'a str,
    namespace: &'a str,
    chart: &'static str,
    version: &'a str,
    create_namespace: bool,
    atomic: bool,
    cleanup_on_fail: bool,
    wait_for_jobs: bool,
    timeout: u32,
    values: Value,
    repository_opts: RepositoryOpts,
}

/// Chart values and service-account annotations for `target`
fn provider_values(
    target: DnsTarget<'_>,
    locals: &ExternalDnsLocals,
    values: &mut Map<String, Value>,
) -> BTreeMap<&'static str, String> {
    let mut annotations = BTreeMap::new();
    match target {
        DnsTarget::Gke(gke) => {
            values.insert("provider".into(), json!("google"));
            values.insert("google".into(), json!({ "project": gke.project_id }));
            values.insert("zoneIdFilters".into(), json!([gke.dns_zone_id]));
            annotations.insert("iam.gke.io/gcp-service-account", locals.gsa_email(&gke.project_id));
        }
        DnsTarget::Eks(eks) => {
            values.insert("provider".into(), json!("aws"));
            values.insert("zoneIdFilters".into(), json!([eks.route53_zone_id]));
            if !eks.irsa_role_arn_override.is_empty() {
                annotations.insert("eks.amazonaws.com/role-arn", eks.irsa_role_arn_override.clone());
            }
        }
        DnsTarget::Aks(aks) => {
            values.insert("provider".into(), json!("azure"));
            values.insert("zoneIdFilters".into(), json!([aks.dns_zone_id]));
            if !aks.managed_identity_client_id.is_empty() {
                annotations.insert(
                    "azure.workload.identity/client-id",
                    aks.managed_identity_client_id.clone(),
                );
            }
        }
        DnsTarget::Cloudflare(cf) => {
            values.insert("provider".into(), json!("cloudflare"));
            // RBAC for these sources is only generated when they are listed
            values.insert(
                "sources".into(),
                json!(["service", "ingress", "gateway-httproute"]),
            );
            values.insert(
                "env".into(),
                json!([{
                    "name": "CF_API_TOKEN",
                    "valueFrom": {
                        "secretKeyRef": {
                            "name": locals.cloudflare_secret_name,
                            "key": CLOUDFLARE_TOKEN_KEY,
                        }
                    }
                }]),
            );
            let mut extra_args = vec![
                "--cloudflare-dns-records-per-page=5000".to_string(),
                format!("--zone-id-filter={}", cf.dns_zone_id),
            ];
            if cf.is_proxied {
                extra_args.push("--cloudflare-proxied".to_string());
            }
            values.insert("extraArgs".into(), json!(extra_args));
        }
    }
    annotations
}

pub struct ExternalDnsModule;

#[async_trait]
impl ResourceModule for ExternalDnsModule {
    const KIND: CloudResourceKind = CloudResourceKind::KubernetesExternalDns;
    type Spec = KubernetesExternalDnsSpec;
    type ProviderConfig = KubernetesProviderConfig;
    type Error = KubernetesError;

    async fn resources(
        ctx: &mut Context,
        input: &StackInput<KubernetesExternalDnsSpec, KubernetesProviderConfig>,
    ) -> Result<()> {
        let spec = input.spec();
        let locals = ExternalDnsLocals::new(input);
        // Validation guarantees exactly one provider block
        let Some(target) = spec.target() else {
            return Err(stackcraft_core::StackInputError::validation(
                "spec.provider_config",
                "must be set (gke, eks, aks, or cloudflare)",
            )
            .into());
        };

        let provider = KubernetesProvider::from_config(input.provider_config.as_ref())
            .context("failed to set up kubernetes provider")?;
        let provider = ctx.register_provider("kubernetes", &provider).await?;

        let mut release_options = ResourceOptions::new().provider(&provider);
        let mut account_options = ResourceOptions::new().provider(&provider);

        if spec.create_namespace {
            let namespace = ctx
                .register(
                    NAMESPACE,
                    &locals.namespace,
                    &MetadataOnly {
                        metadata: ObjectMeta {
                            name: &locals.namespace,
                            namespace: None,
                            annotations: BTreeMap::new(),
                        },
                    },
                    ResourceOptions::new().provider(&provider),
                )
                .await
                .with_context(|| format!("failed to create {} namespace", locals.namespace))?;
            account_options = account_options.depends_on(&namespace);
            release_options = release_options.depends_on(&namespace);
        }

        let mut values = Map::new();
        values.insert(
            "serviceAccount".into(),
            json!({ "create": false, "name": locals.ksa_name }),
        );
        let annotations = provider_values(target, &locals, &mut values);

        if let DnsTarget::Cloudflare(cf) = target {
            let secret = ctx
                .register(
                    SECRET,
                    &locals.cloudflare_secret_name,
                    &SecretArgs {
                        metadata: ObjectMeta {
                            name: &locals.cloudflare_secret_name,
                            namespace: Some(&locals.namespace),
                            annotations: BTreeMap::new(),
                        },
                        string_data: BTreeMap::from([(CLOUDFLARE_TOKEN_KEY, cf.api_token.as_str())]),
                    },
                    account_options
                        .clone()
                        .secret(format!("/stringData/{}", CLOUDFLARE_TOKEN_KEY)),
                )
                .await
                .context("failed to create cloudflare api token secret")?;
            release_options = release_options.depends_on(&secret);
        }

        if !spec.external_dns_version.is_empty() {
            values.insert("image".into(), json!({ "tag": spec.external_dns_version }));
        }

        let service_account = ctx
            .register(
                SERVICE_ACCOUNT,
                &locals.ksa_name,
                &MetadataOnly {
                    metadata: ObjectMeta {
                        name: &locals.ksa_name,
                        namespace: Some(&locals.namespace),
                        annotations,
                    },
                },
                account_options,
            )
            .await
            .context("failed to create service account")?;
        release_options = release_options.depends_on(&service_account);

        ctx.register(
            HELM_RELEASE_TYPE,
            &locals.release_name,
            &ReleaseArgs {
                name: &locals.release_name,
                namespace: &locals.namespace,
                chart: HELM_CHART_NAME,
                version: &locals.helm_chart_version,
                create_namespace: false,
                atomic: true,
                cleanup_on_fail: true,
                wait_for_jobs: true,
                timeout: HELM_TIMEOUT_SECONDS,
                values: Value::Object(values),
                repository_opts: RepositoryOpts {
                    repo: HELM_CHART_REPO,
                },
            },
            release_options,
        )
        .await
        .context("failed to install external-dns helm release")?;

        ctx.export("namespace", locals.namespace.clone())?;
        ctx.export("release_name", locals.release_name.clone())?;
        ctx.export("service_account_name", locals.ksa_name.clone())?;
        Ok(())
    }
}
