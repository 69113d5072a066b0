//! `KubernetesNamespace`: a namespace with optional quotas, default limits,
//! network isolation and service-mesh injection

use crate::error::{KubernetesError, Result};
use crate::provider::{KubernetesProvider, KubernetesProviderConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use stackcraft_cloud::{Context, ProviderRef, ResourceOptions, ResourceRef, ResultExt};
use stackcraft_core::validate::{self, Validate};
use stackcraft_core::{CloudResourceKind, ResourceModule, StackInput};
use std::collections::BTreeMap;

const NAMESPACE: &str = "kubernetes:core/v1:Namespace";
const RESOURCE_QUOTA: &str = "kubernetes:core/v1:ResourceQuota";
const LIMIT_RANGE: &str = "kubernetes:core/v1:LimitRange";
const NETWORK_POLICY: &str = "kubernetes:networking.k8s.io/v1:NetworkPolicy";

const MANAGED_BY: &str = "stackcraft";
const NAMESPACE_NAME_LABEL: &str = "kubernetes.io/metadata.name";
const POD_SECURITY_ENFORCE: &str = "pod-security.kubernetes.io/enforce";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BuiltInProfile {
    Small,
    Medium,
    Large,
    Xlarge,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestsAndLimits {
    pub requests: String,
    pub limits: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObjectCounts {
    pub pods: u32,
    pub services: u32,
    pub configmaps: u32,
    pub secrets: u32,
    pub persistent_volume_claims: u32,
    pub load_balancers: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DefaultLimits {
    pub default_cpu_request: String,
    pub default_cpu_limit: String,
    pub default_memory_request: String,
    pub default_memory_limit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CustomQuotas {
    pub cpu: Option<RequestsAndLimits>,
    pub memory: Option<RequestsAndLimits>,
    pub object_counts: Option<ObjectCounts>,
    pub default_limits: Option<DefaultLimits>,
}

/// Either a built-in preset or custom quotas, never both
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceProfile {
    pub preset: Option<BuiltInProfile>,
    pub custom: Option<CustomQuotas>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NetworkConfig {
    pub isolate_ingress: bool,
    pub restrict_egress: bool,
    pub allowed_ingress_namespaces: Vec<String>,
    pub allowed_egress_cidrs: Vec<String>,

    /// Not expressible as a NetworkPolicy; reported as a warning
    pub allowed_egress_domains: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceMeshType {
    Istio,
    Linkerd,
    Consul,
    #[default]
    #[serde(other)]
    Unspecified,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceMeshConfig {
    pub enabled: bool,
    pub mesh_type: ServiceMeshType,

    /// Istio revision; empty means the default injector
    pub revision_tag: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PodSecurityStandard {
    Privileged,
    Baseline,
    Restricted,
    #[default]
    #[serde(other)]
    Unspecified,
}

impl PodSecurityStandard {
    pub fn as_provider_str(&self) -> Option<&'static str> {
        match self {
            PodSecurityStandard::Unspecified => None,
            PodSecurityStandard::Privileged => Some("privileged"),
            PodSecurityStandard::Baseline => Some("baseline"),
            PodSecurityStandard::Restricted => Some("restricted"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KubernetesNamespaceSpec {
    /// Falls back to `metadata.name`
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub resource_profile: Option<ResourceProfile>,
    pub network_config: Option<NetworkConfig>,
    pub service_mesh_config: Option<ServiceMeshConfig>,
    pub pod_security_standard: PodSecurityStandard,
}

impl Validate for KubernetesNamespaceSpec {
    fn validate(&self) -> stackcraft_core::Result<()> {
        if !self.name.is_empty() {
            validate::length_between("spec.name", &self.name, 1, 63)?;
        }
        if let Some(profile) = &self.resource_profile {
            validate::reject_if(
                profile.preset.is_some() && profile.custom.is_some(),
                "spec.resource_profile",
                "set either preset or custom, not both",
            )?;
        }
        Ok(())
    }
}

/// Hard limits of a ResourceQuota
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotaConfig {
    pub cpu_requests: String,
    pub cpu_limits: String,
    pub memory_requests: String,
    pub memory_limits: String,
    pub counts: ObjectCounts,
}

impl QuotaConfig {
    fn preset(profile: BuiltInProfile) -> Self {
        let (cpu, memory, counts) = match profile {
            BuiltInProfile::Small => (("2", "4"), ("4Gi", "8Gi"), [20, 10, 50, 50, 5, 2]),
            BuiltInProfile::Medium => (("4", "8"), ("8Gi", "16Gi"), [50, 20, 100, 100, 10, 3]),
            BuiltInProfile::Large => (("8", "16"), ("16Gi", "32Gi"), [100, 40, 200, 200, 20, 5]),
            BuiltInProfile::Xlarge => {
                (("16", "32"), ("32Gi", "64Gi"), [200, 80, 400, 400, 40, 10])
            }
        };
        let [pods, services, configmaps, secrets, persistent_volume_claims, load_balancers] =
            counts;

        Self {
            cpu_requests: cpu.0.into(),
            cpu_limits: cpu.1.into(),
            memory_requests: memory.0.into(),
            memory_limits: memory.1.into(),
            counts: ObjectCounts {
                pods,
                services,
                configmaps,
                secrets,
                persistent_volume_claims,
                load_balancers,
            },
        }
    }

    fn custom(custom: &CustomQuotas) -> Self {
        let cpu = custom.cpu.clone().unwrap_or_default();
        let memory = custom.memory.clone().unwrap_or_default();
        Self {
            cpu_requests: cpu.requests,
            cpu_limits: cpu.limits,
            memory_requests: memory.requests,
            memory_limits: memory.limits,
            counts: custom.object_counts.clone().unwrap_or_default(),
        }
    }

    /// `spec.hard` of the quota; empty and zero entries are left out
    pub fn hard(&self) -> BTreeMap<&'static str, String> {
        let quantities = [
            ("requests.cpu", &self.cpu_requests),
            ("limits.cpu", &self.cpu_limits),
            ("requests.memory", &self.memory_requests),
            ("limits.memory", &self.memory_limits),
        ];
        let counts = [
            ("pods", self.counts.pods),
            ("services", self.counts.services),
            ("configmaps", self.counts.configmaps),
            ("secrets", self.counts.secrets),
            ("persistentvolumeclaims", self.counts.persistent_volume_claims),
            ("services.loadbalancers", self.counts.load_balancers),
        ];

        quantities
            .into_iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k, v.clone()))
            .chain(
                counts
                    .into_iter()
                    .filter(|(_, v)| *v > 0)
                    .map(|(k, v)| (k, v.to_string())),
            )
            .collect()
    }
}

/// Values derived from the input before anything is registered
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceLocals {
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub quota: Option<QuotaConfig>,
    pub default_limits: Option<DefaultLimits>,
    pub network: NetworkConfig,
}

impl NamespaceLocals {
    pub fn new(input: &StackInput<KubernetesNamespaceSpec, KubernetesProviderConfig>) -> Self {
        let spec = input.spec();
        let metadata = input.metadata();
        let namespace = if spec.name.is_empty() {
            metadata.name.clone()
        } else {
            spec.name.clone()
        };

        let mut labels = BTreeMap::from([
            ("managed-by".to_string(), MANAGED_BY.to_string()),
            ("resource".to_string(), metadata.name.clone()),
            (
                "resource-kind".to_string(),
                CloudResourceKind::KubernetesNamespace.to_string(),
            ),
        ]);
        labels.extend(spec.labels.clone());
        if let Some(level) = spec.pod_security_standard.as_provider_str() {
            labels.insert(POD_SECURITY_ENFORCE.to_string(), level.to_string());
        }

        let mut annotations = spec.annotations.clone();
        if let Some(mesh) = spec.service_mesh_config.as_ref().filter(|m| m.enabled) {
            match mesh.mesh_type {
                ServiceMeshType::Istio if !mesh.revision_tag.is_empty() => {
                    annotations.insert("istio.io/rev".into(), mesh.revision_tag.clone());
                }
                ServiceMeshType::Istio => {
                    annotations.insert("istio-injection".into(), "enabled".into());
                }
                ServiceMeshType::Linkerd => {
                    annotations.insert("linkerd.io/inject".into(), "enabled".into());
                }
                ServiceMeshType::Consul => {
                    annotations.insert("consul.hashicorp.com/connect-inject".into(), "true".into());
                }
                ServiceMeshType::Unspecified => {}
            }
        }

        let profile = spec.resource_profile.as_ref();
        let quota = profile.and_then(|p| match (&p.preset, &p.custom) {
            (Some(preset), _) => Some(QuotaConfig::preset(*preset)),
            (None, Some(custom)) => Some(QuotaConfig::custom(custom)),
            (None, None) => None,
        });
        let default_limits = profile
            .and_then(|p| p.custom.as_ref())
            .and_then(|c| c.default_limits.clone());

        Self {
            namespace,
            labels,
            annotations,
            quota,
            default_limits,
            network: spec.network_config.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ObjectMeta<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
    labels: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    annotations: Option<&'a BTreeMap<String, String>>,
}

#[derive(Debug, Serialize)]
struct ManifestArgs<'a> {
    metadata: ObjectMeta<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    spec: Option<Value>,
}

fn namespace_peer(name: &str) -> Value {
    json!({ "namespaceSelector": { "matchLabels": { NAMESPACE_NAME_LABEL: name } } })
}

fn same_namespace_peer() -> Value {
    json!({ "podSelector": {} })
}

fn ingress_policy(network: &NetworkConfig) -> Value {
    let mut rules: Vec<Value> = network
        .allowed_ingress_namespaces
        .iter()
        .map(|ns| json!({ "from": [namespace_peer(ns)] }))
        .collect();
    rules.push(json!({ "from": [same_namespace_peer()] }));

    json!({ "podSelector": {}, "policyTypes": ["Ingress"], "ingress": rules })
}

fn egress_policy(network: &NetworkConfig) -> Value {
    let mut rules = vec![json!({
        "to": [namespace_peer("kube-system")],
        "ports": [
            { "protocol": "UDP", "port": 53 },
            { "protocol": "TCP", "port": 53 },
        ],
    })];
    rules.extend(
        network
            .allowed_egress_cidrs
            .iter()
            .map(|cidr| json!({ "to": [{ "ipBlock": { "cidr": cidr } }] })),
    );
    rules.push(json!({ "to": [same_namespace_peer()] }));

    json!({ "podSelector": {}, "policyTypes": ["Egress"], "egress": rules })
}

fn limit_range(limits: &DefaultLimits) -> Value {
    json!({
        "limits": [{
            "type": "Container",
            "default": {
                "cpu": limits.default_cpu_limit,
                "memory": limits.default_memory_limit,
            },
            "defaultRequest": {
                "cpu": limits.default_cpu_request,
                "memory": limits.default_memory_request,
            },
        }]
    })
}

/// Register a namespaced object that depends on the namespace
async fn register_in_namespace(
    ctx: &mut Context,
    type_token: &str,
    name: &str,
    locals: &NamespaceLocals,
    spec: Value,
    provider: &ProviderRef,
    namespace: &ResourceRef,
) -> stackcraft_cloud::Result<ResourceRef> {
    ctx.register(
        type_token,
        name,
        &ManifestArgs {
            metadata: ObjectMeta {
                name,
                namespace: Some(&locals.namespace),
                labels: &locals.labels,
                annotations: None,
            },
            spec: Some(spec),
        },
        ResourceOptions::new().provider(provider).depends_on(namespace),
    )
    .await
}

pub struct NamespaceModule;

#[async_trait]
impl ResourceModule for NamespaceModule {
    const KIND: CloudResourceKind = CloudResourceKind::KubernetesNamespace;
    type Spec = KubernetesNamespaceSpec;
    type ProviderConfig = KubernetesProviderConfig;
    type Error = KubernetesError;

    async fn resources(
        ctx: &mut Context,
        input: &StackInput<KubernetesNamespaceSpec, KubernetesProviderConfig>,
    ) -> Result<()> {
        let locals = NamespaceLocals::new(input);

        let provider = KubernetesProvider::from_config(input.provider_config.as_ref())
            .context("failed to set up kubernetes provider")?;
        let provider = ctx.register_provider("kubernetes", &provider).await?;

        let namespace = ctx
            .register(
                NAMESPACE,
                &locals.namespace,
                &ManifestArgs {
                    metadata: ObjectMeta {
                        name: &locals.namespace,
                        namespace: None,
                        labels: &locals.labels,
                        annotations: Some(&locals.annotations),
                    },
                    spec: None,
                },
                ResourceOptions::new().provider(&provider),
            )
            .await
            .with_context(|| format!("failed to create namespace {}", locals.namespace))?;

        if let Some(quota) = &locals.quota {
            let name = format!("{}-quota", locals.namespace);
            let spec = json!({ "hard": quota.hard() });
            register_in_namespace(ctx, RESOURCE_QUOTA, &name, &locals, spec, &provider, &namespace)
                .await
                .context("failed to create resource quota")?;
        }

        if let Some(limits) = &locals.default_limits {
            let name = format!("{}-limits", locals.namespace);
            register_in_namespace(
                ctx,
                LIMIT_RANGE,
                &name,
                &locals,
                limit_range(limits),
                &provider,
                &namespace,
            )
            .await
            .context("failed to create limit range")?;
        }

        if locals.network.isolate_ingress {
            let name = format!("{}-ingress-policy", locals.namespace);
            register_in_namespace(
                ctx,
                NETWORK_POLICY,
                &name,
                &locals,
                ingress_policy(&locals.network),
                &provider,
                &namespace,
            )
            .await
            .context("failed to create ingress network policy")?;
        }

        if locals.network.restrict_egress {
            let name = format!("{}-egress-policy", locals.namespace);
            register_in_namespace(
                ctx,
                NETWORK_POLICY,
                &name,
                &locals,
                egress_policy(&locals.network),
                &provider,
                &namespace,
            )
            .await
            .context("failed to create egress network policy")?;

            if !locals.network.allowed_egress_domains.is_empty() {
                ctx.warn(format!(
                    "allowed_egress_domains ({}) cannot be enforced by a NetworkPolicy; use a CNI with FQDN policies",
                    locals.network.allowed_egress_domains.join(", ")
                ));
            }
        }

        ctx.export("namespace", locals.namespace.clone())?;
        Ok(())
    }
}
