//! `CloudflareDnsZone`: a zone and its records

use crate::error::{CloudflareError, Result};
use crate::provider::{CloudflareProvider, CloudflareProviderConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stackcraft_cloud::{Context, ResourceOptions, ResultExt};
use stackcraft_core::validate::{self, Validate};
use stackcraft_core::{CloudResourceKind, DnsRecordType, ResourceModule, StackInput};

const ZONE: &str = "cloudflare:index/zone:Zone";
const DNS_RECORD: &str = "cloudflare:index/dnsRecord:DnsRecord";

/// TTL value Cloudflare treats as "automatic"
const AUTOMATIC_TTL: u32 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CloudflareDnsZonePlan {
    Free,
    Pro,
    Business,
    Enterprise,
    #[default]
    #[serde(other)]
    Unspecified,
}

impl CloudflareDnsZonePlan {
    pub fn as_provider_str(&self) -> &'static str {
        match self {
            CloudflareDnsZonePlan::Unspecified | CloudflareDnsZonePlan::Free => "free",
            CloudflareDnsZonePlan::Pro => "pro",
            CloudflareDnsZonePlan::Business => "business",
            CloudflareDnsZonePlan::Enterprise => "enterprise",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudflareDnsRecord {
    pub name: String,

    #[serde(rename = "type", alias = "recordType")]
    pub record_type: DnsRecordType,

    pub value: String,

    /// 0 means automatic
    #[serde(default)]
    pub ttl_seconds: u32,

    /// Absent means the zone's `defaultProxied`
    #[serde(default)]
    pub proxied: Option<bool>,

    /// MX and SRV only
    #[serde(default)]
    pub priority: u32,

    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CloudflareDnsZoneSpec {
    pub zone_name: String,
    pub account_id: String,
    pub plan: CloudflareDnsZonePlan,
    pub paused: bool,
    pub default_proxied: bool,
    pub records: Vec<CloudflareDnsRecord>,
}

impl Validate for CloudflareDnsZoneSpec {
    fn validate(&self) -> stackcraft_core::Result<()> {
        validate::require("spec.zone_name", &self.zone_name)?;
        validate::require("spec.account_id", &self.account_id)?;
        for (i, record) in self.records.iter().enumerate() {
            validate::require(&format!("spec.records[{}].name", i), &record.name)?;
            validate::require(&format!("spec.records[{}].value", i), &record.value)?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ZoneAccount<'a> {
    id: &'a str,
}

#[derive(Debug, Serialize)]
struct ZoneArgs<'a> {
    account: ZoneAccount<'a>,
    name: &'a str,
    paused: bool,
    plan: &'a str,
    #[serde(rename = "type")]
    zone_type: &'a str,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct DnsRecordArgs<'a> {
    zone_id: &'a str,
    name: &'a str,
    #[serde(rename = "type")]
    record_type: &'a str,
    content: &'a str,
    ttl: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    proxied: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<&'a str>,
}

impl<'a> DnsRecordArgs<'a> {
    fn new(zone_id: &'a str, record: &'a CloudflareDnsRecord, default_proxied: bool) -> Self {
        let kind = record.record_type;
        Self {
            zone_id,
            name: &record.name,
            record_type: kind.as_str(),
            content: &record.value,
            ttl: match record.ttl_seconds {
                0 => AUTOMATIC_TTL,
                ttl => ttl,
            },
            proxied: kind
                .is_proxiable()
                .then(|| record.proxied.unwrap_or(default_proxied)),
            priority: kind.has_priority().then_some(record.priority),
            comment: Some(record.comment.as_str()).filter(|c| !c.is_empty()),
        }
    }
}

pub struct DnsZoneModule;

#[async_trait]
impl ResourceModule for DnsZoneModule {
    const KIND: CloudResourceKind = CloudResourceKind::CloudflareDnsZone;
    type Spec = CloudflareDnsZoneSpec;
    type ProviderConfig = CloudflareProviderConfig;
    type Error = CloudflareError;

    async fn resources(
        ctx: &mut Context,
        input: &StackInput<CloudflareDnsZoneSpec, CloudflareProviderConfig>,
    ) -> Result<()> {
        let spec = input.spec();

        let provider = CloudflareProvider::from_config(input.provider_config.as_ref())?;
        let provider = ctx.register_provider("cloudflare", &provider).await?;

        let zone = ctx
            .register(
                ZONE,
                "zone",
                &ZoneArgs {
                    account: ZoneAccount { id: &spec.account_id },
                    name: &spec.zone_name,
                    paused: spec.paused,
                    plan: spec.plan.as_provider_str(),
                    zone_type: "full",
                },
                ResourceOptions::new().provider(&provider),
            )
            .await
            .with_context(|| format!("failed to create zone for {} domain", spec.zone_name))?;

        for (i, record) in spec.records.iter().enumerate() {
            ctx.register(
                DNS_RECORD,
                &format!("dns-record-{}", i),
                &DnsRecordArgs::new(&zone.id, record, spec.default_proxied),
                ResourceOptions::new().provider(&provider).parent(&zone),
            )
            .await
            .with_context(|| format!("failed to create DNS record {}: {}", i, record.name))?;
        }

        ctx.export("zone_id", zone.id.clone())?;
        ctx.export("zone_name", zone.output("name"))?;
        ctx.export("nameservers", zone.output("nameServers"))?;
        Ok(())
    }
}
