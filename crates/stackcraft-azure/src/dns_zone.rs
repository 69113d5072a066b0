//! `AzureDnsZone`: a public DNS zone, its records and optionally its
//! resource group

use crate::error::{AzureError, Result};
use crate::provider::{AzureProvider, AzureProviderConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use stackcraft_cloud::{Context, ResourceOptions, ResultExt};
use stackcraft_core::validate::{self, Validate};
use stackcraft_core::{CloudResourceKind, DnsRecordType, ResourceModule, StackInput, labels};
use std::collections::BTreeMap;

const RESOURCE_GROUP: &str = "azure:core/resourceGroup:ResourceGroup";
const ZONE: &str = "azure:dns/zone:Zone";

const DEFAULT_TTL_SECONDS: u32 = 300;
const MX_PREFERENCE: &str = "10";
const CAA_FLAGS: u32 = 0;
const CAA_TAG: &str = "issue";
const SRV_PRIORITY: u32 = 10;
const SRV_WEIGHT: u32 = 10;
const SRV_PORT: u32 = 80;

fn default_ttl() -> u32 {
    DEFAULT_TTL_SECONDS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureDnsRecord {
    pub record_type: DnsRecordType,

    /// Relative to the zone; `@` for the apex
    pub name: String,

    #[serde(default)]
    pub values: Vec<String>,

    #[serde(default = "default_ttl")]
    pub ttl_seconds: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AzureDnsZoneSpec {
    pub zone_name: String,
    pub resource_group: String,

    /// Create `resource_group` instead of using an existing one
    pub create_resource_group: bool,

    /// Region of a created resource group
    pub location: String,

    pub records: Vec<AzureDnsRecord>,
}

impl Validate for AzureDnsZoneSpec {
    fn validate(&self) -> stackcraft_core::Result<()> {
        validate::require("spec.zone_name", &self.zone_name)?;
        validate::require("spec.resource_group", &self.resource_group)?;
        validate::reject_if(
            self.create_resource_group && self.location.trim().is_empty(),
            "spec.location",
            "is required when create_resource_group is set",
        )?;
        for (i, record) in self.records.iter().enumerate() {
            validate::require(&format!("spec.records[{}].name", i), &record.name)?;
            validate::reject_if(
                record.record_type == DnsRecordType::Txt && record.values.is_empty(),
                &format!("spec.records[{}].values", i),
                "a TXT record needs a value",
            )?;
        }
        Ok(())
    }
}

/// Provider type token and record payload for one record type
fn record_payload(record: &AzureDnsRecord) -> (&'static str, Option<Value>) {
    let values = &record.values;
    match record.record_type {
        DnsRecordType::A => ("azure:dns/aRecord:ARecord", Some(json!({ "records": values }))),
        DnsRecordType::Aaaa => (
            "azure:dns/aaaaRecord:AaaaRecord",
            Some(json!({ "records": values })),
        ),
        DnsRecordType::Cname => (
            "azure:dns/cNameRecord:CNameRecord",
            values.first().map(|target| json!({ "record": target })),
        ),
        DnsRecordType::Mx => (
            "azure:dns/mxRecord:MxRecord",
            Some(json!({
                "records": values
                    .iter()
                    .map(|exchange| json!({ "preference": MX_PREFERENCE, "exchange": exchange }))
                    .collect::<Vec<_>>()
            })),
        ),
        DnsRecordType::Txt => (
            "azure:dns/txtRecord:TxtRecord",
            values.first().map(|value| json!({ "records": [{ "value": value }] })),
        ),
        DnsRecordType::Ns => ("azure:dns/nsRecord:NsRecord", Some(json!({ "records": values }))),
        DnsRecordType::Caa => (
            "azure:dns/caaRecord:CaaRecord",
            Some(json!({
                "records": values
                    .iter()
                    .map(|value| json!({ "flags": CAA_FLAGS, "tag": CAA_TAG, "value": value }))
                    .collect::<Vec<_>>()
            })),
        ),
        DnsRecordType::Srv => (
            "azure:dns/srvRecord:SrvRecord",
            Some(json!({
                "records": values
                    .iter()
                    .map(|target| json!({
                        "priority": SRV_PRIORITY,
                        "weight": SRV_WEIGHT,
                        "port": SRV_PORT,
                        "target": target,
                    }))
                    .collect::<Vec<_>>()
            })),
        ),
        DnsRecordType::Ptr => ("azure:dns/ptrRecord:PtrRecord", Some(json!({ "records": values }))),
    }
}

#[derive(Debug, Serialize)]
struct ResourceGroupArgs<'a> {
    name: &'a str,
    location: &'a str,
    tags: &'a BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ZoneArgs<'a> {
    name: &'a str,
    resource_group_name: &'a str,
    tags: &'a BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordArgs<'a> {
    name: &'a str,
    zone_name: &'a str,
    resource_group_name: &'a str,
    ttl: u32,
    #[serde(flatten)]
    payload: Value,
    tags: &'a BTreeMap<String, String>,
}

pub struct DnsZoneModule;

#[async_trait]
impl ResourceModule for DnsZoneModule {
    const KIND: CloudResourceKind = CloudResourceKind::AzureDnsZone;
    type Spec = AzureDnsZoneSpec;
    type ProviderConfig = AzureProviderConfig;
    type Error = AzureError;

    async fn resources(
        ctx: &mut Context,
        input: &StackInput<AzureDnsZoneSpec, AzureProviderConfig>,
    ) -> Result<()> {
        let spec = input.spec();
        let tags = labels::standard_labels(input.metadata(), Self::KIND);

        let provider = AzureProvider::from_config(input.provider_config.as_ref())
            .context("failed to create azure provider")?;
        let provider = ctx.register_provider("azure", &provider).await?;

        let mut zone_options = ResourceOptions::new().provider(&provider);
        if spec.create_resource_group {
            let group = ctx
                .register(
                    RESOURCE_GROUP,
                    &spec.resource_group,
                    &ResourceGroupArgs {
                        name: &spec.resource_group,
                        location: &spec.location,
                        tags: &tags,
                    },
                    ResourceOptions::new().provider(&provider),
                )
                .await
                .with_context(|| format!("failed to create resource group {}", spec.resource_group))?;
            zone_options = zone_options.depends_on(&group);
        }

        let zone = ctx
            .register(
                ZONE,
                &spec.zone_name,
                &ZoneArgs {
                    name: &spec.zone_name,
                    resource_group_name: &spec.resource_group,
                    tags: &tags,
                },
                zone_options,
            )
            .await
            .with_context(|| format!("failed to create DNS zone for {}", spec.zone_name))?;

        for (i, record) in spec.records.iter().enumerate() {
            let (type_token, payload) = record_payload(record);
            let Some(payload) = payload else {
                ctx.warn(format!(
                    "skipping {} record {}: no value",
                    record.record_type, record.name
                ));
                continue;
            };

            let logical_name = format!(
                "dns-{}-record-{}",
                record.record_type.as_str().to_lowercase(),
                i
            );
            ctx.register(
                type_token,
                &logical_name,
                &RecordArgs {
                    name: &record.name,
                    zone_name: &spec.zone_name,
                    resource_group_name: &spec.resource_group,
                    ttl: record.ttl_seconds,
                    payload,
                    tags: &tags,
                },
                ResourceOptions::new().provider(&provider).parent(&zone),
            )
            .await
            .with_context(|| format!("failed to create {} record {}", record.record_type, record.name))?;
        }

        ctx.export("zone_id", zone.id.clone())?;
        ctx.export("zone_name", spec.zone_name.clone())?;
        ctx.export("nameservers", zone.output("nameServers"))?;
        ctx.export("resource_group", spec.resource_group.clone())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackcraft_cloud::{Engine, RecordingEngine, ResourceRef, ResourceRequest, RunResult};
    use stackcraft_core::{InputFormat, RawStackInput, run_module};
    use std::sync::Arc;

    async fn provision(yaml: &str) -> (Arc<RecordingEngine>, Result<RunResult>) {
        let raw = RawStackInput::parse(yaml, InputFormat::Yaml).unwrap();
        let engine = Arc::new(RecordingEngine::new());
        let mut ctx = Context::new(engine.clone(), "test", "dev");
        let result = run_module::<DnsZoneModule>(&mut ctx, raw)
            .await
            .map(|_| ctx.finish());
        (engine, result)
    }

    const ZONE_WITH_RECORDS: &str = r#"
target:
  kind: AzureDnsZone
  metadata:
    name: example-zone
    env: prod
  spec:
    zoneName: example.com
    resourceGroup: dns-rg
    records:
      - recordType: A
        name: www
        values: ["20.1.2.3", "20.1.2.4"]
        ttlSeconds: 60
      - recordType: CNAME
        name: blog
        values: ["blog.hosting.example"]
      - recordType: MX
        name: "@"
        values: ["mx1.example.com"]
      - recordType: CAA
        name: "@"
        values: ["letsencrypt.org"]
      - recordType: SRV
        name: _sip._tcp
        values: ["sip.example.com"]
"#;

    #[tokio::test]
    async fn test_zone_and_records() {
        let (engine, result) = provision(ZONE_WITH_RECORDS).await;
        let result = result.unwrap();

        assert!(engine.by_type(RESOURCE_GROUP).is_empty());
        let zone = engine.find(ZONE, "example.com").unwrap();
        assert_eq!(zone.args["resourceGroupName"], "dns-rg");
        assert_eq!(zone.args["tags"]["environment"], "prod");

        let a = engine.find("azure:dns/aRecord:ARecord", "dns-a-record-0").unwrap();
        assert_eq!(a.args["ttl"], 60);
        assert_eq!(a.args["records"], json!(["20.1.2.3", "20.1.2.4"]));
        assert_eq!(a.args["zoneName"], "example.com");
        assert_eq!(a.options.parent.as_deref(), Some(zone.urn.as_str()));

        let cname = engine
            .find("azure:dns/cNameRecord:CNameRecord", "dns-cname-record-1")
            .unwrap();
        assert_eq!(cname.args["record"], "blog.hosting.example");
        assert_eq!(cname.args["ttl"], 300);

        let mx = engine.find("azure:dns/mxRecord:MxRecord", "dns-mx-record-2").unwrap();
        assert_eq!(
            mx.args["records"],
            json!([{ "preference": "10", "exchange": "mx1.example.com" }])
        );

        let caa = engine.find("azure:dns/caaRecord:CaaRecord", "dns-caa-record-3").unwrap();
        assert_eq!(
            caa.args["records"][0],
            json!({ "flags": 0, "tag": "issue", "value": "letsencrypt.org" })
        );

        let srv = engine.find("azure:dns/srvRecord:SrvRecord", "dns-srv-record-4").unwrap();
        assert_eq!(srv.args["records"][0]["port"], 80);

        assert_eq!(result.outputs.get_str("zone_id"), Some("example.com"));
        assert_eq!(result.outputs.get_str("resource_group"), Some("dns-rg"));
        assert!(result.outputs.contains_key("nameservers"));
    }

    #[tokio::test]
    async fn test_created_resource_group() {
        let yaml = "target: {kind: AzureDnsZone, metadata: {name: z}, spec: {zoneName: example.org, resourceGroup: new-rg, createResourceGroup: true, location: westeurope}}";
        let (engine, result) = provision(yaml).await;
        result.unwrap();

        let group = engine.find(RESOURCE_GROUP, "new-rg").unwrap();
        assert_eq!(group.args["location"], "westeurope");
        let zone = engine.find(ZONE, "example.org").unwrap();
        assert_eq!(zone.options.depends_on, vec![group.urn]);
    }

    /// Engine whose physical ids are ARM resource paths, not names
    struct ArmEngine {
        inner: RecordingEngine,
    }

    #[async_trait]
    impl Engine for ArmEngine {
        fn name(&self) -> &str {
            "arm"
        }

        async fn register_resource(
            &self,
            request: ResourceRequest,
        ) -> stackcraft_cloud::Result<ResourceRef> {
            let mut resource = self.inner.register_resource(request).await?;
            resource.id = format!("/subscriptions/sub-1/resourceGroups/x/providers/{}", resource.name);
            Ok(resource)
        }
    }

    #[tokio::test]
    async fn test_records_reference_names_not_ids() {
        let yaml = r#"
target:
  kind: AzureDnsZone
  metadata:
    name: z
  spec:
    zoneName: example.com
    resourceGroup: dns-rg
    createResourceGroup: true
    location: westeurope
    records:
      - recordType: A
        name: www
        values: ["20.1.2.3"]
"#;
        let raw = RawStackInput::parse(yaml, InputFormat::Yaml).unwrap();
        let engine = Arc::new(ArmEngine {
            inner: RecordingEngine::new(),
        });
        let mut ctx = Context::new(engine.clone(), "test", "dev");
        run_module::<DnsZoneModule>(&mut ctx, raw).await.unwrap();
        let result = ctx.finish();

        let zone = engine.inner.find(ZONE, "example.com").unwrap();
        assert_eq!(zone.args["resourceGroupName"], "dns-rg");
        let a = engine.inner.find("azure:dns/aRecord:ARecord", "dns-a-record-0").unwrap();
        assert_eq!(a.args["zoneName"], "example.com");
        assert_eq!(a.args["resourceGroupName"], "dns-rg");

        assert_eq!(result.outputs.get_str("resource_group"), Some("dns-rg"));
        assert_eq!(
            result.outputs.get_str("zone_id"),
            Some("/subscriptions/sub-1/resourceGroups/x/providers/example.com")
        );
    }

    #[tokio::test]
    async fn test_cname_without_value_is_skipped() {
        let yaml = "target: {kind: AzureDnsZone, metadata: {name: z}, spec: {zoneName: example.org, resourceGroup: rg, records: [{recordType: CNAME, name: empty}]}}";
        let (engine, result) = provision(yaml).await;
        let result = result.unwrap();

        assert!(engine.by_type("azure:dns/cNameRecord:CNameRecord").is_empty());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_validation() {
        let spec = AzureDnsZoneSpec {
            zone_name: "example.org".into(),
            resource_group: "rg".into(),
            create_resource_group: true,
            ..Default::default()
        };
        assert_eq!(
            spec.validate().unwrap_err().to_string(),
            "invalid spec.location: is required when create_resource_group is set"
        );

        let spec = AzureDnsZoneSpec {
            zone_name: "example.org".into(),
            resource_group: "rg".into(),
            records: vec![AzureDnsRecord {
                record_type: DnsRecordType::Txt,
                name: "@".into(),
                values: vec![],
                ttl_seconds: 300,
            }],
            ..Default::default()
        };
        assert!(spec.validate().is_err());
    }

    #[tokio::test]
    async fn test_record_failure_stops_the_run() {
        let raw = RawStackInput::parse(ZONE_WITH_RECORDS, InputFormat::Yaml).unwrap();
        let engine = Arc::new(RecordingEngine::failing_on("azure:dns/mxRecord:MxRecord"));
        let mut ctx = Context::new(engine.clone(), "test", "dev");

        let err = run_module::<DnsZoneModule>(&mut ctx, raw).await.unwrap_err();
        assert!(err.to_string().starts_with("failed to create MX record @"));
        assert!(engine.by_type("azure:dns/caaRecord:CaaRecord").is_empty());
        assert!(!ctx.outputs().contains_key("zone_id"));
    }
}
