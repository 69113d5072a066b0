//! `CloudflareD1Database`: a serverless SQLite database

use crate::error::{CloudflareError, Result};
use crate::provider::{CloudflareProvider, CloudflareProviderConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stackcraft_cloud::{Context, ResourceOptions, ResultExt};
use stackcraft_core::validate::{self, Validate};
use stackcraft_core::{CloudResourceKind, ResourceModule, StackInput};

const D1_DATABASE: &str = "cloudflare:index/d1Database:D1Database";

/// Location hint for the primary copy of the database
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudflareD1Region {
    Weur,
    Eeur,
    Apac,
    Oc,
    Wnam,
    Enam,
    #[default]
    #[serde(other)]
    Unspecified,
}

impl CloudflareD1Region {
    /// `None` leaves placement to Cloudflare
    pub fn as_provider_str(&self) -> Option<&'static str> {
        match self {
            CloudflareD1Region::Unspecified => None,
            CloudflareD1Region::Weur => Some("weur"),
            CloudflareD1Region::Eeur => Some("eeur"),
            CloudflareD1Region::Apac => Some("apac"),
            CloudflareD1Region::Oc => Some("oc"),
            CloudflareD1Region::Wnam => Some("wnam"),
            CloudflareD1Region::Enam => Some("enam"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadReplicationMode {
    Auto,
    #[default]
    Disabled,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadReplication {
    pub mode: ReadReplicationMode,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CloudflareD1DatabaseSpec {
    pub account_id: String,
    pub database_name: String,
    pub region: CloudflareD1Region,
    pub read_replication: Option<ReadReplication>,
}

impl Validate for CloudflareD1DatabaseSpec {
    fn validate(&self) -> stackcraft_core::Result<()> {
        validate::require("spec.account_id", &self.account_id)?;
        validate::require("spec.database_name", &self.database_name)?;
        validate::length_between("spec.database_name", &self.database_name, 1, 64)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct D1DatabaseArgs<'a> {
    account_id: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    primary_location_hint: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    read_replication: Option<&'a ReadReplication>,
}

pub struct D1DatabaseModule;

#[async_trait]
impl ResourceModule for D1DatabaseModule {
    const KIND: CloudResourceKind = CloudResourceKind::CloudflareD1Database;
    type Spec = CloudflareD1DatabaseSpec;
    type ProviderConfig = CloudflareProviderConfig;
    type Error = CloudflareError;

    async fn resources(
        ctx: &mut Context,
        input: &StackInput<CloudflareD1DatabaseSpec, CloudflareProviderConfig>,
    ) -> Result<()> {
        let spec = input.spec();

        let provider = CloudflareProvider::from_config(input.provider_config.as_ref())?;
        let provider = ctx.register_provider("cloudflare", &provider).await?;

        let database = ctx
            .register(
                D1_DATABASE,
                "database",
                &D1DatabaseArgs {
                    account_id: &spec.account_id,
                    name: &spec.database_name,
                    primary_location_hint: spec.region.as_provider_str(),
                    read_replication: spec.read_replication.as_ref(),
                },
                ResourceOptions::new().provider(&provider),
            )
            .await
            .with_context(|| format!("failed to create d1 database {}", spec.database_name))?;

        ctx.export("database_id", database.id.clone())?;
        ctx.export("database_name", database.output("name"))?;

        // D1 is reached through Worker bindings, there is no URL to hand out
        ctx.warn("connection_string is not exported for D1 databases; bind the database to a Worker instead");
        Ok(())
    }
}
