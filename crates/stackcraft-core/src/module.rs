//! Harness shared by every resource module

use crate::error::StackInputError;
use crate::loader::RawStackInput;
use crate::model::{CloudResourceKind, StackInput};
use crate::validate::Validate;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use stackcraft_cloud::Context;
use tracing::info;

/// A provisioning module for one resource kind
///
/// Implementations build their locals from the input, set up the provider,
/// register resources in dependency order and export outputs. The first
/// failing registration ends the run.
#[async_trait]
pub trait ResourceModule {
    const KIND: CloudResourceKind;

    type Spec: DeserializeOwned + Validate + Send + Sync;
    type ProviderConfig: DeserializeOwned + Send + Sync;
    type Error: From<StackInputError> + Send;

    async fn resources(
        ctx: &mut Context,
        input: &StackInput<Self::Spec, Self::ProviderConfig>,
    ) -> Result<(), Self::Error>;
}

/// Type the raw input for `M` and run it against `ctx`
pub async fn run_module<M: ResourceModule>(
    ctx: &mut Context,
    raw: RawStackInput,
) -> Result<(), M::Error> {
    let input = raw.into_typed::<M::Spec, M::ProviderConfig>(M::KIND)?;
    info!(
        kind = %M::KIND,
        name = %input.metadata().name,
        stack = ctx.stack(),
        "Provisioning resource"
    );

    M::resources(ctx, &input).await?;

    info!(
        resources = ctx.resources().len(),
        outputs = ctx.outputs().len(),
        "Provisioning complete"
    );
    Ok(())
}
