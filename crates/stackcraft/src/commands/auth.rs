use crate::runner;
use anyhow::Context as _;
use colored::Colorize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use stackcraft_cloud::{AuthStatus, CloudProvider};
use stackcraft_core::ProviderKind;
use std::path::PathBuf;

pub async fn handle(input: Option<PathBuf>, provider: Option<ProviderKind>) -> anyhow::Result<()> {
    let (kind, provider_config) = match provider {
        Some(kind) => (kind, None),
        None => {
            let (path, raw) = runner::load_input(input)?;
            println!("Input: {}", path.display().to_string().cyan());
            (raw.kind().provider(), raw.provider_config().cloned())
        }
    };

    let provider = build_provider(kind, provider_config.as_ref())?;
    println!(
        "{}",
        format!("Checking {} credentials...", provider.display_name()).blue()
    );

    let status = provider.check_auth().await?;
    match status {
        AuthStatus::Authenticated { identity } => {
            println!("{}", "✓ Authenticated".green().bold());
            println!("  {}", identity.cyan());
            Ok(())
        }
        AuthStatus::Rejected { reason } => {
            eprintln!("{}", "✗ Not authenticated".red().bold());
            eprintln!("  {}", reason);
            std::process::exit(1);
        }
    }
}

fn typed<C: DeserializeOwned>(config: Option<&Value>) -> anyhow::Result<Option<C>> {
    config
        .map(|value| serde_json::from_value(value.clone()))
        .transpose()
        .context("invalid providerConfig")
}

/// Provider from the input's `providerConfig`, or from the environment
/// when the input has none
fn build_provider(
    kind: ProviderKind,
    config: Option<&Value>,
) -> anyhow::Result<Box<dyn CloudProvider>> {
    use stackcraft_aws::AwsProvider;
    use stackcraft_azure::AzureProvider;
    use stackcraft_cloudflare::CloudflareProvider;
    use stackcraft_gcp::GcpProvider;
    use stackcraft_kubernetes::KubernetesProvider;

    let provider: Box<dyn CloudProvider> = match kind {
        ProviderKind::Cloudflare => match typed(config)? {
            Some(config) => Box::new(CloudflareProvider::from_config(Some(&config))?),
            None => Box::new(CloudflareProvider::from_env()?),
        },
        ProviderKind::Aws => match typed(config)? {
            Some(config) => Box::new(AwsProvider::from_config(Some(&config))?),
            None => Box::new(AwsProvider::from_env()?),
        },
        ProviderKind::Gcp => match typed(config)? {
            Some(config) => Box::new(GcpProvider::from_config(Some(&config))?),
            None => Box::new(GcpProvider::from_env()?),
        },
        ProviderKind::Azure => match typed(config)? {
            Some(config) => Box::new(AzureProvider::from_config(Some(&config))?),
            None => Box::new(AzureProvider::from_env()?),
        },
        ProviderKind::Kubernetes => match typed(config)? {
            Some(config) => Box::new(KubernetesProvider::from_config(Some(&config))?),
            None => Box::new(KubernetesProvider::from_env()?),
        },
    };
    Ok(provider)
}
