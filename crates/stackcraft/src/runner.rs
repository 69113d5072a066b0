//! Shared plumbing for the commands: input discovery, dispatch by kind,
//! stack state and plan printing

use crate::StackArgs;
use anyhow::Context as _;
use colored::Colorize;
use stackcraft_cloud::{ActionType, Context, Plan, RecordingEngine, RunResult, StateManager};
use stackcraft_config::Settings;
use stackcraft_core::{CloudResourceKind, RawStackInput, run_module};
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a command needs before it touches a provider
pub struct Session {
    pub settings: Settings,
    pub stack: String,
}

impl Session {
    pub fn load(stack: Option<&str>) -> anyhow::Result<Self> {
        let settings = Settings::load().context("failed to load settings")?;
        let stack = stackcraft_config::resolve_stack(stack, &settings);
        Ok(Self { settings, stack })
    }

    pub fn state(&self) -> StateManager {
        StateManager::with_state_dir(self.settings.state_dir(), &self.stack)
    }
}

/// Locate and parse the stack input
pub fn load_input(input: Option<PathBuf>) -> anyhow::Result<(PathBuf, RawStackInput)> {
    let path = match input {
        Some(path) => path,
        None => stackcraft_config::find_stack_input()?,
    };
    let raw = RawStackInput::from_path(&path)
        .with_context(|| format!("failed to load stack input {}", path.display()))?;
    tracing::debug!(kind = %raw.kind(), "Loaded stack input from {}", path.display());
    Ok((path, raw))
}

/// Run the module for the input's kind on the recording engine
pub async fn provision(raw: RawStackInput, project: &str, stack: &str) -> anyhow::Result<RunResult> {
    let engine = Arc::new(RecordingEngine::new());
    let mut ctx = Context::new(engine, project, stack);

    match raw.kind() {
        CloudResourceKind::CloudflareR2Bucket => {
            run_module::<stackcraft_cloudflare::R2BucketModule>(&mut ctx, raw).await?
        }
        CloudResourceKind::CloudflareDnsZone => {
            run_module::<stackcraft_cloudflare::DnsZoneModule>(&mut ctx, raw).await?
        }
        CloudResourceKind::CloudflareD1Database => {
            run_module::<stackcraft_cloudflare::D1DatabaseModule>(&mut ctx, raw).await?
        }
        CloudResourceKind::AwsRoute53Zone => {
            run_module::<stackcraft_aws::Route53ZoneModule>(&mut ctx, raw).await?
        }
        CloudResourceKind::AwsS3Bucket => {
            run_module::<stackcraft_aws::S3BucketModule>(&mut ctx, raw).await?
        }
        CloudResourceKind::GcpGcsBucket => {
            run_module::<stackcraft_gcp::GcsBucketModule>(&mut ctx, raw).await?
        }
        CloudResourceKind::AzureDnsZone => {
            run_module::<stackcraft_azure::DnsZoneModule>(&mut ctx, raw).await?
        }
        CloudResourceKind::KubernetesNamespace => {
            run_module::<stackcraft_kubernetes::NamespaceModule>(&mut ctx, raw).await?
        }
        CloudResourceKind::KubernetesExternalDns => {
            run_module::<stackcraft_kubernetes::ExternalDnsModule>(&mut ctx, raw).await?
        }
    }

    Ok(ctx.finish())
}

/// Run the input and diff it against the saved state
pub async fn plan(args: StackArgs) -> anyhow::Result<(Session, RunResult, Plan)> {
    let session = Session::load(args.stack.as_deref())?;
    let (path, raw) = load_input(args.input)?;

    println!("Input: {}", path.display().to_string().cyan());
    println!("Kind:  {}", raw.kind().to_string().cyan());
    println!("Stack: {}", session.stack.cyan());

    let result = provision(raw, session.settings.project(), &session.stack).await?;
    let state = session
        .state()
        .load()
        .await
        .context("failed to load stack state")?;
    let plan = Plan::between(&state, &result.resources);

    Ok((session, result, plan))
}

pub fn print_plan(plan: &Plan) {
    println!();
    if plan.actions.is_empty() {
        println!("{}", "No resources.".dimmed());
        return;
    }

    for action in &plan.actions {
        let line = format!(
            "  {} {} ({})",
            action.action_type.symbol(),
            action.name,
            action.type_token
        );
        match action.action_type {
            ActionType::Create => println!("{}", line.green()),
            ActionType::Update => println!("{}", line.yellow()),
            ActionType::Delete => println!("{}", line.red()),
            ActionType::NoOp => println!("{}", line.dimmed()),
        }
    }

    println!();
    println!("{}", plan.summary().to_string().bold());
}

pub fn print_warnings(warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }
    println!();
    for warning in warnings {
        println!("{} {}", "⚠".yellow(), warning.yellow());
    }
}
