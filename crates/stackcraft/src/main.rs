mod commands;
mod runner;

use clap::{Args, Parser, Subcommand, ValueEnum};
use stackcraft_core::ProviderKind;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stackcraft")]
#[command(version, about = "Provision cloud resources from a single stack input", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where the input comes from and which stack it runs against
#[derive(Args, Clone)]
pub struct StackArgs {
    /// Stack input file (default: stack-input.yaml in the current directory)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Stack name (dev, stg, prod...)
    #[arg(short, long, env = "STACKCRAFT_STACK")]
    stack: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the resource kinds stackcraft can provision
    Kinds,
    /// Show what `up` would change
    Preview(StackArgs),
    /// Provision the input and save the stack state
    Up(StackArgs),
    /// Plan deletion of everything in the stack state and clear it
    Destroy {
        /// Stack name (dev, stg, prod...)
        #[arg(short, long, env = "STACKCRAFT_STACK")]
        stack: Option<String>,
        /// Clear the state without asking
        #[arg(short, long)]
        yes: bool,
    },
    /// Print the outputs saved by the last `up`
    Outputs {
        /// Print a single output value
        key: Option<String>,
        /// Stack name (dev, stg, prod...)
        #[arg(short, long, env = "STACKCRAFT_STACK")]
        stack: Option<String>,
    },
    /// Check the credentials for the input's provider
    Auth {
        /// Stack input file (default: stack-input.yaml in the current directory)
        #[arg(short, long, conflicts_with = "provider")]
        input: Option<PathBuf>,
        /// Check a provider's environment credentials without an input
        #[arg(short, long)]
        provider: Option<ProviderArg>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ProviderArg {
    Cloudflare,
    Aws,
    Gcp,
    Azure,
    Kubernetes,
}

impl From<ProviderArg> for ProviderKind {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Cloudflare => ProviderKind::Cloudflare,
            ProviderArg::Aws => ProviderKind::Aws,
            ProviderArg::Gcp => ProviderKind::Gcp,
            ProviderArg::Azure => ProviderKind::Azure,
            ProviderArg::Kubernetes => ProviderKind::Kubernetes,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Kinds => commands::kinds::handle(),
        Commands::Preview(args) => commands::preview::handle(args).await,
        Commands::Up(args) => commands::up::handle(args).await,
        Commands::Destroy { stack, yes } => commands::destroy::handle(stack, yes).await,
        Commands::Outputs { key, stack } => commands::outputs::handle(key, stack).await,
        Commands::Auth { input, provider } => {
            commands::auth::handle(input, provider.map(ProviderKind::from)).await
        }
    }
}
