mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "overcast")]
#[command(about = "Provision OpenStack stacks and run deployments against them", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the images and flavors a stack refers to
    ListRefs {
        /// Print an INI mappings template instead
        #[arg(long)]
        tmpl: bool,
        /// YAML file describing the stack
        stack: PathBuf,
    },
    /// Run a deployment
    Deploy {
        /// Deployment config file
        #[arg(long, default_value = ".overcast.yaml")]
        cfg: PathBuf,
        /// Suffix appended to every resource name
        #[arg(long, env = "OVERCAST_SUFFIX")]
        suffix: Option<String>,
        /// INI file mapping logical names to cloud resources
        #[arg(long)]
        mappings: Option<PathBuf>,
        /// Public key file installed on every node
        #[arg(long)]
        key: Option<PathBuf>,
        /// Record created resources in this file (appended)
        #[arg(long)]
        cleanup: Option<PathBuf>,
        /// Rebuild a node this many times before giving up
        #[arg(long, default_value_t = 0)]
        retry_count: u32,
        /// Reuse resources that already exist with the same names
        #[arg(long)]
        incremental: bool,
        /// Deployment to perform
        name: String,
    },
    /// Delete every resource recorded in a cleanup log
    Cleanup {
        /// Cleanup log written by `deploy --cleanup`
        log: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match cli.command {
        Commands::ListRefs { tmpl, stack } => commands::list_refs::handle(&stack, tmpl),
        Commands::Deploy {
            cfg,
            suffix,
            mappings,
            key,
            cleanup,
            retry_count,
            incremental,
            name,
        } => {
            commands::deploy::handle(commands::deploy::DeployArgs {
                cfg,
                suffix,
                mappings,
                key,
                cleanup,
                retry_count,
                incremental,
                name,
            })
            .await
        }
        Commands::Cleanup { log } => commands::cleanup::handle(&log).await,
    }
}
