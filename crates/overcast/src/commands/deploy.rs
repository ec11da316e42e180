use anyhow::Context;
use colored::Colorize;
use overcast_cloud::FileLedger;
use overcast_core::{Mappings, Suffix, load_config, load_mappings};
use overcast_openstack::OpenStack;
use overcast_runner::{DeploymentRunner, RunnerSettings};
use std::path::PathBuf;
use std::sync::Arc;

pub struct DeployArgs {
    pub cfg: PathBuf,
    pub suffix: Option<String>,
    pub mappings: Option<PathBuf>,
    pub key: Option<PathBuf>,
    pub cleanup: Option<PathBuf>,
    pub retry_count: u32,
    pub incremental: bool,
    pub name: String,
}

pub async fn handle(args: DeployArgs) -> anyhow::Result<()> {
    let config = load_config(&args.cfg)
        .with_context(|| format!("Failed to load deployment config {}", args.cfg.display()))?;
    if config.deployment(&args.name).is_none() {
        let available: Vec<&str> = config.names().collect();
        anyhow::bail!(
            "Deployment '{}' not found in {} (available: {})",
            args.name,
            args.cfg.display(),
            available.join(", ")
        );
    }

    let mappings = match &args.mappings {
        Some(path) => load_mappings(path)
            .with_context(|| format!("Failed to load mappings {}", path.display()))?,
        None => Mappings::default(),
    };

    let public_key = match &args.key {
        Some(path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read public key {}", path.display()))?,
        ),
        None => None,
    };

    let settings = RunnerSettings {
        suffix: Suffix::new(args.suffix.clone()),
        retry_count: args.retry_count,
        public_key,
        ..RunnerSettings::default()
    };

    println!("{}", "Connecting to OpenStack...".blue());
    let clients = OpenStack::connect()
        .await
        .context("Failed to connect to OpenStack")?;

    let mut runner = DeploymentRunner::new(clients, config, mappings, settings);
    if let Some(log) = &args.cleanup {
        let ledger = FileLedger::open(log)
            .await
            .with_context(|| format!("Failed to open cleanup log {}", log.display()))?;
        println!("Recording resources in {}", log.display().to_string().cyan());
        runner = runner.with_ledger(Arc::new(ledger));
    }

    if args.incremental {
        runner
            .detect_existing_resources()
            .await
            .context("Failed to detect existing resources")?;
        println!(
            "Reusing {} existing node(s)",
            runner.nodes().len().to_string().cyan()
        );
    }

    println!("Running deployment {}", args.name.cyan());
    runner.deploy(&args.name).await?;

    println!();
    println!("{}", "✓ Deployment finished".green().bold());
    for (name, node) in runner.nodes() {
        let address = node.floating_ip().unwrap_or("-");
        println!("  {} {} ({})", "•".cyan(), name, address);
    }
    Ok(())
}
