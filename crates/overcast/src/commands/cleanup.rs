use anyhow::Context;
use colored::Colorize;
use overcast_cloud::read_ledger;
use overcast_openstack::OpenStack;
use overcast_runner::teardown;
use std::path::Path;

/// Delete everything in the log. Individual failures are reported, not fatal.
pub async fn handle(log: &Path) -> anyhow::Result<()> {
    let entries = read_ledger(log)
        .await
        .with_context(|| format!("Failed to read cleanup log {}", log.display()))?;

    if entries.is_empty() {
        println!("{}", "Nothing to clean up".yellow());
        return Ok(());
    }

    let clients = OpenStack::connect()
        .await
        .context("Failed to connect to OpenStack")?;

    println!(
        "Deleting {} resource(s) from {}",
        entries.len().to_string().cyan(),
        log.display()
    );
    let report = teardown(&clients, &entries).await;

    for (entry, error) in &report.failed {
        eprintln!("  {} {}: {}", "✗".red(), entry, error);
    }

    println!();
    let summary = format!(
        "{} deleted, {} failed ({} ms)",
        report.succeeded.len(),
        report.failed.len(),
        report.duration_ms
    );
    if report.is_success() {
        println!("{}", summary.green().bold());
    } else {
        println!("{}", summary.yellow().bold());
    }
    Ok(())
}
