//! Ledger replay
//!
//! Deletes recorded resources newest first. A failed deletion is logged and
//! collected; it never stops the remaining entries.

use overcast_cloud::{
    CloudClients, CloudError, LedgerEntry, ROUTER_INTERFACE_OWNER, ResourceKind, read_ledger,
};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Outcome of replaying a ledger
#[derive(Debug, Clone, Default)]
pub struct TeardownReport {
    /// Entries deleted successfully
    pub succeeded: Vec<LedgerEntry>,

    /// Entries whose deletion failed, with the error message
    pub failed: Vec<(LedgerEntry, String)>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl TeardownReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn add_success(&mut self, entry: LedgerEntry) {
        self.succeeded.push(entry);
    }

    pub fn add_failure(&mut self, entry: LedgerEntry, error: String) {
        self.failed.push((entry, error));
    }
}

/// Delete one resource by kind
pub async fn delete_resource(
    clients: &CloudClients,
    kind: ResourceKind,
    id: &str,
) -> overcast_cloud::Result<()> {
    match kind {
        ResourceKind::Keypair => clients.compute.delete_keypair(id).await,
        ResourceKind::Network => clients.network.delete_network(id).await,
        ResourceKind::Subnet => delete_subnet(clients, id).await,
        ResourceKind::Secgroup => clients.network.delete_security_group(id).await,
        ResourceKind::SecgroupRule => clients.network.delete_security_group_rule(id).await,
        ResourceKind::Port => clients.network.delete_port(id).await,
        ResourceKind::Floatingip => clients.network.delete_floating_ip(id).await,
        ResourceKind::Volume => clients.volume.delete_volume(id).await,
        ResourceKind::Server => clients.compute.delete_server(id).await,
    }
}

/// Delete a subnet, detaching it from its router once if the deletion conflicts
async fn delete_subnet(clients: &CloudClients, id: &str) -> overcast_cloud::Result<()> {
    let conflict = match clients.network.delete_subnet(id).await {
        Err(CloudError::Conflict(message)) => message,
        other => return other,
    };

    let interface = clients
        .network
        .list_ports(Some(ROUTER_INTERFACE_OWNER))
        .await?
        .into_iter()
        .find(|port| port.references_subnet(id));

    let Some(interface) = interface else {
        return Err(CloudError::Conflict(conflict));
    };

    info!(router = %interface.device_id, subnet = id, "Detaching subnet from router");
    clients
        .network
        .remove_router_interface(&interface.device_id, id)
        .await?;
    clients.network.delete_subnet(id).await
}

/// Delete every entry, last created first
#[instrument(skip_all, fields(entries = entries.len()))]
pub async fn teardown(clients: &CloudClients, entries: &[LedgerEntry]) -> TeardownReport {
    let start = Instant::now();
    let mut report = TeardownReport::new();

    for entry in entries.iter().rev() {
        debug!(%entry, "Deleting");
        match delete_resource(clients, entry.kind, &entry.id).await {
            Ok(()) => {
                info!(kind = %entry.kind, id = %entry.id, "Deleted");
                report.add_success(entry.clone());
            }
            Err(e) => {
                warn!(kind = %entry.kind, id = %entry.id, error = %e, "Failed to delete");
                report.add_failure(entry.clone(), e.to_string());
            }
        }
    }

    report.duration_ms = start.elapsed().as_millis() as u64;
    report
}

/// Read a ledger file and tear down its entries
///
/// The whole file is validated before anything is deleted.
pub async fn teardown_log(
    clients: &CloudClients,
    path: impl AsRef<Path>,
) -> overcast_cloud::Result<TeardownReport> {
    let entries = read_ledger(path).await?;
    Ok(teardown(clients, &entries).await)
}
