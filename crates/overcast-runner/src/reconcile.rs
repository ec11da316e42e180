//! Adoption of resources left by an earlier run
//!
//! Resources are matched purely by name: anything ending in the run's suffix
//! is taken to belong to it, under the name with the suffix removed.

use crate::error::{DeployError, Result};
use crate::node::{Node, Port};
use crate::provisioner::Provisioner;
use overcast_core::Suffix;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, instrument};

fn adopt<'a>(
    suffix: &Suffix,
    kind: &'static str,
    name: &'a str,
    known: impl Fn(&str) -> bool,
) -> Result<Option<&'a str>> {
    let Some(base) = suffix.strip(name).filter(|base| !base.is_empty()) else {
        return Ok(None);
    };
    if known(base) {
        return Err(DeployError::DuplicateResource {
            kind,
            name: base.to_string(),
        });
    }
    Ok(Some(base))
}

/// Fill the naming tables and node records from what already exists in the cloud
#[instrument(skip_all)]
pub async fn detect_existing_resources(
    provisioner: &mut Provisioner,
    nodes: &mut BTreeMap<String, Node>,
) -> Result<()> {
    let clients = provisioner.clients().clone();
    let suffix = provisioner.suffix().clone();

    let mut network_names = HashMap::new();
    for network in clients.network.list_networks().await? {
        let Some(base) = adopt(&suffix, "network", &network.name, |base| {
            provisioner.networks.contains_key(base)
        })?
        else {
            continue;
        };
        debug!(network = base, id = %network.id, "Adopted network");
        provisioner
            .networks
            .insert(base.to_string(), network.id.clone());
        network_names.insert(network.id, base.to_string());
    }

    let mut ports: Vec<Port> = clients
        .network
        .list_ports(None)
        .await?
        .into_iter()
        .filter_map(|info| {
            let fixed_ip = info.first_fixed_ip()?.to_string();
            Some(Port {
                network_name: network_names
                    .get(&info.network_id)
                    .cloned()
                    .unwrap_or_else(|| info.network_id.clone()),
                id: info.id,
                fixed_ip,
                mac: info.mac_address,
                floating_ip: None,
            })
        })
        .collect();

    for fip in clients.network.list_floating_ips().await? {
        let Some(port_id) = fip.port_id else {
            continue;
        };
        if let Some(port) = ports.iter_mut().find(|port| port.id == port_id) {
            port.floating_ip = Some(fip.floating_ip_address);
        }
    }

    for group in clients.network.list_security_groups().await? {
        let Some(base) = adopt(&suffix, "security group", &group.name, |base| {
            provisioner.security_groups.contains_key(base)
        })?
        else {
            continue;
        };
        debug!(security_group = base, id = %group.id, "Adopted security group");
        provisioner
            .security_groups
            .insert(base.to_string(), group.id);
    }

    let ports_by_mac: HashMap<String, Port> = ports
        .into_iter()
        .map(|port| (port.mac.clone(), port))
        .collect();

    for server in clients.compute.list_servers().await? {
        let Some(base) = adopt(&suffix, "node", &server.name, |base| nodes.contains_key(base))?
        else {
            continue;
        };
        let node_ports = server
            .mac_addresses
            .iter()
            .filter_map(|mac| ports_by_mac.get(mac).cloned())
            .collect();
        info!(node = base, server = %server.id, "Adopted node");
        nodes.insert(
            base.to_string(),
            Node::adopted(server.name.clone(), server.id, node_ports),
        );
    }

    Ok(())
}
