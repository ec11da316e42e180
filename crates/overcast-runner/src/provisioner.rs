//! Cloud API glue
//!
//! Wraps the per-service clients with the run's naming tables, mapping
//! overrides and resource ledger. Every create call records its resource
//! before returning, so a failure later in the run still leaves it in the
//! ledger for teardown.

use crate::error::{DeployError, Result};
use crate::node::Port;
use crate::teardown;
use overcast_cloud::{
    CloudClients, CloudError, FloatingIpInfo, PortRequest, RemoteSource, ResourceKind,
    ResourceLedger, SecurityGroupRuleRequest,
};
use overcast_core::{Mappings, NetworkSpec, RuleList, RuleSource, Suffix};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

pub struct Provisioner {
    clients: CloudClients,
    ledger: Arc<dyn ResourceLedger>,
    mappings: Mappings,
    suffix: Suffix,
    /// Logical network name → id
    pub(crate) networks: BTreeMap<String, String>,
    /// Logical security group name → id
    pub(crate) security_groups: BTreeMap<String, String>,
}

impl Provisioner {
    pub fn new(
        clients: CloudClients,
        ledger: Arc<dyn ResourceLedger>,
        mappings: Mappings,
        suffix: Suffix,
    ) -> Self {
        Self {
            clients,
            ledger,
            mappings,
            suffix,
            networks: BTreeMap::new(),
            security_groups: BTreeMap::new(),
        }
    }

    pub fn clients(&self) -> &CloudClients {
        &self.clients
    }

    pub fn mappings(&self) -> &Mappings {
        &self.mappings
    }

    pub fn suffix(&self) -> &Suffix {
        &self.suffix
    }

    pub(crate) fn set_ledger(&mut self, ledger: Arc<dyn ResourceLedger>) {
        self.ledger = ledger;
    }

    pub async fn record(&self, kind: ResourceKind, id: &str) -> Result<()> {
        self.ledger.record(kind, id).await?;
        Ok(())
    }

    /// Whether a logical network already has an id (mapping override or naming table)
    pub fn network_known(&self, name: &str) -> bool {
        self.mappings.network(name).is_some() || self.networks.contains_key(name)
    }

    /// Network id for a logical name: mapping override, then naming table, then the name itself
    pub fn resolve_network(&self, name: &str) -> String {
        self.mappings
            .network(name)
            .or_else(|| self.networks.get(name).map(String::as_str))
            .unwrap_or(name)
            .to_string()
    }

    /// Security group id for a logical name, or the name itself when unknown
    pub fn resolve_security_group(&self, name: &str) -> String {
        self.security_groups
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Create a network with one subnet, attached to the default router if one is mapped
    pub async fn create_network(&mut self, base_name: &str, spec: &NetworkSpec) -> Result<String> {
        let name = self.suffix.apply(base_name);
        let network = self.clients.network.create_network(&name).await?;
        self.record(ResourceKind::Network, &network.id).await?;
        info!(network = %name, id = %network.id, "Created network");

        let subnet = self
            .clients
            .network
            .create_subnet(&network.id, &name, &spec.cidr)
            .await?;
        self.record(ResourceKind::Subnet, &subnet.id).await?;
        debug!(subnet = %subnet.id, cidr = %spec.cidr, "Created subnet");

        if let Some(router) = self.mappings.default_router() {
            self.clients
                .network
                .add_router_interface(router, &subnet.id)
                .await?;
            debug!(router, subnet = %subnet.id, "Attached subnet to router");
        }

        self.networks.insert(base_name.to_string(), network.id.clone());
        Ok(network.id)
    }

    /// Create the security groups that are not yet known, then their rules
    ///
    /// All groups exist before the first rule is created, so rules may refer
    /// to any group of the same stack regardless of declaration order.
    pub async fn create_security_groups(
        &mut self,
        groups: &BTreeMap<String, RuleList>,
    ) -> Result<()> {
        let mut created = Vec::new();
        for base_name in groups.keys() {
            if self.security_groups.contains_key(base_name) {
                continue;
            }
            let name = self.suffix.apply(base_name);
            let group = self.clients.network.create_security_group(&name).await?;
            self.record(ResourceKind::Secgroup, &group.id).await?;
            info!(security_group = %name, id = %group.id, "Created security group");
            self.security_groups
                .insert(base_name.clone(), group.id.clone());
            created.push((base_name.as_str(), group.id));
        }

        for (base_name, group_id) in created {
            for rule in groups[base_name].iter() {
                let remote = match &rule.source {
                    RuleSource::Group { source_group } => {
                        RemoteSource::Group(self.resolve_security_group(source_group))
                    }
                    RuleSource::Cidr { cidr } => RemoteSource::IpPrefix(cidr.clone()),
                };
                let request = SecurityGroupRuleRequest {
                    security_group_id: group_id.clone(),
                    protocol: rule.protocol.clone(),
                    port_range_min: rule.from_port,
                    port_range_max: rule.to_port,
                    remote,
                };
                let rule_id = self
                    .clients
                    .network
                    .create_security_group_rule(&request)
                    .await?;
                self.record(ResourceKind::SecgroupRule, &rule_id).await?;
                debug!(security_group = %base_name, rule = %rule_id, "Created rule");
            }
        }
        Ok(())
    }

    /// Create a port on a logical network
    pub async fn create_port(
        &self,
        name: &str,
        network: &str,
        security_groups: &[String],
    ) -> Result<Port> {
        let request = PortRequest {
            name: name.to_string(),
            network_id: self.resolve_network(network),
            security_groups: security_groups
                .iter()
                .map(|group| self.resolve_security_group(group))
                .collect(),
        };
        let info = self.clients.network.create_port(&request).await?;
        self.record(ResourceKind::Port, &info.id).await?;

        let fixed_ip = info
            .first_fixed_ip()
            .ok_or_else(|| CloudError::InvalidResponse(format!("port {} has no fixed IP", info.id)))?
            .to_string();
        debug!(port = %info.id, %fixed_ip, "Created port");

        Ok(Port {
            id: info.id,
            fixed_ip,
            mac: info.mac_address,
            network_name: network.to_string(),
            floating_ip: None,
        })
    }

    async fn find_floating_network(&self) -> Result<String> {
        self.clients
            .network
            .list_networks()
            .await?
            .into_iter()
            .find(|network| network.external)
            .map(|network| network.id)
            .ok_or(DeployError::NoExternalNetwork)
    }

    /// Allocate a floating IP from the first external network and attach it to a port
    pub async fn attach_floating_ip(&self, port_id: &str) -> Result<FloatingIpInfo> {
        let floating_network = self.find_floating_network().await?;
        let fip = self
            .clients
            .network
            .create_floating_ip(&floating_network)
            .await?;
        self.record(ResourceKind::Floatingip, &fip.id).await?;
        self.clients
            .network
            .associate_floating_ip(&fip.id, port_id)
            .await?;
        info!(address = %fip.floating_ip_address, port = port_id, "Associated floating IP");
        Ok(fip)
    }

    /// Upload the run's public key as `pubkey[_suffix]`
    ///
    /// A name conflict means the key pair already exists; it is reused and
    /// not recorded, so teardown leaves it alone.
    pub async fn ensure_keypair(&self, public_key: &str) -> Result<String> {
        let name = self.suffix.apply("pubkey");
        match self.clients.compute.create_keypair(&name, public_key).await {
            Ok(()) => {
                self.record(ResourceKind::Keypair, &name).await?;
                info!(keypair = %name, "Created key pair");
            }
            Err(CloudError::Conflict(_)) => {
                debug!(keypair = %name, "Key pair already exists");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(name)
    }

    /// Delete one resource, treating an already-absent resource as deleted
    pub async fn delete_if_present(&self, kind: ResourceKind, id: &str) -> Result<()> {
        match teardown::delete_resource(&self.clients, kind, id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                debug!(%kind, id, "Already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
