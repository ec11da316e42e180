//! In-memory cloud used by the integration tests

use async_trait::async_trait;
use overcast_cloud::{
    CloudClients, CloudError, ComputeApi, FixedIp, FloatingIpInfo, NetworkApi, NetworkInfo,
    PortInfo, PortRequest, ROUTER_INTERFACE_OWNER, Result, SecurityGroupInfo,
    SecurityGroupRuleRequest, ServerInfo, ServerRequest, ServerStatus, SubnetInfo, VolumeApi,
    VolumeInfo, VolumeRequest, VolumeStatus,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

pub const EXTERNAL_NETWORK: &str = "ext-net";

#[derive(Default)]
struct State {
    next_id: u64,
    networks: BTreeMap<String, NetworkInfo>,
    subnets: BTreeMap<String, SubnetInfo>,
    ports: BTreeMap<String, PortInfo>,
    floating_ips: BTreeMap<String, FloatingIpInfo>,
    security_groups: BTreeMap<String, SecurityGroupInfo>,
    rules: BTreeMap<String, SecurityGroupRuleRequest>,
    keypairs: BTreeSet<String>,
    volumes: BTreeMap<String, VolumeInfo>,
    servers: BTreeMap<String, ServerInfo>,
    /// Server id → whether it ends in ERROR
    doomed: HashMap<String, bool>,
    /// Server name → number of upcoming builds that end in ERROR
    failing_builds: HashMap<String, u32>,
    /// Server name → number of create_server calls
    builds: HashMap<String, u32>,
    deletions: Vec<String>,
}

impl State {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{:04}", prefix, self.next_id)
    }
}

fn not_found(what: &str, id: &str) -> CloudError {
    CloudError::NotFound(format!("{} {}", what, id))
}

pub struct FakeCloud {
    state: Mutex<State>,
}

#[allow(dead_code)]
impl FakeCloud {
    /// A cloud holding only an external network for floating IPs
    pub fn new() -> Arc<Self> {
        let mut state = State::default();
        state.networks.insert(
            EXTERNAL_NETWORK.to_string(),
            NetworkInfo {
                id: EXTERNAL_NETWORK.to_string(),
                name: "public".to_string(),
                external: true,
            },
        );
        Arc::new(Self {
            state: Mutex::new(state),
        })
    }

    pub fn clients(self: &Arc<Self>) -> CloudClients {
        CloudClients::from_backend(self.clone())
    }

    /// Make the next `count` builds of the named server end in ERROR
    pub fn fail_builds(&self, server_name: &str, count: u32) {
        self.state
            .lock()
            .unwrap()
            .failing_builds
            .insert(server_name.to_string(), count);
    }

    pub fn builds(&self, server_name: &str) -> u32 {
        let state = self.state.lock().unwrap();
        state.builds.get(server_name).copied().unwrap_or(0)
    }

    /// Ids in the order they were deleted
    pub fn deletions(&self) -> Vec<String> {
        self.state.lock().unwrap().deletions.clone()
    }

    /// Every resource except the pre-existing external network
    pub fn resource_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.networks.len() - 1
            + state.subnets.len()
            + state.ports.len()
            + state.floating_ips.len()
            + state.security_groups.len()
            + state.rules.len()
            + state.keypairs.len()
            + state.volumes.len()
            + state.servers.len()
    }

    pub fn servers(&self) -> Vec<ServerInfo> {
        self.state.lock().unwrap().servers.values().cloned().collect()
    }

    pub fn rules(&self) -> Vec<SecurityGroupRuleRequest> {
        self.state.lock().unwrap().rules.values().cloned().collect()
    }

    pub fn network_id(&self, name: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .networks
            .values()
            .find(|network| network.name == name)
            .map(|network| network.id.clone())
    }

    pub fn security_group_id(&self, name: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .security_groups
            .values()
            .find(|group| group.name == name)
            .map(|group| group.id.clone())
    }
}

#[async_trait]
impl ComputeApi for FakeCloud {
    async fn find_flavor(&self, flavor: &str) -> Result<String> {
        Ok(format!("flavor-{}", flavor))
    }

    async fn create_keypair(&self, name: &str, _public_key: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.keypairs.insert(name.to_string()) {
            return Err(CloudError::Conflict(format!("key pair {} exists", name)));
        }
        Ok(())
    }

    async fn delete_keypair(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.keypairs.remove(name) {
            return Err(not_found("key pair", name));
        }
        state.deletions.push(name.to_string());
        Ok(())
    }

    async fn create_server(&self, request: &ServerRequest) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        if !state.volumes.contains_key(&request.boot_volume_id) {
            return Err(not_found("volume", &request.boot_volume_id));
        }
        let mut mac_addresses = Vec::new();
        for port_id in &request.port_ids {
            let port = state
                .ports
                .get(port_id)
                .ok_or_else(|| not_found("port", port_id))?;
            mac_addresses.push(port.mac_address.clone());
        }

        let id = state.id("srv");
        *state.builds.entry(request.name.clone()).or_default() += 1;
        let doomed = match state.failing_builds.get_mut(&request.name) {
            Some(left) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        };
        state.doomed.insert(id.clone(), doomed);
        state.servers.insert(
            id.clone(),
            ServerInfo {
                id: id.clone(),
                name: request.name.clone(),
                status: ServerStatus::Build,
                mac_addresses,
            },
        );
        Ok(id)
    }

    async fn server_status(&self, id: &str) -> Result<ServerStatus> {
        let mut state = self.state.lock().unwrap();
        let doomed = state.doomed.get(id).copied().unwrap_or(false);
        let server = state
            .servers
            .get_mut(id)
            .ok_or_else(|| not_found("server", id))?;
        if server.status == ServerStatus::Build {
            server.status = if doomed {
                ServerStatus::Error
            } else {
                ServerStatus::Active
            };
            return Ok(ServerStatus::Build);
        }
        Ok(server.status.clone())
    }

    async fn delete_server(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .servers
            .remove(id)
            .ok_or_else(|| not_found("server", id))?;
        state.deletions.push(id.to_string());
        Ok(())
    }

    async fn list_servers(&self) -> Result<Vec<ServerInfo>> {
        Ok(self.servers())
    }
}

#[async_trait]
impl NetworkApi for FakeCloud {
    async fn create_network(&self, name: &str) -> Result<NetworkInfo> {
        let mut state = self.state.lock().unwrap();
        let network = NetworkInfo {
            id: state.id("net"),
            name: name.to_string(),
            external: false,
        };
        state.networks.insert(network.id.clone(), network.clone());
        Ok(network)
    }

    async fn delete_network(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.networks.contains_key(id) {
            return Err(not_found("network", id));
        }
        let in_use = state.subnets.values().any(|subnet| subnet.network_id == id)
            || state.ports.values().any(|port| port.network_id == id);
        if in_use {
            return Err(CloudError::Conflict(format!("network {} in use", id)));
        }
        state.networks.remove(id);
        state.deletions.push(id.to_string());
        Ok(())
    }

    async fn list_networks(&self) -> Result<Vec<NetworkInfo>> {
        Ok(self.state.lock().unwrap().networks.values().cloned().collect())
    }

    async fn create_subnet(&self, network_id: &str, name: &str, _cidr: &str) -> Result<SubnetInfo> {
        let mut state = self.state.lock().unwrap();
        if !state.networks.contains_key(network_id) {
            return Err(not_found("network", network_id));
        }
        let subnet = SubnetInfo {
            id: state.id("subnet"),
            network_id: network_id.to_string(),
            name: name.to_string(),
        };
        state.subnets.insert(subnet.id.clone(), subnet.clone());
        Ok(subnet)
    }

    async fn delete_subnet(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.subnets.contains_key(id) {
            return Err(not_found("subnet", id));
        }
        if state.ports.values().any(|port| port.references_subnet(id)) {
            return Err(CloudError::Conflict(format!("subnet {} has ports", id)));
        }
        state.subnets.remove(id);
        state.deletions.push(id.to_string());
        Ok(())
    }

    async fn add_router_interface(&self, router_id: &str, subnet_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let network_id = state
            .subnets
            .get(subnet_id)
            .map(|subnet| subnet.network_id.clone())
            .ok_or_else(|| not_found("subnet", subnet_id))?;
        let id = state.id("rtr-port");
        state.ports.insert(
            id.clone(),
            PortInfo {
                id,
                name: String::new(),
                network_id,
                mac_address: "fa:16:3e:ff:ff:ff".to_string(),
                fixed_ips: vec![FixedIp {
                    subnet_id: subnet_id.to_string(),
                    ip_address: "10.0.0.1".to_string(),
                }],
                device_id: router_id.to_string(),
                device_owner: ROUTER_INTERFACE_OWNER.to_string(),
            },
        );
        Ok(())
    }

    async fn remove_router_interface(&self, router_id: &str, subnet_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let interface = state
            .ports
            .values()
            .find(|port| port.device_id == router_id && port.references_subnet(subnet_id))
            .map(|port| port.id.clone())
            .ok_or_else(|| not_found("router interface", subnet_id))?;
        state.ports.remove(&interface);
        Ok(())
    }

    async fn create_port(&self, request: &PortRequest) -> Result<PortInfo> {
        let mut state = self.state.lock().unwrap();
        if !state.networks.contains_key(&request.network_id) {
            return Err(not_found("network", &request.network_id));
        }
        let subnet_id = state
            .subnets
            .values()
            .find(|subnet| subnet.network_id == request.network_id)
            .map(|subnet| subnet.id.clone())
            .unwrap_or_default();
        let id = state.id("port");
        let n = state.next_id;
        let port = PortInfo {
            id: id.clone(),
            name: request.name.clone(),
            network_id: request.network_id.clone(),
            mac_address: format!("fa:16:3e:00:{:02x}:{:02x}", n / 256, n % 256),
            fixed_ips: vec![FixedIp {
                subnet_id,
                ip_address: format!("10.0.{}.{}", n / 250, n % 250 + 2),
            }],
            device_id: String::new(),
            device_owner: String::new(),
        };
        state.ports.insert(id, port.clone());
        Ok(port)
    }

    async fn delete_port(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.ports.remove(id).ok_or_else(|| not_found("port", id))?;
        for fip in state.floating_ips.values_mut() {
            if fip.port_id.as_deref() == Some(id) {
                fip.port_id = None;
            }
        }
        state.deletions.push(id.to_string());
        Ok(())
    }

    async fn list_ports(&self, device_owner: Option<&str>) -> Result<Vec<PortInfo>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .ports
            .values()
            .filter(|port| device_owner.is_none_or(|owner| port.device_owner == owner))
            .cloned()
            .collect())
    }

    async fn create_floating_ip(&self, floating_network_id: &str) -> Result<FloatingIpInfo> {
        let mut state = self.state.lock().unwrap();
        match state.networks.get(floating_network_id) {
            Some(network) if network.external => {}
            _ => return Err(not_found("external network", floating_network_id)),
        }
        let id = state.id("fip");
        let fip = FloatingIpInfo {
            id: id.clone(),
            floating_ip_address: format!("203.0.113.{}", state.next_id % 250 + 2),
            port_id: None,
        };
        state.floating_ips.insert(id, fip.clone());
        Ok(fip)
    }

    async fn associate_floating_ip(&self, floating_ip_id: &str, port_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.ports.contains_key(port_id) {
            return Err(not_found("port", port_id));
        }
        let fip = state
            .floating_ips
            .get_mut(floating_ip_id)
            .ok_or_else(|| not_found("floating IP", floating_ip_id))?;
        fip.port_id = Some(port_id.to_string());
        Ok(())
    }

    async fn delete_floating_ip(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .floating_ips
            .remove(id)
            .ok_or_else(|| not_found("floating IP", id))?;
        state.deletions.push(id.to_string());
        Ok(())
    }

    async fn list_floating_ips(&self) -> Result<Vec<FloatingIpInfo>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .floating_ips
            .values()
            .cloned()
            .collect())
    }

    async fn create_security_group(&self, name: &str) -> Result<SecurityGroupInfo> {
        let mut state = self.state.lock().unwrap();
        let group = SecurityGroupInfo {
            id: state.id("sg"),
            name: name.to_string(),
        };
        state.security_groups.insert(group.id.clone(), group.clone());
        Ok(group)
    }

    async fn delete_security_group(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .security_groups
            .remove(id)
            .ok_or_else(|| not_found("security group", id))?;
        state.deletions.push(id.to_string());
        Ok(())
    }

    async fn list_security_groups(&self) -> Result<Vec<SecurityGroupInfo>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .security_groups
            .values()
            .cloned()
            .collect())
    }

    async fn create_security_group_rule(
        &self,
        request: &SecurityGroupRuleRequest,
    ) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        if !state.security_groups.contains_key(&request.security_group_id) {
            return Err(not_found("security group", &request.security_group_id));
        }
        let id = state.id("rule");
        state.rules.insert(id.clone(), request.clone());
        Ok(id)
    }

    async fn delete_security_group_rule(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .rules
            .remove(id)
            .ok_or_else(|| not_found("security group rule", id))?;
        state.deletions.push(id.to_string());
        Ok(())
    }
}

#[async_trait]
impl VolumeApi for FakeCloud {
    async fn create_volume(&self, _request: &VolumeRequest) -> Result<VolumeInfo> {
        let mut state = self.state.lock().unwrap();
        let volume = VolumeInfo {
            id: state.id("vol"),
            status: VolumeStatus::Creating,
        };
        state.volumes.insert(volume.id.clone(), volume.clone());
        Ok(volume)
    }

    async fn volume_status(&self, id: &str) -> Result<VolumeStatus> {
        let mut state = self.state.lock().unwrap();
        let volume = state
            .volumes
            .get_mut(id)
            .ok_or_else(|| not_found("volume", id))?;
        volume.status = VolumeStatus::Available;
        Ok(volume.status.clone())
    }

    async fn delete_volume(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .volumes
            .remove(id)
            .ok_or_else(|| not_found("volume", id))?;
        state.deletions.push(id.to_string());
        Ok(())
    }
}
