//! Cloud API trait definitions
//!
//! One trait per resource family. A concrete backend (see `overcast-openstack`)
//! implements all three and hands them out bundled as [`CloudClients`].

use crate::error::Result;
use crate::resource::{
    FloatingIpInfo, NetworkInfo, PortInfo, PortRequest, SecurityGroupInfo,
    SecurityGroupRuleRequest, ServerInfo, ServerRequest, ServerStatus, SubnetInfo, VolumeInfo,
    VolumeRequest, VolumeStatus,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Compute service: flavors, key pairs, instances
#[async_trait]
pub trait ComputeApi: Send + Sync {
    /// Resolve a flavor given by id or name to its id
    async fn find_flavor(&self, flavor: &str) -> Result<String>;

    /// Upload a public key. Fails with `CloudError::Conflict` if the name is taken.
    async fn create_keypair(&self, name: &str, public_key: &str) -> Result<()>;

    async fn delete_keypair(&self, name: &str) -> Result<()>;

    /// Create an instance and return its id
    async fn create_server(&self, request: &ServerRequest) -> Result<String>;

    async fn server_status(&self, id: &str) -> Result<ServerStatus>;

    async fn delete_server(&self, id: &str) -> Result<()>;

    async fn list_servers(&self) -> Result<Vec<ServerInfo>>;
}

/// Network service: networks, subnets, routers, ports, floating IPs, security groups
#[async_trait]
pub trait NetworkApi: Send + Sync {
    async fn create_network(&self, name: &str) -> Result<NetworkInfo>;

    async fn delete_network(&self, id: &str) -> Result<()>;

    async fn list_networks(&self) -> Result<Vec<NetworkInfo>>;

    /// Create an IPv4 subnet on a network
    async fn create_subnet(&self, network_id: &str, name: &str, cidr: &str)
    -> Result<SubnetInfo>;

    /// Delete a subnet. Fails with `CloudError::Conflict` while a router interface is attached.
    async fn delete_subnet(&self, id: &str) -> Result<()>;

    async fn add_router_interface(&self, router_id: &str, subnet_id: &str) -> Result<()>;

    async fn remove_router_interface(&self, router_id: &str, subnet_id: &str) -> Result<()>;

    async fn create_port(&self, request: &PortRequest) -> Result<PortInfo>;

    async fn delete_port(&self, id: &str) -> Result<()>;

    /// List ports, optionally restricted to one device owner
    async fn list_ports(&self, device_owner: Option<&str>) -> Result<Vec<PortInfo>>;

    /// Allocate a floating IP from the given external network
    async fn create_floating_ip(&self, floating_network_id: &str) -> Result<FloatingIpInfo>;

    async fn associate_floating_ip(&self, floating_ip_id: &str, port_id: &str) -> Result<()>;

    async fn delete_floating_ip(&self, id: &str) -> Result<()>;

    async fn list_floating_ips(&self) -> Result<Vec<FloatingIpInfo>>;

    async fn create_security_group(&self, name: &str) -> Result<SecurityGroupInfo>;

    async fn delete_security_group(&self, id: &str) -> Result<()>;

    async fn list_security_groups(&self) -> Result<Vec<SecurityGroupInfo>>;

    /// Create an ingress rule and return its id
    async fn create_security_group_rule(&self, request: &SecurityGroupRuleRequest)
    -> Result<String>;

    async fn delete_security_group_rule(&self, id: &str) -> Result<()>;
}

/// Block storage service
#[async_trait]
pub trait VolumeApi: Send + Sync {
    async fn create_volume(&self, request: &VolumeRequest) -> Result<VolumeInfo>;

    async fn volume_status(&self, id: &str) -> Result<VolumeStatus>;

    async fn delete_volume(&self, id: &str) -> Result<()>;
}

/// Ready, authorized client handles, one per resource family
#[derive(Clone)]
pub struct CloudClients {
    pub compute: Arc<dyn ComputeApi>,
    pub network: Arc<dyn NetworkApi>,
    pub volume: Arc<dyn VolumeApi>,
}

impl CloudClients {
    pub fn new(
        compute: Arc<dyn ComputeApi>,
        network: Arc<dyn NetworkApi>,
        volume: Arc<dyn VolumeApi>,
    ) -> Self {
        Self {
            compute,
            network,
            volume,
        }
    }

    /// Use one backend for every resource family
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: ComputeApi + NetworkApi + VolumeApi + 'static,
    {
        Self {
            compute: backend.clone(),
            network: backend.clone(),
            volume: backend,
        }
    }
}
