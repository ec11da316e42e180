//! Resource records exchanged with the Cloud API

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Device owner reported for ports that attach a subnet to a router
pub const ROUTER_INTERFACE_OWNER: &str = "network:router_interface";

/// Kind of a resource recorded in the ledger
///
/// The string forms are part of the ledger file format and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Keypair,
    Network,
    Subnet,
    Secgroup,
    SecgroupRule,
    Port,
    Floatingip,
    Volume,
    Server,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 9] = [
        ResourceKind::Keypair,
        ResourceKind::Network,
        ResourceKind::Subnet,
        ResourceKind::Secgroup,
        ResourceKind::SecgroupRule,
        ResourceKind::Port,
        ResourceKind::Floatingip,
        ResourceKind::Volume,
        ResourceKind::Server,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Keypair => "keypair",
            ResourceKind::Network => "network",
            ResourceKind::Subnet => "subnet",
            ResourceKind::Secgroup => "secgroup",
            ResourceKind::SecgroupRule => "secgroup_rule",
            ResourceKind::Port => "port",
            ResourceKind::Floatingip => "floatingip",
            ResourceKind::Volume => "volume",
            ResourceKind::Server => "server",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown resource kind: {}", s))
    }
}

/// Compute instance status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerStatus {
    Build,
    Active,
    Error,
    Other(String),
}

impl ServerStatus {
    pub fn from_api(status: &str) -> Self {
        match status.to_ascii_uppercase().as_str() {
            "BUILD" => ServerStatus::Build,
            "ACTIVE" => ServerStatus::Active,
            "ERROR" => ServerStatus::Error,
            other => ServerStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerStatus::Build => write!(f, "BUILD"),
            ServerStatus::Active => write!(f, "ACTIVE"),
            ServerStatus::Error => write!(f, "ERROR"),
            ServerStatus::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Block volume status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeStatus {
    Creating,
    Available,
    Error,
    Other(String),
}

impl VolumeStatus {
    pub fn from_api(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "creating" => VolumeStatus::Creating,
            "available" => VolumeStatus::Available,
            "error" => VolumeStatus::Error,
            other => VolumeStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for VolumeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumeStatus::Creating => write!(f, "creating"),
            VolumeStatus::Available => write!(f, "available"),
            VolumeStatus::Error => write!(f, "error"),
            VolumeStatus::Other(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub id: String,
    pub name: String,
    /// Whether floating IPs can be allocated from this network
    pub external: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubnetInfo {
    pub id: String,
    pub network_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedIp {
    pub subnet_id: String,
    pub ip_address: String,
}

/// Network port as reported by the Cloud API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortInfo {
    pub id: String,
    pub name: String,
    pub network_id: String,
    pub mac_address: String,
    pub fixed_ips: Vec<FixedIp>,
    pub device_id: String,
    pub device_owner: String,
}

impl PortInfo {
    /// First fixed address of the port, if any
    pub fn first_fixed_ip(&self) -> Option<&str> {
        self.fixed_ips.first().map(|ip| ip.ip_address.as_str())
    }

    pub fn references_subnet(&self, subnet_id: &str) -> bool {
        self.fixed_ips.iter().any(|ip| ip.subnet_id == subnet_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloatingIpInfo {
    pub id: String,
    pub floating_ip_address: String,
    pub port_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityGroupInfo {
    pub id: String,
    pub name: String,
}

/// Compute instance as reported by the Cloud API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub id: String,
    pub name: String,
    pub status: ServerStatus,
    /// MAC address of each attached interface
    pub mac_addresses: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeInfo {
    pub id: String,
    pub status: VolumeStatus,
}

/// Request for a new port
#[derive(Debug, Clone)]
pub struct PortRequest {
    pub name: String,
    pub network_id: String,
    pub security_groups: Vec<String>,
}

/// Where a security group rule admits traffic from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteSource {
    IpPrefix(String),
    Group(String),
}

/// Request for a new ingress rule
#[derive(Debug, Clone)]
pub struct SecurityGroupRuleRequest {
    pub security_group_id: String,
    pub protocol: String,
    pub port_range_min: Option<u16>,
    pub port_range_max: Option<u16>,
    pub remote: RemoteSource,
}

/// Request for a new compute instance booting from a volume
#[derive(Debug, Clone)]
pub struct ServerRequest {
    pub name: String,
    pub flavor_id: String,
    pub boot_volume_id: String,
    pub port_ids: Vec<String>,
    pub key_name: Option<String>,
    pub user_data: Option<String>,
}

/// Request for a new image-backed volume
#[derive(Debug, Clone)]
pub struct VolumeRequest {
    pub name: Option<String>,
    pub size_gb: u32,
    pub image_ref: String,
}
