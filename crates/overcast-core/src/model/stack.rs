//! Stack definition

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declarative description of networks, security groups and nodes
///
/// YAML form:
/// ```yaml
/// networks:
///   default:
///     cidr: 10.0.0.0/24
/// securitygroups:
///   ssh:
///     - protocol: tcp
///       from_port: 22
///       to_port: 22
///       cidr: 0.0.0.0/0
/// nodes:
///   web:
///     image: trusty
///     flavor: small
///     disk: 10
///     number: 2
///     export: true
///     networks:
///       - network: default
///         assign_floating_ip: true
///         securitygroups: [ssh]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stack {
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkSpec>,
    #[serde(default, rename = "securitygroups")]
    pub security_groups: BTreeMap<String, RuleList>,
    #[serde(default)]
    pub nodes: BTreeMap<String, NodeTemplate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// IPv4 address block of the network's subnet
    pub cidr: String,
}

/// Ingress rules of one security group. A null entry in YAML means no rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<Vec<SecurityGroupRule>>")]
pub struct RuleList(pub Vec<SecurityGroupRule>);

impl From<Option<Vec<SecurityGroupRule>>> for RuleList {
    fn from(rules: Option<Vec<SecurityGroupRule>>) -> Self {
        Self(rules.unwrap_or_default())
    }
}

impl RuleList {
    pub fn iter(&self) -> impl Iterator<Item = &SecurityGroupRule> {
        self.0.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupRule {
    pub protocol: String,
    #[serde(default)]
    pub from_port: Option<u16>,
    #[serde(default)]
    pub to_port: Option<u16>,
    #[serde(flatten)]
    pub source: RuleSource,
}

/// Where a rule admits traffic from. `source_group` wins if both are given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleSource {
    Group { source_group: String },
    Cidr { cidr: String },
}

/// Node template. With `number`, expands to `<name>1..<name>N`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTemplate {
    pub image: String,
    pub flavor: String,
    /// Boot volume size in GB
    pub disk: u32,
    #[serde(default)]
    pub networks: Vec<NetworkAttachment>,
    #[serde(default, rename = "number")]
    pub count: Option<u32>,
    /// Export this node's fixed addresses to shell steps
    #[serde(default)]
    pub export: bool,
    /// Extra variables for remote shell steps targeting this node
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

impl NodeTemplate {
    /// Take the replica count out of the template and return the node names it expands to
    pub fn take_expansion(&mut self, base_name: &str) -> Vec<String> {
        match self.count.take() {
            Some(count) => (1..=count).map(|idx| format!("{}{}", base_name, idx)).collect(),
            None => vec![base_name.to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAttachment {
    pub network: String,
    #[serde(default)]
    pub assign_floating_ip: bool,
    #[serde(default, rename = "securitygroups")]
    pub security_groups: Vec<String>,
}
