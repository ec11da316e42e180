//! Neutron (network v2.0) client

use crate::client::ApiClient;
use async_trait::async_trait;
use overcast_cloud::{
    FixedIp, FloatingIpInfo, NetworkApi, NetworkInfo, PortInfo, PortRequest, RemoteSource, Result,
    SecurityGroupInfo, SecurityGroupRuleRequest, SubnetInfo,
};
use serde::Deserialize;
use serde_json::{Value, json};

pub struct NeutronClient {
    api: ApiClient,
}

impl NeutronClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[derive(Debug, Deserialize)]
struct Network {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default, rename = "router:external")]
    external: bool,
}

impl From<Network> for NetworkInfo {
    fn from(n: Network) -> Self {
        NetworkInfo {
            id: n.id,
            name: n.name,
            external: n.external,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NetworkEnvelope {
    network: Network,
}

#[derive(Debug, Deserialize)]
struct NetworkList {
    networks: Vec<Network>,
}

#[derive(Debug, Deserialize)]
struct SubnetEnvelope {
    subnet: Subnet,
}

#[derive(Debug, Deserialize)]
struct Subnet {
    id: String,
    network_id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct Port {
    id: String,
    #[serde(default)]
    name: String,
    network_id: String,
    mac_address: String,
    #[serde(default)]
    fixed_ips: Vec<FixedIp>,
    #[serde(default)]
    device_id: String,
    #[serde(default)]
    device_owner: String,
}

impl From<Port> for PortInfo {
    fn from(p: Port) -> Self {
        PortInfo {
            id: p.id,
            name: p.name,
            network_id: p.network_id,
            mac_address: p.mac_address,
            fixed_ips: p.fixed_ips,
            device_id: p.device_id,
            device_owner: p.device_owner,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PortEnvelope {
    port: Port,
}

#[derive(Debug, Deserialize)]
struct PortList {
    ports: Vec<Port>,
}

#[derive(Debug, Deserialize)]
struct FloatingIpEnvelope {
    floatingip: FloatingIpInfo,
}

#[derive(Debug, Deserialize)]
struct FloatingIpList {
    floatingips: Vec<FloatingIpInfo>,
}

#[derive(Debug, Deserialize)]
struct SecurityGroupEnvelope {
    security_group: SecurityGroupInfo,
}

#[derive(Debug, Deserialize)]
struct SecurityGroupList {
    security_groups: Vec<SecurityGroupInfo>,
}

#[derive(Debug, Deserialize)]
struct RuleEnvelope {
    security_group_rule: Rule,
}

#[derive(Debug, Deserialize)]
struct Rule {
    id: String,
}

fn rule_body(request: &SecurityGroupRuleRequest) -> Value {
    let mut rule = json!({
        "direction": "ingress",
        "ethertype": "IPv4",
        "protocol": request.protocol,
        "port_range_min": request.port_range_min,
        "port_range_max": request.port_range_max,
        "security_group_id": request.security_group_id,
    });
    match &request.remote {
        RemoteSource::IpPrefix(cidr) => rule["remote_ip_prefix"] = json!(cidr),
        RemoteSource::Group(group) => rule["remote_group_id"] = json!(group),
    }
    json!({ "security_group_rule": rule })
}

#[async_trait]
impl NetworkApi for NeutronClient {
    async fn create_network(&self, name: &str) -> Result<NetworkInfo> {
        let body = json!({ "network": { "name": name, "admin_state_up": true } });
        let created: NetworkEnvelope = self.api.post("/v2.0/networks", &body).await?;
        Ok(created.network.into())
    }

    async fn delete_network(&self, id: &str) -> Result<()> {
        self.api.delete(&format!("/v2.0/networks/{}", id)).await?;
        Ok(())
    }

    async fn list_networks(&self) -> Result<Vec<NetworkInfo>> {
        let list: NetworkList = self.api.get("/v2.0/networks").await?;
        Ok(list.networks.into_iter().map(Into::into).collect())
    }

    async fn create_subnet(
        &self,
        network_id: &str,
        name: &str,
        cidr: &str,
    ) -> Result<SubnetInfo> {
        let body = json!({
            "subnet": {
                "network_id": network_id,
                "ip_version": 4,
                "cidr": cidr,
                "name": name,
            }
        });
        let created: SubnetEnvelope = self.api.post("/v2.0/subnets", &body).await?;
        Ok(SubnetInfo {
            id: created.subnet.id,
            network_id: created.subnet.network_id,
            name: created.subnet.name,
        })
    }

    async fn delete_subnet(&self, id: &str) -> Result<()> {
        self.api.delete(&format!("/v2.0/subnets/{}", id)).await?;
        Ok(())
    }

    async fn add_router_interface(&self, router_id: &str, subnet_id: &str) -> Result<()> {
        let path = format!("/v2.0/routers/{}/add_router_interface", router_id);
        self.api.put(&path, &json!({ "subnet_id": subnet_id })).await?;
        Ok(())
    }

    async fn remove_router_interface(&self, router_id: &str, subnet_id: &str) -> Result<()> {
        let path = format!("/v2.0/routers/{}/remove_router_interface", router_id);
        self.api.put(&path, &json!({ "subnet_id": subnet_id })).await?;
        Ok(())
    }

    async fn create_port(&self, request: &PortRequest) -> Result<PortInfo> {
        let body = json!({
            "port": {
                "name": request.name,
                "admin_state_up": true,
                "network_id": request.network_id,
                "security_groups": request.security_groups,
            }
        });
        let created: PortEnvelope = self.api.post("/v2.0/ports", &body).await?;
        Ok(created.port.into())
    }

    async fn delete_port(&self, id: &str) -> Result<()> {
        self.api.delete(&format!("/v2.0/ports/{}", id)).await?;
        Ok(())
    }

    async fn list_ports(&self, device_owner: Option<&str>) -> Result<Vec<PortInfo>> {
        let path = match device_owner {
            Some(owner) => format!("/v2.0/ports?device_owner={}", owner),
            None => "/v2.0/ports".to_string(),
        };
        let list: PortList = self.api.get(&path).await?;
        Ok(list.ports.into_iter().map(Into::into).collect())
    }

    async fn create_floating_ip(&self, floating_network_id: &str) -> Result<FloatingIpInfo> {
        let body = json!({ "floatingip": { "floating_network_id": floating_network_id } });
        let created: FloatingIpEnvelope = self.api.post("/v2.0/floatingips", &body).await?;
        Ok(created.floatingip)
    }

    async fn associate_floating_ip(&self, floating_ip_id: &str, port_id: &str) -> Result<()> {
        let body = json!({ "floatingip": { "port_id": port_id } });
        self.api
            .put(&format!("/v2.0/floatingips/{}", floating_ip_id), &body)
            .await?;
        Ok(())
    }

    async fn delete_floating_ip(&self, id: &str) -> Result<()> {
        self.api.delete(&format!("/v2.0/floatingips/{}", id)).await?;
        Ok(())
    }

    async fn list_floating_ips(&self) -> Result<Vec<FloatingIpInfo>> {
        let list: FloatingIpList = self.api.get("/v2.0/floatingips").await?;
        Ok(list.floatingips)
    }

    async fn create_security_group(&self, name: &str) -> Result<SecurityGroupInfo> {
        let body = json!({ "security_group": { "name": name } });
        let created: SecurityGroupEnvelope = self.api.post("/v2.0/security-groups", &body).await?;
        Ok(created.security_group)
    }

    async fn delete_security_group(&self, id: &str) -> Result<()> {
        self.api
            .delete(&format!("/v2.0/security-groups/{}", id))
            .await?;
        Ok(())
    }

    async fn list_security_groups(&self) -> Result<Vec<SecurityGroupInfo>> {
        let list: SecurityGroupList = self.api.get("/v2.0/security-groups").await?;
        Ok(list.security_groups)
    }

    async fn create_security_group_rule(
        &self,
        request: &SecurityGroupRuleRequest,
    ) -> Result<String> {
        let created: RuleEnvelope = self
            .api
            .post("/v2.0/security-group-rules", &rule_body(request))
            .await?;
        Ok(created.security_group_rule.id)
    }

    async fn delete_security_group_rule(&self, id: &str) -> Result<()> {
        self.api
            .delete(&format!("/v2.0/security-group-rules/{}", id))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_list_reads_external_flag() {
        let body = r#"{"networks": [
            {"id": "n-1", "name": "public", "router:external": true, "status": "ACTIVE"},
            {"id": "n-2", "name": "default_env1"}
        ]}"#;
        let list: NetworkList = serde_json::from_str(body).unwrap();
        let networks: Vec<NetworkInfo> = list.networks.into_iter().map(Into::into).collect();

        assert!(networks[0].external);
        assert!(!networks[1].external);
        assert_eq!(networks[1].name, "default_env1");
    }

    #[test]
    fn test_port_parses_fixed_ips() {
        let body = r#"{"port": {
            "id": "p-1",
            "name": "web1_eth0",
            "network_id": "n-2",
            "mac_address": "fa:16:3e:00:00:01",
            "fixed_ips": [{"subnet_id": "s-1", "ip_address": "10.0.0.5"}],
            "device_id": "",
            "device_owner": "",
            "admin_state_up": true
        }}"#;
        let envelope: PortEnvelope = serde_json::from_str(body).unwrap();
        let port: PortInfo = envelope.port.into();

        assert_eq!(port.first_fixed_ip(), Some("10.0.0.5"));
        assert!(port.references_subnet("s-1"));
    }

    #[test]
    fn test_floating_ip_without_port() {
        let body = r#"{"floatingips": [
            {"id": "f-1", "floating_ip_address": "203.0.113.5", "port_id": null},
            {"id": "f-2", "floating_ip_address": "203.0.113.6", "port_id": "p-1"}
        ]}"#;
        let list: FloatingIpList = serde_json::from_str(body).unwrap();
        assert_eq!(list.floatingips[0].port_id, None);
        assert_eq!(list.floatingips[1].port_id.as_deref(), Some("p-1"));
    }

    #[test]
    fn test_rule_body_remote() {
        let mut request = SecurityGroupRuleRequest {
            security_group_id: "sg-1".to_string(),
            protocol: "tcp".to_string(),
            port_range_min: Some(22),
            port_range_max: Some(22),
            remote: RemoteSource::IpPrefix("0.0.0.0/0".to_string()),
        };
        let body = rule_body(&request);
        let rule = &body["security_group_rule"];
        assert_eq!(rule["direction"], "ingress");
        assert_eq!(rule["remote_ip_prefix"], "0.0.0.0/0");
        assert!(rule.get("remote_group_id").is_none());

        request.remote = RemoteSource::Group("sg-2".to_string());
        let body = rule_body(&request);
        assert_eq!(body["security_group_rule"]["remote_group_id"], "sg-2");
        assert_eq!(body["security_group_rule"]["port_range_min"], 22);
    }
}
