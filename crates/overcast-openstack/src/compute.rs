//! Nova (compute v2) client

use crate::client::ApiClient;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use overcast_cloud::{ComputeApi, Result, ServerInfo, ServerRequest, ServerStatus};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;

pub struct NovaClient {
    api: ApiClient,
}

impl NovaClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[derive(Debug, Deserialize)]
struct FlavorEnvelope {
    flavor: Flavor,
}

#[derive(Debug, Deserialize)]
struct FlavorList {
    flavors: Vec<Flavor>,
}

#[derive(Debug, Deserialize)]
struct Flavor {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ServerEnvelope {
    server: Server,
}

#[derive(Debug, Deserialize)]
struct ServerList {
    servers: Vec<Server>,
}

#[derive(Debug, Deserialize)]
struct Server {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    addresses: BTreeMap<String, Vec<Address>>,
}

#[derive(Debug, Deserialize)]
struct Address {
    #[serde(rename = "OS-EXT-IPS-MAC:mac_addr")]
    mac_addr: Option<String>,
}

impl Server {
    /// One MAC per attached network, taken from its first address
    fn into_info(self) -> ServerInfo {
        let mac_addresses = self
            .addresses
            .values()
            .filter_map(|addresses| addresses.first().and_then(|a| a.mac_addr.clone()))
            .collect();
        ServerInfo {
            id: self.id,
            name: self.name,
            status: ServerStatus::from_api(&self.status),
            mac_addresses,
        }
    }
}

fn server_body(request: &ServerRequest) -> Value {
    let mut server = json!({
        "name": request.name,
        "flavorRef": request.flavor_id,
        "imageRef": "",
        "networks": request
            .port_ids
            .iter()
            .map(|port| json!({ "port": port }))
            .collect::<Vec<_>>(),
        "block_device_mapping_v2": [{
            "boot_index": 0,
            "uuid": request.boot_volume_id,
            "source_type": "volume",
            "destination_type": "volume",
            "delete_on_termination": true,
        }],
    });
    if let Some(key_name) = &request.key_name {
        server["key_name"] = json!(key_name);
    }
    if let Some(user_data) = &request.user_data {
        server["user_data"] = json!(STANDARD.encode(user_data));
    }
    json!({ "server": server })
}

#[async_trait]
impl ComputeApi for NovaClient {
    async fn find_flavor(&self, flavor: &str) -> Result<String> {
        match self
            .api
            .get::<FlavorEnvelope>(&format!("/flavors/{}", flavor))
            .await
        {
            Ok(found) => return Ok(found.flavor.id),
            Err(e) if e.status() == Some(404) => {}
            Err(e) => return Err(e.into()),
        }

        let list: FlavorList = self.api.get("/flavors").await?;
        list.flavors
            .into_iter()
            .find(|f| f.name == flavor)
            .map(|f| f.id)
            .ok_or_else(|| overcast_cloud::CloudError::NotFound(format!("flavor {}", flavor)))
    }

    async fn create_keypair(&self, name: &str, public_key: &str) -> Result<()> {
        let body = json!({ "keypair": { "name": name, "public_key": public_key } });
        self.api.post_empty("/os-keypairs", &body).await?;
        Ok(())
    }

    async fn delete_keypair(&self, name: &str) -> Result<()> {
        self.api.delete(&format!("/os-keypairs/{}", name)).await?;
        tracing::info!("Deleted key pair {}", name);
        Ok(())
    }

    async fn create_server(&self, request: &ServerRequest) -> Result<String> {
        let created: ServerEnvelope = self.api.post("/servers", &server_body(request)).await?;
        Ok(created.server.id)
    }

    async fn server_status(&self, id: &str) -> Result<ServerStatus> {
        let found: ServerEnvelope = self.api.get(&format!("/servers/{}", id)).await?;
        Ok(ServerStatus::from_api(&found.server.status))
    }

    async fn delete_server(&self, id: &str) -> Result<()> {
        self.api.delete(&format!("/servers/{}", id)).await?;
        Ok(())
    }

    async fn list_servers(&self) -> Result<Vec<ServerInfo>> {
        let list: ServerList = self.api.get("/servers/detail").await?;
        Ok(list.servers.into_iter().map(Server::into_info).collect())
    }
}
