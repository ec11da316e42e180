//! Cinder (block storage) client

use crate::client::ApiClient;
use async_trait::async_trait;
use overcast_cloud::{Result, VolumeApi, VolumeInfo, VolumeRequest, VolumeStatus};
use serde::Deserialize;
use serde_json::{Value, json};

/// Cinder API generation, which decides the name field of a volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CinderVersion {
    V1,
    V2,
}

impl CinderVersion {
    /// Guess the version from an endpoint URL
    pub fn from_endpoint(url: &str) -> Self {
        if url.contains("/v1") {
            CinderVersion::V1
        } else {
            CinderVersion::V2
        }
    }
}

pub struct CinderClient {
    api: ApiClient,
    version: CinderVersion,
}

impl CinderClient {
    pub fn new(api: ApiClient) -> Self {
        let version = CinderVersion::from_endpoint(api.base_url());
        Self { api, version }
    }
}

#[derive(Debug, Deserialize)]
struct VolumeEnvelope {
    volume: Volume,
}

#[derive(Debug, Deserialize)]
struct Volume {
    id: String,
    status: String,
}

impl From<Volume> for VolumeInfo {
    fn from(v: Volume) -> Self {
        VolumeInfo {
            id: v.id,
            status: VolumeStatus::from_api(&v.status),
        }
    }
}

fn volume_body(request: &VolumeRequest, version: CinderVersion) -> Value {
    let mut volume = json!({
        "size": request.size_gb,
        "imageRef": request.image_ref,
    });
    if let Some(name) = &request.name {
        let key = match version {
            CinderVersion::V1 => "display_name",
            CinderVersion::V2 => "name",
        };
        volume[key] = json!(name);
    }
    json!({ "volume": volume })
}

#[async_trait]
impl VolumeApi for CinderClient {
    async fn create_volume(&self, request: &VolumeRequest) -> Result<VolumeInfo> {
        let created: VolumeEnvelope = self
            .api
            .post("/volumes", &volume_body(request, self.version))
            .await?;
        Ok(created.volume.into())
    }

    async fn volume_status(&self, id: &str) -> Result<VolumeStatus> {
        let found: VolumeEnvelope = self.api.get(&format!("/volumes/{}", id)).await?;
        Ok(VolumeStatus::from_api(&found.volume.status))
    }

    async fn delete_volume(&self, id: &str) -> Result<()> {
        self.api.delete(&format!("/volumes/{}", id)).await?;
        Ok(())
    }
}
