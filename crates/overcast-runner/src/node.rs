//! Node state machine
//!
//! A node is one compute instance plus its ports, floating IPs and boot
//! volume. `build` creates all of them, `poll` observes the instance status
//! and `clean` releases everything so the node can be built again. The
//! retry policy itself belongs to the caller.

use crate::error::{DeployError, Result};
use crate::provisioner::Provisioner;
use overcast_cloud::{
    CloudError, ResourceKind, ServerRequest, ServerStatus, VolumeRequest, VolumeStatus,
};
use overcast_core::NodeTemplate;
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument};

/// Network interface attached to a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub id: String,
    pub fixed_ip: String,
    pub mac: String,
    /// Logical network name (or the network id for networks this run does not know)
    pub network_name: String,
    pub floating_ip: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    template: NodeTemplate,
    keypair: Option<String>,
    userdata: Option<String>,
    flavor: Option<String>,
    ports: Vec<Port>,
    floating_ip_ids: BTreeSet<String>,
    server_id: Option<String>,
    status: Option<ServerStatus>,
    attempts_left: u32,
}

impl Node {
    /// A node that has not been built yet. It may be built `retry_count + 1` times.
    pub fn new(
        name: impl Into<String>,
        template: NodeTemplate,
        retry_count: u32,
        keypair: Option<String>,
        userdata: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            template,
            keypair,
            userdata,
            flavor: None,
            ports: Vec::new(),
            floating_ip_ids: BTreeSet::new(),
            server_id: None,
            status: None,
            attempts_left: retry_count.saturating_add(1),
        }
    }

    /// A node found already running in the cloud
    pub(crate) fn adopted(name: impl Into<String>, server_id: String, ports: Vec<Port>) -> Self {
        Self {
            name: name.into(),
            template: NodeTemplate::default(),
            keypair: None,
            userdata: None,
            flavor: None,
            ports,
            floating_ip_ids: BTreeSet::new(),
            server_id: Some(server_id),
            status: None,
            attempts_left: 0,
        }
    }

    /// External name (with run suffix)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &NodeTemplate {
        &self.template
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub(crate) fn ports_mut(&mut self) -> &mut Vec<Port> {
        &mut self.ports
    }

    pub fn server_id(&self) -> Option<&str> {
        self.server_id.as_deref()
    }

    pub fn status(&self) -> Option<&ServerStatus> {
        self.status.as_ref()
    }

    pub fn attempts_left(&self) -> u32 {
        self.attempts_left
    }

    /// First floating address found on the node's ports
    pub fn floating_ip(&self) -> Option<&str> {
        self.ports.iter().find_map(|port| port.floating_ip.as_deref())
    }

    /// Create ports, floating IPs, boot volume and instance
    #[instrument(skip_all, fields(node = %self.name))]
    pub async fn build(&mut self, provisioner: &Provisioner, volume_poll: Duration) -> Result<()> {
        let clients = provisioner.clients();

        if self.flavor.is_none() {
            let flavor = provisioner.mappings().flavor(&self.template.flavor);
            self.flavor = Some(clients.compute.find_flavor(flavor).await?);
        }

        let mut port_ids = Vec::with_capacity(self.template.networks.len());
        for (idx, attachment) in self.template.networks.iter().enumerate() {
            let port_name = format!("{}_eth{}", self.name, idx);
            let mut port = provisioner
                .create_port(&port_name, &attachment.network, &attachment.security_groups)
                .await?;

            if attachment.assign_floating_ip {
                let fip = provisioner.attach_floating_ip(&port.id).await?;
                port.floating_ip = Some(fip.floating_ip_address);
                self.floating_ip_ids.insert(fip.id);
            }

            port_ids.push(port.id.clone());
            self.ports.push(port);
        }

        let image = provisioner.mappings().image(&self.template.image);
        let volume = clients
            .volume
            .create_volume(&VolumeRequest {
                name: Some(self.name.clone()),
                size_gb: self.template.disk,
                image_ref: image.to_string(),
            })
            .await?;
        provisioner.record(ResourceKind::Volume, &volume.id).await?;
        self.wait_for_volume(provisioner, &volume.id, volume.status, volume_poll)
            .await?;

        let request = ServerRequest {
            name: self.name.clone(),
            flavor_id: self.flavor.clone().unwrap_or_default(),
            boot_volume_id: volume.id,
            port_ids,
            key_name: self.keypair.clone(),
            user_data: self.userdata.clone(),
        };
        let server_id = clients.compute.create_server(&request).await?;
        provisioner.record(ResourceKind::Server, &server_id).await?;
        info!(server = %server_id, "Created instance");

        self.server_id = Some(server_id);
        self.attempts_left = self.attempts_left.saturating_sub(1);
        Ok(())
    }

    async fn wait_for_volume(
        &self,
        provisioner: &Provisioner,
        volume_id: &str,
        mut status: VolumeStatus,
        interval: Duration,
    ) -> Result<()> {
        loop {
            match status {
                VolumeStatus::Available => return Ok(()),
                VolumeStatus::Error => {
                    return Err(DeployError::VolumeFailed {
                        volume: volume_id.to_string(),
                        status,
                    });
                }
                _ => debug!(volume = volume_id, %status, "Waiting for volume"),
            }
            sleep(interval).await;
            status = provisioner.clients().volume.volume_status(volume_id).await?;
        }
    }

    /// Observe the instance status once, unless it is already `desired`
    pub async fn poll(
        &mut self,
        provisioner: &Provisioner,
        desired: &ServerStatus,
    ) -> Result<ServerStatus> {
        if let Some(status) = &self.status
            && status == desired
        {
            return Ok(status.clone());
        }

        let server_id = self
            .server_id
            .as_deref()
            .ok_or_else(|| CloudError::NotFound(format!("instance of node {}", self.name)))?;
        let status = provisioner.clients().compute.server_status(server_id).await?;
        debug!(node = %self.name, %status, "Polled instance");
        self.status = Some(status.clone());
        Ok(status)
    }

    /// Release floating IPs, then ports, then the instance
    #[instrument(skip_all, fields(node = %self.name))]
    pub async fn clean(&mut self, provisioner: &Provisioner) -> Result<()> {
        for fip_id in std::mem::take(&mut self.floating_ip_ids) {
            provisioner
                .delete_if_present(ResourceKind::Floatingip, &fip_id)
                .await?;
        }

        for port in std::mem::take(&mut self.ports) {
            provisioner
                .delete_if_present(ResourceKind::Port, &port.id)
                .await?;
        }

        if let Some(server_id) = self.server_id.take() {
            provisioner
                .delete_if_present(ResourceKind::Server, &server_id)
                .await?;
        }

        self.status = None;
        info!("Cleaned node");
        Ok(())
    }
}
