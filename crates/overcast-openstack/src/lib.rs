//! OpenStack backend for Overcast
//!
//! Implements the `overcast-cloud` API traits over the Nova, Neutron and
//! Cinder REST APIs, authenticated through Keystone v2.0.
//!
//! # Requirements
//!
//! - `OS_USERNAME`, `OS_PASSWORD`, `OS_AUTH_URL`, `OS_TENANT_NAME` env vars
//! - optionally `OS_REGION_NAME` to pick endpoints of one region
//!
//! # Example
//!
//! ```ignore
//! use overcast_openstack::OpenStack;
//!
//! let clients = OpenStack::connect().await?;
//! let servers = clients.compute.list_servers().await?;
//! ```

pub mod auth;
pub mod client;
pub mod compute;
pub mod error;
pub mod network;
pub mod volume;

pub use auth::{Credentials, Session};
pub use client::ApiClient;
pub use compute::NovaClient;
pub use error::{OpenStackError, Result};
pub use network::NeutronClient;
pub use volume::{CinderClient, CinderVersion};

use overcast_cloud::CloudClients;
use std::sync::Arc;

pub struct OpenStack;

impl OpenStack {
    /// Authenticate with credentials from the environment
    pub async fn connect() -> Result<CloudClients> {
        let credentials = Credentials::from_env()?;
        Self::connect_with(&credentials).await
    }

    pub async fn connect_with(credentials: &Credentials) -> Result<CloudClients> {
        let http = reqwest::Client::new();
        let session = Session::authenticate(&http, credentials).await?;

        let client = |service_types: &[&str]| -> Result<ApiClient> {
            let endpoint = session.endpoint(service_types)?;
            tracing::debug!("Using {} endpoint {}", service_types[0], endpoint);
            Ok(ApiClient::new(http.clone(), session.token(), endpoint))
        };

        let compute = NovaClient::new(client(&["compute"])?);
        let network = NeutronClient::new(client(&["network"])?);
        let volume = CinderClient::new(client(&["volumev2", "volume"])?);

        tracing::info!("Connected to OpenStack at {}", credentials.auth_url);
        Ok(CloudClients::new(
            Arc::new(compute),
            Arc::new(network),
            Arc::new(volume),
        ))
    }
}
