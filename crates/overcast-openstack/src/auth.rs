//! Keystone v2.0 password authentication

use crate::error::{OpenStackError, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Credentials as exported by an OpenStack RC file
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub auth_url: String,
    pub tenant_name: String,
    pub region_name: Option<String>,
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| OpenStackError::MissingEnvVar(name.to_string()))
}

impl Credentials {
    /// Read `OS_USERNAME`, `OS_PASSWORD`, `OS_AUTH_URL`, `OS_TENANT_NAME` and optionally `OS_REGION_NAME`
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            username: required_var("OS_USERNAME")?,
            password: required_var("OS_PASSWORD")?,
            auth_url: required_var("OS_AUTH_URL")?,
            tenant_name: required_var("OS_TENANT_NAME")?,
            region_name: std::env::var("OS_REGION_NAME").ok(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access: Access,
}

#[derive(Debug, Deserialize)]
struct Access {
    token: Token,
    #[serde(default, rename = "serviceCatalog")]
    service_catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct Token {
    id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(rename = "publicURL")]
    pub public_url: String,
}

/// An issued token plus the endpoints it is valid for
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
    catalog: Vec<CatalogEntry>,
    region: Option<String>,
}

impl Session {
    pub async fn authenticate(http: &reqwest::Client, credentials: &Credentials) -> Result<Self> {
        let url = format!("{}/tokens", credentials.auth_url.trim_end_matches('/'));
        let body = json!({
            "auth": {
                "tenantName": credentials.tenant_name,
                "passwordCredentials": {
                    "username": credentials.username,
                    "password": credentials.password,
                },
            },
        });

        let response = http.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(OpenStackError::AuthenticationFailed(format!(
                "{} ({})",
                message.trim(),
                status
            )));
        }

        let text = response.text().await?;
        let session = Self::from_token_response(&text, credentials.region_name.clone())?;
        tracing::debug!(
            "Authenticated as {} ({} services in catalog)",
            credentials.username,
            session.catalog.len()
        );
        Ok(session)
    }

    fn from_token_response(body: &str, region: Option<String>) -> Result<Self> {
        let response: TokenResponse = serde_json::from_str(body)?;
        Ok(Self {
            token: response.access.token.id,
            catalog: response.access.service_catalog,
            region,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Public URL of the first service of the given types, in preference order
    ///
    /// With a region configured only endpoints of that region qualify.
    pub fn endpoint(&self, service_types: &[&str]) -> Result<String> {
        service_types
            .iter()
            .find_map(|service_type| {
                self.catalog
                    .iter()
                    .filter(|entry| entry.service_type == *service_type)
                    .flat_map(|entry| entry.endpoints.iter())
                    .find(|endpoint| match &self.region {
                        Some(region) => endpoint.region.as_deref() == Some(region.as_str()),
                        None => true,
                    })
            })
            .map(|endpoint| endpoint.public_url.trim_end_matches('/').to_string())
            .ok_or_else(|| OpenStackError::EndpointNotFound {
                service: service_types.join("|"),
            })
    }
}
