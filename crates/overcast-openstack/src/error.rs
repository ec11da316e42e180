//! OpenStack backend error types

use overcast_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpenStackError {
    #[error("Environment variable not set: {0}")]
    MissingEnvVar(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("No '{service}' endpoint in the service catalog")]
    EndpointNotFound { service: String },

    #[error("{method} {url} returned {status}: {message}")]
    Api {
        method: String,
        url: String,
        status: u16,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OpenStackError {
    /// HTTP status of an API error response
    pub fn status(&self) -> Option<u16> {
        match self {
            OpenStackError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<OpenStackError> for CloudError {
    fn from(err: OpenStackError) -> Self {
        match err.status() {
            Some(404) => return CloudError::NotFound(err.to_string()),
            Some(409) => return CloudError::Conflict(err.to_string()),
            Some(401) => return CloudError::AuthenticationFailed(err.to_string()),
            _ => {}
        }
        match err {
            OpenStackError::Api {
                status, message, ..
            } => CloudError::ApiError { status, message },
            OpenStackError::AuthenticationFailed(message) => {
                CloudError::AuthenticationFailed(message)
            }
            OpenStackError::Http(e) => CloudError::Transport(e.to_string()),
            OpenStackError::Json(e) => CloudError::InvalidResponse(e.to_string()),
            other => CloudError::InvalidResponse(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, OpenStackError>;
