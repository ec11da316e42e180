//! Deployment error types

use overcast_cloud::{CloudError, VolumeStatus};
use overcast_core::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Command failed with {}", exit_description(.code))]
    CommandFailed { code: Option<i32> },

    #[error("Command timed out and was killed")]
    CommandTimedOut,

    #[error("Provisioning of node '{node}' failed after exhausting its retries")]
    ProvisionFailed { node: String },

    #[error("Duplicate {kind} found for base name '{name}'")]
    DuplicateResource { kind: &'static str, name: String },

    #[error("Volume {volume} ended in status '{status}'")]
    VolumeFailed { volume: String, status: VolumeStatus },

    #[error("Deployment not found: {0}")]
    UnknownDeployment(String),

    #[error("Node not found: {0}")]
    UnknownNode(String),

    #[error("Remote shell step has no target node")]
    MissingNode,

    #[error("Node '{0}' has no floating IP")]
    NoFloatingIp(String),

    #[error("No external network available for floating IPs")]
    NoExternalNetwork,

    #[error("Cloud API error: {0}")]
    Cloud(#[from] CloudError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;
