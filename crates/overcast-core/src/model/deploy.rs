//! Deployment configuration

use crate::duration;
use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Named deployments, each an ordered list of steps
///
/// YAML form:
/// ```yaml
/// default:
///   - provision:
///       stack: stack.yaml
///       userdata: userdata.txt
///   - shell:
///       type: remote
///       node: web1
///       retry-if-fails: true
///       retry-delay: 10s
///       total-timeout: 10m
///       cmd: |
///         sudo apt-get update
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeployConfig {
    pub deployments: BTreeMap<String, Vec<Step>>,
}

impl DeployConfig {
    pub fn deployment(&self, name: &str) -> Option<&[Step]> {
        self.deployments.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.deployments.keys().map(String::as_str)
    }

    /// Check constraints serde cannot express
    pub fn validate(&self) -> Result<()> {
        for (name, steps) in &self.deployments {
            for (idx, step) in steps.iter().enumerate() {
                if let Step::Shell(shell) = step
                    && shell.target == ShellTarget::Remote
                    && shell.node.is_none()
                {
                    return Err(ConfigError::InvalidStep {
                        deployment: name.clone(),
                        message: format!("step {} is a remote shell step without a node", idx + 1),
                    });
                }
            }
        }
        Ok(())
    }
}

/// One unit of a deployment sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Provision(ProvisionStep),
    Shell(ShellStep),
}

impl Step {
    pub fn kind(&self) -> &'static str {
        match self {
            Step::Provision(_) => "provision",
            Step::Shell(_) => "shell",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionStep {
    /// Path of the stack file
    pub stack: PathBuf,
    /// Path of a boot script handed to every node
    #[serde(default)]
    pub userdata: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellTarget {
    #[default]
    Local,
    Remote,
}

fn default_remote_user() -> String {
    "ubuntu".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ShellStep {
    /// Script streamed to the shell's stdin
    pub cmd: String,
    #[serde(default, rename = "type")]
    pub target: ShellTarget,
    /// Base name of the node a remote step runs on
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default = "default_remote_user")]
    pub user: String,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "duration::deserialize_opt", skip_serializing)]
    pub timeout: Option<Duration>,
    #[serde(default, deserialize_with = "duration::deserialize_opt", skip_serializing)]
    pub total_timeout: Option<Duration>,
    #[serde(default, deserialize_with = "duration::deserialize_opt", skip_serializing)]
    pub retry_delay: Option<Duration>,
    #[serde(default)]
    pub retry_if_fails: bool,
}

impl ShellStep {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: self.timeout,
            total_timeout: self.total_timeout,
            retry_delay: self.retry_delay.unwrap_or(Duration::ZERO),
            retry_if_fails: self.retry_if_fails,
        }
    }
}

/// Deadline and retry knobs of a shell step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Ceiling per attempt
    pub timeout: Option<Duration>,
    /// Ceiling across all attempts
    pub total_timeout: Option<Duration>,
    /// Pause between attempts
    pub retry_delay: Duration,
    /// Retry on non-zero exit, and on timeout while time remains
    pub retry_if_fails: bool,
}
