//! Command execution engine
//!
//! A shell step runs `bash` behind an environment prefix, locally through
//! `sh -c` or remotely through `ssh`, and streams the step's script to its
//! stdin. Attempts are bounded by deadlines and retried per [`RetryPolicy`].

use crate::error::{DeployError, Result};
use overcast_core::RetryPolicy;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, info, warn};

/// A ready-to-run shell invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    program: String,
    args: Vec<String>,
    script: String,
}

impl ShellCommand {
    /// `sh -c "<prefix>bash"` on this machine
    pub fn local(env_prefix: &str, script: &str) -> Self {
        Self {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), format!("{}bash", env_prefix)],
            script: script.to_string(),
        }
    }

    /// `ssh user@host "<prefix>bash"`; the remote login shell parses the prefix
    pub fn remote(user: &str, host: &str, env_prefix: &str, script: &str) -> Self {
        Self {
            program: "ssh".to_string(),
            args: vec![
                "-o".to_string(),
                "StrictHostKeyChecking=no".to_string(),
                format!("{}@{}", user, host),
                format!("{}bash", env_prefix),
            ],
            script: script.to_string(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Run once. Past `deadline` the process is killed.
    pub async fn run_once(&self, deadline: Option<Instant>) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take();
        let input = format!("{}\n", self.script);
        let attempt = async {
            if let Some(mut stdin) = stdin {
                // The shell may exit before reading everything; that is not an error here.
                if let Err(e) = stdin.write_all(input.as_bytes()).await {
                    debug!(error = %e, "Shell closed stdin early");
                }
                drop(stdin);
            }
            child.wait().await
        };

        let finished = match deadline {
            Some(deadline) => timeout_at(deadline, attempt).await.ok(),
            None => Some(attempt.await),
        };

        let Some(status) = finished else {
            if let Err(e) = child.kill().await {
                warn!(error = %e, "Failed to kill timed out command");
            }
            return Err(DeployError::CommandTimedOut);
        };
        let status = status?;

        if status.success() {
            Ok(())
        } else {
            Err(DeployError::CommandFailed {
                code: status.code(),
            })
        }
    }

    /// Run with deadlines and retries
    ///
    /// Failures are retried only with `retry_if_fails`, and never once the
    /// retry delay would run past the total timeout. A timeout is retried only
    /// when a total timeout is set and the delay still fits before it.
    /// Timeouts too large to represent as an instant mean no deadline.
    pub async fn run(&self, policy: &RetryPolicy) -> Result<()> {
        let overall = policy
            .total_timeout
            .and_then(|total| Instant::now().checked_add(total));
        let mut attempt = 1u32;

        loop {
            let each = policy
                .timeout
                .and_then(|t| Instant::now().checked_add(t));
            let deadline = match (each, overall) {
                (Some(each), Some(overall)) => Some(each.min(overall)),
                (each, overall) => each.or(overall),
            };

            let err = match self.run_once(deadline).await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };

            let retryable = match (Instant::now().checked_add(policy.retry_delay), &err) {
                (Some(retry_after), DeployError::CommandFailed { .. }) => {
                    policy.retry_if_fails && overall.is_none_or(|o| retry_after < o)
                }
                (Some(retry_after), DeployError::CommandTimedOut) => {
                    policy.retry_if_fails && overall.is_some_and(|o| retry_after < o)
                }
                _ => false,
            };
            if !retryable {
                return Err(err);
            }

            info!(attempt, error = %err, delay = ?policy.retry_delay, "Retrying command");
            sleep(policy.retry_delay).await;
            attempt += 1;
        }
    }
}
