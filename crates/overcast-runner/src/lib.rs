//! Overcast runner
//!
//! Provisions stacks of networks, security groups and compute nodes through
//! the cloud API traits, runs deployment steps against them, and tears down
//! whatever a resource ledger recorded.

pub mod env;
pub mod error;
pub mod node;
pub mod provisioner;
pub mod reconcile;
pub mod runner;
pub mod shell;
pub mod teardown;

pub use error::{DeployError, Result};
pub use node::{Node, Port};
pub use provisioner::Provisioner;
pub use runner::{DeploymentRunner, RunnerSettings};
pub use shell::ShellCommand;
pub use teardown::{TeardownReport, delete_resource, teardown, teardown_log};
