//! Deployment runner
//!
//! Owns the state of one run: the provisioner with its naming tables and
//! the nodes built (or adopted) so far. Deployment steps execute strictly in
//! order; the first failing step aborts the rest.

use crate::env::{build_environment, env_prefix};
use crate::error::{DeployError, Result};
use crate::node::Node;
use crate::provisioner::Provisioner;
use crate::reconcile;
use crate::shell::ShellCommand;
use overcast_cloud::{CloudClients, NoopLedger, ResourceLedger, ServerStatus};
use overcast_core::{
    DeployConfig, Mappings, ProvisionStep, ShellStep, ShellTarget, Stack, Step, Suffix,
    load_stack, load_userdata,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, instrument, warn};

/// Knobs of a run
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub suffix: Suffix,
    /// Rebuilds allowed per node after it reaches ERROR
    pub retry_count: u32,
    /// Public key installed on every node
    pub public_key: Option<String>,
    pub node_poll_interval: Duration,
    pub volume_poll_interval: Duration,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            suffix: Suffix::none(),
            retry_count: 0,
            public_key: None,
            node_poll_interval: Duration::from_secs(5),
            volume_poll_interval: Duration::from_secs(3),
        }
    }
}

pub struct DeploymentRunner {
    config: DeployConfig,
    settings: RunnerSettings,
    provisioner: Provisioner,
    /// Nodes by base name
    nodes: BTreeMap<String, Node>,
    keypair: Option<String>,
}

impl DeploymentRunner {
    pub fn new(
        clients: CloudClients,
        config: DeployConfig,
        mappings: Mappings,
        settings: RunnerSettings,
    ) -> Self {
        let provisioner = Provisioner::new(
            clients,
            Arc::new(NoopLedger),
            mappings,
            settings.suffix.clone(),
        );
        Self {
            config,
            settings,
            provisioner,
            nodes: BTreeMap::new(),
            keypair: None,
        }
    }

    /// Record every created resource into `ledger`
    pub fn with_ledger(mut self, ledger: Arc<dyn ResourceLedger>) -> Self {
        self.provisioner.set_ledger(ledger);
        self
    }

    pub fn nodes(&self) -> &BTreeMap<String, Node> {
        &self.nodes
    }

    pub fn node(&self, base_name: &str) -> Option<&Node> {
        self.nodes.get(base_name)
    }

    pub fn provisioner(&self) -> &Provisioner {
        &self.provisioner
    }

    /// Adopt networks, security groups and nodes carrying this run's suffix
    pub async fn detect_existing_resources(&mut self) -> Result<()> {
        reconcile::detect_existing_resources(&mut self.provisioner, &mut self.nodes).await
    }

    /// Run a named deployment
    #[instrument(skip(self))]
    pub async fn deploy(&mut self, name: &str) -> Result<()> {
        let steps = self
            .config
            .deployment(name)
            .ok_or_else(|| DeployError::UnknownDeployment(name.to_string()))?
            .to_vec();

        for (idx, step) in steps.iter().enumerate() {
            info!(step = idx + 1, kind = step.kind(), "Running step");
            match step {
                Step::Provision(details) => self.provision_step(details).await?,
                Step::Shell(details) => self.shell_step(details).await?,
            }
        }

        info!(deployment = name, "Deployment finished");
        Ok(())
    }

    async fn provision_step(&mut self, details: &ProvisionStep) -> Result<()> {
        let stack = load_stack(&details.stack)?;
        let userdata = details.userdata.as_ref().map(load_userdata).transpose()?;
        self.provision(stack, userdata).await
    }

    /// Create whatever the stack declares that does not exist yet and wait for all new nodes
    #[instrument(skip_all, fields(nodes = stack.nodes.len()))]
    pub async fn provision(&mut self, stack: Stack, userdata: Option<String>) -> Result<()> {
        if self.keypair.is_none()
            && let Some(public_key) = &self.settings.public_key
        {
            self.keypair = Some(self.provisioner.ensure_keypair(public_key).await?);
        }

        for (base_name, spec) in &stack.networks {
            if self.provisioner.network_known(base_name) {
                continue;
            }
            self.provisioner.create_network(base_name, spec).await?;
        }

        self.provisioner
            .create_security_groups(&stack.security_groups)
            .await?;

        let mut pending = BTreeSet::new();
        for (base_name, mut template) in stack.nodes {
            for node_name in template.take_expansion(&base_name) {
                if self.nodes.contains_key(&node_name) {
                    continue;
                }
                let mut node = Node::new(
                    self.provisioner.suffix().apply(&node_name),
                    template.clone(),
                    self.settings.retry_count,
                    self.keypair.clone(),
                    userdata.clone(),
                );
                node.build(&self.provisioner, self.settings.volume_poll_interval)
                    .await?;
                self.nodes.insert(node_name.clone(), node);
                pending.insert(node_name);
            }
        }

        while !pending.is_empty() {
            pending = self.poll_pending(pending).await?;
            if pending.is_empty() {
                break;
            }
            sleep(self.settings.node_poll_interval).await;
        }
        Ok(())
    }

    /// Poll every pending node once; return those still pending
    async fn poll_pending(&mut self, pending: BTreeSet<String>) -> Result<BTreeSet<String>> {
        let mut still_pending = BTreeSet::new();
        for name in pending {
            let node = self
                .nodes
                .get_mut(&name)
                .ok_or_else(|| DeployError::UnknownNode(name.clone()))?;

            match node.poll(&self.provisioner, &ServerStatus::Active).await? {
                ServerStatus::Active => info!(node = %node.name(), "Node is active"),
                ServerStatus::Error => {
                    if node.attempts_left() == 0 {
                        return Err(DeployError::ProvisionFailed {
                            node: node.name().to_string(),
                        });
                    }
                    warn!(
                        node = %node.name(),
                        attempts_left = node.attempts_left(),
                        "Node went to ERROR, rebuilding"
                    );
                    node.clean(&self.provisioner).await?;
                    node.build(&self.provisioner, self.settings.volume_poll_interval)
                        .await?;
                    still_pending.insert(name);
                }
                _ => {
                    still_pending.insert(name);
                }
            }
        }
        Ok(still_pending)
    }

    /// Run one shell step with the run's environment
    pub async fn shell_step(&self, details: &ShellStep) -> Result<()> {
        let target = match details.target {
            ShellTarget::Local => None,
            ShellTarget::Remote => {
                let base_name = details.node.as_deref().ok_or(DeployError::MissingNode)?;
                let node = self
                    .nodes
                    .get(base_name)
                    .ok_or_else(|| DeployError::UnknownNode(base_name.to_string()))?;
                Some(node)
            }
        };

        let env = build_environment(&self.nodes, self.provisioner.suffix(), target, details);
        let prefix = env_prefix(&env);

        let command = match target {
            None => ShellCommand::local(&prefix, &details.cmd),
            Some(node) => {
                let host = node
                    .floating_ip()
                    .ok_or_else(|| DeployError::NoFloatingIp(node.name().to_string()))?;
                ShellCommand::remote(&details.user, host, &prefix, &details.cmd)
            }
        };

        command.run(&details.policy()).await
    }
}
