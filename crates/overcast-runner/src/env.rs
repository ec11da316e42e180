//! Shell step environment
//!
//! Variables are passed to the shell as an inline `KEY=value ...` prefix in
//! front of `bash`, which also carries them across ssh.

use crate::node::Node;
use overcast_core::{ShellStep, Suffix};
use std::collections::BTreeMap;
use tracing::warn;

/// Quote a string for POSIX shells
pub fn shell_escape(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Replace every character outside `[A-Za-z0-9_]` with `_`
fn sanitize_identifier(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn is_identifier(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with(|c: char| c.is_ascii_digit())
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Variable exposing the fixed address of an exported node's port
pub fn export_variable_name(node: &str, network: &str) -> String {
    sanitize_identifier(&format!("OVERCAST_{}_{}_fixed", node, network))
}

/// `$NAME` reads `NAME` from the process environment; anything else is literal
fn resolve_value(key: &str, value: &str) -> String {
    match value.strip_prefix('$') {
        Some(var) => std::env::var(var).unwrap_or_else(|_| {
            warn!(key, var, "Environment variable is not set, using an empty value");
            String::new()
        }),
        None => value.to_string(),
    }
}

/// Collect the variables of one shell step, in the order they are applied
///
/// `nodes` is keyed by base name. `target` is the node a remote step runs on.
pub fn build_environment(
    nodes: &BTreeMap<String, Node>,
    suffix: &Suffix,
    target: Option<&Node>,
    step: &ShellStep,
) -> Vec<(String, String)> {
    let mut env = Vec::new();

    let all_nodes = nodes
        .keys()
        .map(|base| suffix.apply(base))
        .collect::<Vec<_>>()
        .join(" ");
    env.push(("ALL_NODES".to_string(), all_nodes));

    for (base, node) in nodes {
        if !node.template().export {
            continue;
        }
        for port in node.ports() {
            env.push((
                export_variable_name(base, &port.network_name),
                port.fixed_ip.clone(),
            ));
        }
    }

    let overrides = target
        .map(|node| &node.template().environment)
        .into_iter()
        .chain(std::iter::once(&step.environment));
    for vars in overrides {
        for (key, value) in vars {
            if !is_identifier(key) {
                warn!(key = %key, "Skipping invalid environment variable name");
                continue;
            }
            env.push((key.clone(), resolve_value(key, value)));
        }
    }

    env
}

/// Render variables as `KEY='value' ` pairs ready to precede a command
pub fn env_prefix(env: &[(String, String)]) -> String {
    env.iter()
        .map(|(key, value)| format!("{}={} ", key, shell_escape(value)))
        .collect()
}
