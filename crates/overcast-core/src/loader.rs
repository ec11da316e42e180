//! File loading
//!
//! Stack and deployment files are YAML, mapping files are INI.

use crate::error::{ConfigError, Result};
use crate::model::{DeployConfig, Mappings, Stack};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{debug, instrument};

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = read_file(path)?;
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a stack description
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_stack(path: impl AsRef<Path>) -> Result<Stack> {
    let stack: Stack = load_yaml(path.as_ref())?;
    debug!(
        networks = stack.networks.len(),
        security_groups = stack.security_groups.len(),
        nodes = stack.nodes.len(),
        "Loaded stack"
    );
    Ok(stack)
}

/// Load and validate a deployment config
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_config(path: impl AsRef<Path>) -> Result<DeployConfig> {
    let config: DeployConfig = load_yaml(path.as_ref())?;
    config.validate()?;
    debug!(deployments = config.deployments.len(), "Loaded deployment config");
    Ok(config)
}

/// Load mapping overrides from an INI file
///
/// Sections `images`, `flavors`, `networks` and `routers` are read; missing
/// sections are empty. Keys are case-folded the way INI readers do.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_mappings(path: impl AsRef<Path>) -> Result<Mappings> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path.as_ref()).format(config::FileFormat::Ini))
        .build()?;
    let mappings: Mappings = settings.try_deserialize()?;
    debug!(
        images = mappings.images.len(),
        flavors = mappings.flavors.len(),
        networks = mappings.networks.len(),
        routers = mappings.routers.len(),
        "Loaded mappings"
    );
    Ok(mappings)
}

/// Read a boot script
pub fn load_userdata(path: impl AsRef<Path>) -> Result<String> {
    read_file(path.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_mappings_from_ini() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("mappings.ini");
        fs::write(
            &path,
            "[images]\ntrusty = img-123\n\n[flavors]\nsmall = m1.small\n\n[routers]\n* = router-1\n",
        )
        .unwrap();

        let mappings = load_mappings(&path).unwrap();
        assert_eq!(mappings.image("trusty"), "img-123");
        assert_eq!(mappings.flavor("small"), "m1.small");
        assert!(mappings.networks.is_empty());
        assert_eq!(mappings.default_router(), Some("router-1"));
    }

    #[test]
    fn test_load_mappings_missing_file() {
        let temp_dir = tempdir().unwrap();
        assert!(load_mappings(temp_dir.path().join("absent.ini")).is_err());
    }

    #[test]
    fn test_load_stack_reports_path_on_yaml_error() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("stack.yaml");
        fs::write(&path, "nodes: [unclosed").unwrap();

        match load_stack(&path) {
            Err(ConfigError::Yaml { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_load_config_validates() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join(".overcast.yaml");
        fs::write(&path, "default:\n  - shell:\n      type: remote\n      cmd: ls\n").unwrap();

        assert!(matches!(
            load_config(&path),
            Err(ConfigError::InvalidStep { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        match load_stack("/nonexistent/stack.yaml") {
            Err(ConfigError::Io { .. }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
