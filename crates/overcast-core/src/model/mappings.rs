//! Static mapping overrides

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Router key meaning "attach every newly created subnet to this router"
pub const DEFAULT_ROUTER_KEY: &str = "*";

/// Logical-name tables consulted before any creation decision
///
/// INI form:
/// ```ini
/// [images]
/// trusty = 5f3c5b2e-...
/// [flavors]
/// small = m1.small
/// [networks]
/// public = 0b1c...
/// [routers]
/// * = 7a2d...
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mappings {
    #[serde(default)]
    pub images: BTreeMap<String, String>,
    #[serde(default)]
    pub flavors: BTreeMap<String, String>,
    #[serde(default)]
    pub networks: BTreeMap<String, String>,
    #[serde(default)]
    pub routers: BTreeMap<String, String>,
}

impl Mappings {
    /// Image reference for a logical image name (the name itself if unmapped)
    pub fn image<'a>(&'a self, name: &'a str) -> &'a str {
        self.images.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Flavor reference for a logical flavor name (the name itself if unmapped)
    pub fn flavor<'a>(&'a self, name: &'a str) -> &'a str {
        self.flavors.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn network(&self, name: &str) -> Option<&str> {
        self.networks.get(name).map(String::as_str)
    }

    /// Router every new subnet gets attached to, if configured
    pub fn default_router(&self) -> Option<&str> {
        self.routers.get(DEFAULT_ROUTER_KEY).map(String::as_str)
    }
}
