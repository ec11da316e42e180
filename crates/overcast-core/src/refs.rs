//! Weak references
//!
//! Names a stack uses but does not define itself. These must be resolvable
//! through mapping overrides (or exist verbatim in the cloud).

use crate::model::Stack;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeakRefs {
    pub images: BTreeSet<String>,
    pub flavors: BTreeSet<String>,
    /// Networks attached to but not declared by the stack
    pub networks: BTreeSet<String>,
}

pub fn find_weak_refs(stack: &Stack) -> WeakRefs {
    let mut refs = WeakRefs::default();
    for node in stack.nodes.values() {
        refs.images.insert(node.image.clone());
        refs.flavors.insert(node.flavor.clone());
        refs.networks.extend(
            node.networks
                .iter()
                .filter(|attachment| !stack.networks.contains_key(&attachment.network))
                .map(|attachment| attachment.network.clone()),
        );
    }
    refs
}
