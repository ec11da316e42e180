//! Overcast core model
//!
//! Typed stack, deployment and mapping descriptions plus the loaders that
//! read them from disk.

pub mod duration;
pub mod error;
pub mod loader;
pub mod model;
pub mod naming;
pub mod refs;

pub use duration::parse_duration;
pub use error::{ConfigError, Result};
pub use loader::{load_config, load_mappings, load_stack, load_userdata};
pub use model::*;
pub use naming::Suffix;
pub use refs::{WeakRefs, find_weak_refs};
