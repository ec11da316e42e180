//! Model definitions
//!
//! Stacks describe what to provision, deployment configs describe which
//! steps to run, mappings override logical names with real references.

mod deploy;
mod mappings;
mod stack;

// Re-exports
pub use deploy::*;
pub use mappings::*;
pub use stack::*;
