pub mod cleanup;
pub mod deploy;
pub mod list_refs;
