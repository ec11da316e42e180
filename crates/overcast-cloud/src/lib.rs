//! Overcast Cloud API
//!
//! This crate defines the capability set the Overcast engine needs from a
//! cloud control plane, together with the resource ledger used to tear down
//! whatever a run created.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                overcast-runner                   │
//! │      (stack orchestrator, nodes, teardown)       │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                overcast-cloud                    │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  ComputeApi / NetworkApi / VolumeApi      │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │  Resources   │  │    Ledger    │            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼────────────┐
//! │ overcast-openstack │
//! └────────────────────┘
//! ```

pub mod error;
pub mod ledger;
pub mod provider;
pub mod resource;

// Re-exports
pub use error::{CloudError, Result};
pub use ledger::{
    FileLedger, LedgerEntry, MemoryLedger, NoopLedger, ResourceLedger, parse_ledger, read_ledger,
};
pub use provider::{CloudClients, ComputeApi, NetworkApi, VolumeApi};
pub use resource::{
    FixedIp, FloatingIpInfo, NetworkInfo, PortInfo, PortRequest, ROUTER_INTERFACE_OWNER,
    RemoteSource, ResourceKind, SecurityGroupInfo, SecurityGroupRuleRequest, ServerInfo,
    ServerRequest, ServerStatus, SubnetInfo, VolumeInfo, VolumeRequest, VolumeStatus,
};
