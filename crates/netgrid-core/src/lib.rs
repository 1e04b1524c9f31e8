//! netgrid-core — shared data model for the netgrid operator core.
//!
//! # Components
//!
//! - **`types`** — `NetworkSpec` and per-backend configuration
//! - **`bootstrap`** — Cluster facts handed to the core each reconcile pass
//! - **`ippool`** — Overlap-detecting CIDR set
//! - **`version`** — Release version comparison
//! - **`config`** — `netgrid.toml` operator settings

pub mod bootstrap;
pub mod config;
pub mod ippool;
pub mod types;
pub mod version;

pub use bootstrap::{
    BootstrapSnapshot, IpsecRolloutStatus, MachineCapabilityStatus, RolloutCounts,
    RolloutUnitStatus, UnitKind, UnitObservation,
};
pub use config::{HungTolerance, OperatorSettings, PlatformSettings, RolloutSettings, SettingsError};
pub use ippool::{IpPool, IpPoolError};
pub use types::*;
pub use version::{VersionChange, compare_versions, parse_release_version};
