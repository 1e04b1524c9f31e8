//! netgrid rollout orchestration — version skew, prewarm, hung tolerance.
//!
//! This crate decides, once per reconcile pass, which networking rollout
//! units may be updated: the per-node unit, the centralized control-plane
//! unit, and the no-op prewarm unit that pulls the next image fleet-wide
//! ahead of an upgrade. It also plans the host-level IPsec units.
//!
//! # Components
//!
//! - **`status`** — Progress evaluation with hung-rollout tolerance
//! - **`strategy`** — Version-skew ordering between node and control plane
//! - **`controller`** — The per-pass orchestrator (`decide`)
//! - **`ipsec`** — IPsec unit rendering plan

pub mod controller;
pub mod ipsec;
pub mod status;
pub mod strategy;

pub use controller::{
    CLUSTER_NETWORK_CIDR_ANNOTATION, CREATE_WAIT_ANNOTATION, IP_FAMILY_MODE_ANNOTATION,
    RELEASE_VERSION_ANNOTATION, RolloutDecision, RolloutInput, RolloutStage, RolloutTarget, decide,
};
pub use ipsec::{IpsecPlan, plan_ipsec};
pub use status::{is_progressing, unit_status};
pub use strategy::{SkewOrder, sequence_versions};
