//! IPsec rollout planner.
//!
//! Encryption runs in one of two shapes: a host unit that relies on IPsec
//! packages installed by the machine layer, or a containerized unit that
//! ships its own. Hosted control planes can only use the containerized
//! shape. While a legacy single-unit deployment is being split up, both
//! shapes are rendered so encryption never drops.

use netgrid_core::{BootstrapSnapshot, IpsecMode};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Which IPsec objects to render this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpsecPlan {
    /// Ask the machine layer for the host IPsec capability.
    pub render_machine_capability: bool,
    /// Any IPsec daemon at all.
    pub render_daemon: bool,
    pub render_host_unit: bool,
    pub render_containerized_unit: bool,
    /// Turn on encryption inside the overlay.
    pub enable_in_overlay: bool,
    /// Create the daemon units if missing but do not update existing ones.
    pub create_wait_only: bool,
}

pub fn plan_ipsec(mode: IpsecMode, snapshot: &BootstrapSnapshot) -> IpsecPlan {
    let status = snapshot.ipsec.unwrap_or_default();
    let machine = snapshot.machine_ipsec;
    let hosted = snapshot.hosted_control_plane;
    let legacy = status.legacy_upgrade;

    let render_daemon = status.active || mode == IpsecMode::Full;
    let render_host_unit = (render_daemon && machine.active && !hosted) || legacy;
    let render_containerized_unit = (render_daemon && hosted) || legacy;

    let render_machine_capability = (mode != IpsecMode::Disabled || render_daemon)
        && !hosted
        && (machine.present || machine.operator_ready);

    let enable_in_overlay = (render_host_unit || render_containerized_unit) && mode == IpsecMode::Full;
    let create_wait_only = legacy || (render_machine_capability && !machine.active);

    let plan = IpsecPlan {
        render_machine_capability,
        render_daemon,
        render_host_unit,
        render_containerized_unit,
        enable_in_overlay,
        create_wait_only,
    };
    if plan != IpsecPlan::default() {
        info!(?mode, hosted, legacy, plan = ?plan, "planned IPsec rollout");
    }
    plan
}
