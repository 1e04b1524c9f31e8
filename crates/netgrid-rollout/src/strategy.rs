//! Version-skew ordering between the node and control-plane units.
//!
//! Upgrades roll the per-node unit first and the control plane second;
//! downgrades run the other way round. The table below is keyed by the
//! direction each unit still has to move to reach the target release.

use netgrid_core::{RolloutUnitStatus, VersionChange, compare_versions};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Outcome of the version-skew stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkewOrder {
    /// Both units are at the target, or the order does not matter.
    Both,
    /// Upgrade in progress: node goes first.
    NodeFirst,
    /// Downgrade in progress: control plane goes first.
    ControlPlaneFirst,
    /// A version could not be parsed; everything is updated.
    FailOpen,
    /// The deltas do not describe a sane rollout; everything is updated.
    Inconsistent,
}

impl SkewOrder {
    /// `(update_node, update_control_plane)` for this order.
    pub fn flags(&self) -> (bool, bool) {
        match self {
            SkewOrder::NodeFirst => (true, false),
            SkewOrder::ControlPlaneFirst => (false, true),
            SkewOrder::Both | SkewOrder::FailOpen | SkewOrder::Inconsistent => (true, true),
        }
    }
}

/// Decide which unit may move towards `target` this pass.
pub fn sequence_versions(
    node: &RolloutUnitStatus,
    control_plane: &RolloutUnitStatus,
    target: &str,
) -> SkewOrder {
    if node.version == target && control_plane.version == target {
        return SkewOrder::Both;
    }

    let node_delta = compare_versions(&node.version, target);
    let cp_delta = compare_versions(&control_plane.version, target);

    use VersionChange::*;
    match (node_delta, cp_delta) {
        (Unknown, _) | (_, Unknown) => {
            warn!(
                node = %node.version,
                control_plane = %control_plane.version,
                release = target,
                "could not determine update direction; updating both units"
            );
            SkewOrder::FailOpen
        }
        (Upgrade, Upgrade) => {
            info!(release = target, "upgrading node before control plane");
            SkewOrder::NodeFirst
        }
        (Upgrade, Same) => {
            info!(release = target, "control plane already at target; upgrading node");
            SkewOrder::Both
        }
        (Same, Upgrade) => {
            if node.progressing {
                info!(release = target, "waiting for node rollout before upgrading control plane");
                SkewOrder::NodeFirst
            } else {
                info!(release = target, "node rollout complete; upgrading control plane");
                SkewOrder::Both
            }
        }
        (Downgrade, Downgrade) => {
            info!(release = target, "downgrading control plane before node");
            SkewOrder::ControlPlaneFirst
        }
        (Same, Downgrade) => {
            info!(release = target, "node already at target; downgrading control plane");
            SkewOrder::Both
        }
        (Downgrade, Same) => {
            if control_plane.progressing {
                info!(release = target, "waiting for control plane rollout before downgrading node");
                SkewOrder::ControlPlaneFirst
            } else {
                info!(release = target, "control plane rollout complete; downgrading node");
                SkewOrder::Both
            }
        }
        (Same, Same) => SkewOrder::Both,
        (Upgrade, Downgrade) | (Downgrade, Upgrade) => {
            warn!(
                node = %node.version,
                control_plane = %control_plane.version,
                release = target,
                "unit versions are inconsistent; updating both units"
            );
            SkewOrder::Inconsistent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netgrid_core::UnitKind;

    fn unit(kind: UnitKind, version: &str, progressing: bool) -> RolloutUnitStatus {
        RolloutUnitStatus {
            kind,
            namespace: "netgrid".into(),
            name: "unit".into(),
            version: version.into(),
            ip_family_mode: "single-stack".into(),
            cluster_network_cidrs: vec!["10.128.0.0/14".into()],
            progressing,
        }
    }

    fn order(node: &str, node_busy: bool, cp: &str, cp_busy: bool) -> SkewOrder {
        sequence_versions(
            &unit(UnitKind::PerNode, node, node_busy),
            &unit(UnitKind::Centralized, cp, cp_busy),
            "4.14.0",
        )
    }

    #[test]
    fn upgrade_table() {
        assert_eq!(order("4.13.0", false, "4.13.0", false), SkewOrder::NodeFirst);
        assert_eq!(order("4.14.0", true, "4.13.0", false), SkewOrder::NodeFirst);
        assert_eq!(order("4.14.0", false, "4.13.0", false), SkewOrder::Both);
        assert_eq!(order("4.13.0", false, "4.14.0", false), SkewOrder::Both);
    }

    #[test]
    fn downgrade_table() {
        assert_eq!(order("4.15.0", false, "4.15.0", false), SkewOrder::ControlPlaneFirst);
        assert_eq!(order("4.15.0", false, "4.14.0", true), SkewOrder::ControlPlaneFirst);
        assert_eq!(order("4.15.0", false, "4.14.0", false), SkewOrder::Both);
    }

    #[test]
    fn unknown_versions_fail_open() {
        assert_eq!(order("", false, "4.13.0", false), SkewOrder::FailOpen);
        assert_eq!(order("4.13.0", false, "garbage", false), SkewOrder::FailOpen);
        assert_eq!(SkewOrder::FailOpen.flags(), (true, true));
    }

    #[test]
    fn opposite_directions_are_inconsistent() {
        assert_eq!(order("4.13.0", false, "4.15.0", false), SkewOrder::Inconsistent);
    }
}
