//! Bootstrap snapshot — cluster facts gathered outside the core.
//!
//! The snapshot is collected fresh for every reconcile pass by an external
//! collaborator and handed to the core as plain data. Nothing in here is
//! cached across passes.

use serde::{Deserialize, Serialize};

/// Whether a rollout unit is replicated on every node or runs centrally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitKind {
    PerNode,
    Centralized,
}

/// Raw rollout counters observed on a unit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolloutCounts {
    /// Members that should be running the current revision.
    pub desired: u32,
    /// Members already running the current revision.
    pub updated: u32,
    pub available: u32,
    pub generation: i64,
    pub observed_generation: i64,
    /// The unit carries the rollout-hung marker.
    #[serde(default)]
    pub hung: bool,
}

/// A rollout unit as read from the cluster, before progress evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitObservation {
    pub kind: UnitKind,
    pub namespace: String,
    pub name: String,
    /// Release version recorded on the unit. Empty when unannotated.
    #[serde(default)]
    pub version: String,
    /// IP family mode recorded on the unit. Empty when unannotated.
    #[serde(default)]
    pub ip_family_mode: String,
    #[serde(default)]
    pub cluster_network_cidrs: Vec<String>,
    #[serde(default)]
    pub counts: RolloutCounts,
}

/// Live status of a rollout unit for one reconcile pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolloutUnitStatus {
    pub kind: UnitKind,
    pub namespace: String,
    pub name: String,
    pub version: String,
    pub ip_family_mode: String,
    pub cluster_network_cidrs: Vec<String>,
    pub progressing: bool,
}

/// Host-level encryption rollout state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpsecRolloutStatus {
    /// A pre-split single-unit encryption deployment still exists.
    pub legacy_upgrade: bool,
    /// Encryption is active (or rolling out) in the overlay.
    pub active: bool,
}

/// Machine-level IPsec capability (host packages and services).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineCapabilityStatus {
    /// The capability has been requested from the machine layer.
    pub present: bool,
    /// The capability is rolled out on every machine pool.
    pub active: bool,
    /// The machine layer is ready to accept new capability requests.
    pub operator_ready: bool,
}

/// Everything the core needs to know about the live cluster for one pass.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapSnapshot {
    /// Infrastructure platform type, e.g. `BareMetal`, `AWS`, `None`.
    #[serde(default)]
    pub platform: String,
    /// Host MTU probed by the bootstrap step. Used only on first install.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_mtu: Option<u32>,
    /// Release version the operator is converging to.
    #[serde(default)]
    pub release_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_unit: Option<UnitObservation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane_unit: Option<UnitObservation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prewarm_unit: Option<UnitObservation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipsec: Option<IpsecRolloutStatus>,
    #[serde(default)]
    pub machine_ipsec: MachineCapabilityStatus,
    /// The control plane is hosted outside the cluster.
    #[serde(default)]
    pub hosted_control_plane: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_snapshot_parses() {
        let snap: BootstrapSnapshot =
            serde_json::from_str(r#"{"platform": "AWS", "releaseVersion": "4.14.0"}"#).unwrap();
        assert_eq!(snap.platform, "AWS");
        assert!(snap.node_unit.is_none());
        assert!(snap.control_plane_unit.is_none());
        assert!(!snap.machine_ipsec.active);
    }

    #[test]
    fn unit_observation_parses() {
        let json = r#"{
            "kind": "per-node",
            "namespace": "netgrid-system",
            "name": "netgrid-node",
            "version": "4.13.2",
            "ipFamilyMode": "single-stack",
            "clusterNetworkCidrs": ["10.128.0.0/14"],
            "counts": {"desired": 3, "updated": 3, "available": 3, "generation": 2, "observedGeneration": 2}
        }"#;
        let unit: UnitObservation = serde_json::from_str(json).unwrap();
        assert_eq!(unit.kind, UnitKind::PerNode);
        assert_eq!(unit.counts.desired, 3);
        assert!(!unit.counts.hung);
    }
}
