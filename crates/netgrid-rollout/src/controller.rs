//! Rollout orchestrator — decides which units may update this pass.
//!
//! The decision runs through a fixed sequence of stages. Each stage only
//! runs while the previous ones left both units free to update:
//!
//! 1. fresh install (a unit is missing) updates everything;
//! 2. network convergence moves the control plane to a new IP family mode
//!    or cluster CIDR list before the nodes follow;
//! 3. version skew orders node and control plane by upgrade direction;
//! 4. the prewarm gate holds the node until the next image is pulled
//!    everywhere.
//!
//! Hung tolerance is applied earlier, when observations are turned into
//! [`RolloutUnitStatus`] values.

use std::collections::BTreeMap;

use netgrid_core::{BootstrapSnapshot, IpFamilyMode, NetworkSpec, RolloutSettings, RolloutUnitStatus};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::status::unit_status;
use crate::strategy::{SkewOrder, sequence_versions};

/// Apply layer creates the object if missing but leaves an existing one alone.
pub const CREATE_WAIT_ANNOTATION: &str = "network.netgrid.io/create-wait";
pub const RELEASE_VERSION_ANNOTATION: &str = "network.netgrid.io/release-version";
pub const IP_FAMILY_MODE_ANNOTATION: &str = "network.netgrid.io/ip-family-mode";
pub const CLUSTER_NETWORK_CIDR_ANNOTATION: &str = "network.netgrid.io/cluster-network-cidr";

/// A rendered rollout unit the decision annotates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RolloutTarget {
    Node,
    ControlPlane,
    Prewarm,
}

/// The stage that last constrained the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RolloutStage {
    FreshInstall,
    NetworkConvergence,
    VersionSkew,
    Prewarm,
    /// Nothing held either unit back.
    Steady,
}

/// Everything the orchestrator looks at for one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolloutInput {
    pub desired_mode: IpFamilyMode,
    /// Desired cluster network CIDRs, in order.
    pub desired_cidrs: Vec<String>,
    pub release_version: String,
    pub node: Option<RolloutUnitStatus>,
    pub control_plane: Option<RolloutUnitStatus>,
    pub prewarm: Option<RolloutUnitStatus>,
}

impl RolloutInput {
    /// Build the input from the bootstrap snapshot and the applied spec.
    ///
    /// Hung tolerance applies to the per-node and prewarm units only; the
    /// control plane is small enough that a stuck replica is a real problem.
    pub fn from_snapshot(snapshot: &BootstrapSnapshot, spec: &NetworkSpec, settings: &RolloutSettings) -> Self {
        let tolerance = Some(&settings.hung_tolerance);
        Self {
            desired_mode: spec.ip_family_mode(),
            desired_cidrs: spec.cluster_cidrs(),
            release_version: snapshot.release_version.clone(),
            node: snapshot.node_unit.as_ref().map(|o| unit_status(o, tolerance)),
            control_plane: snapshot.control_plane_unit.as_ref().map(|o| unit_status(o, None)),
            prewarm: snapshot.prewarm_unit.as_ref().map(|o| unit_status(o, tolerance)),
        }
    }
}

/// Output of one orchestrator pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolloutDecision {
    pub update_node: bool,
    pub update_control_plane: bool,
    pub render_prewarm: bool,
    /// An unparseable version forced both units to update.
    pub fail_open: bool,
    pub stage: RolloutStage,
    /// Annotations to stamp on each rendered unit.
    pub annotations: BTreeMap<RolloutTarget, BTreeMap<String, String>>,
}

/// Run one orchestrator pass.
pub fn decide(input: &RolloutInput) -> RolloutDecision {
    let mut decision = RolloutDecision {
        update_node: true,
        update_control_plane: true,
        render_prewarm: false,
        fail_open: false,
        stage: RolloutStage::Steady,
        annotations: BTreeMap::new(),
    };

    let (Some(node), Some(cp)) = (&input.node, &input.control_plane) else {
        info!("rollout unit status missing; treating as fresh install");
        decision.stage = RolloutStage::FreshInstall;
        stamp_annotations(&mut decision, input);
        return decision;
    };

    let (update_node, update_cp) = converge_network(node, cp, input);
    if !(update_node && update_cp) {
        decision.update_node = update_node;
        decision.update_control_plane = update_cp;
        decision.stage = RolloutStage::NetworkConvergence;
        stamp_annotations(&mut decision, input);
        return decision;
    }

    let order = sequence_versions(node, cp, &input.release_version);
    (decision.update_node, decision.update_control_plane) = order.flags();
    match order {
        SkewOrder::FailOpen => decision.fail_open = true,
        SkewOrder::NodeFirst | SkewOrder::ControlPlaneFirst => {
            decision.stage = RolloutStage::VersionSkew;
        }
        SkewOrder::Both | SkewOrder::Inconsistent => {}
    }

    // Fail-open must update both units, so the prewarm gate is skipped.
    if decision.update_node && !decision.fail_open {
        let (update_node, render_prewarm) = prewarm_gate(node, input.prewarm.as_ref(), &input.release_version);
        if !update_node {
            decision.stage = RolloutStage::Prewarm;
        }
        decision.update_node = update_node;
        decision.render_prewarm = render_prewarm;
    }

    stamp_annotations(&mut decision, input);
    debug!(
        update_node = decision.update_node,
        update_control_plane = decision.update_control_plane,
        render_prewarm = decision.render_prewarm,
        stage = ?decision.stage,
        "rollout decision"
    );
    decision
}

/// Whether a unit already runs with the desired network settings. An empty
/// recorded value means the unit predates the annotation.
fn network_matches(unit: &RolloutUnitStatus, input: &RolloutInput, check_mode: bool, check_cidrs: bool) -> bool {
    let mode_ok = !check_mode || unit.ip_family_mode == input.desired_mode.as_str();
    let cidrs_ok = !check_cidrs || unit.cluster_network_cidrs == input.desired_cidrs;
    mode_ok && cidrs_ok
}

/// The control plane must pick up a new IP family mode or cluster CIDR list
/// before any node does; nodes follow once it has finished rolling out.
fn converge_network(node: &RolloutUnitStatus, cp: &RolloutUnitStatus, input: &RolloutInput) -> (bool, bool) {
    let check_mode = !node.ip_family_mode.is_empty() && !cp.ip_family_mode.is_empty();
    let check_cidrs = !node.cluster_network_cidrs.is_empty() && !cp.cluster_network_cidrs.is_empty();

    if network_matches(node, input, check_mode, check_cidrs) && network_matches(cp, input, check_mode, check_cidrs) {
        return (true, true);
    }
    if !network_matches(cp, input, check_mode, check_cidrs) {
        info!(
            mode = %input.desired_mode,
            cidrs = ?input.desired_cidrs,
            "network change detected; updating control plane first"
        );
        return (false, true);
    }
    if cp.progressing {
        info!("waiting for control plane network change to roll out before updating node");
        return (false, true);
    }
    info!("control plane network change rolled out; updating node");
    (true, true)
}

/// `(update_node, render_prewarm)`: hold the node until the prewarm unit
/// has pulled the target release everywhere.
fn prewarm_gate(node: &RolloutUnitStatus, prewarm: Option<&RolloutUnitStatus>, target: &str) -> (bool, bool) {
    if node.version == target {
        return (true, false);
    }
    let Some(prewarm) = prewarm else {
        info!(release = target, "rendering prewarm unit before updating node");
        return (false, true);
    };
    if prewarm.version != target {
        info!(
            release = target,
            prewarm = %prewarm.version,
            "re-rendering prewarm unit for the new target"
        );
        return (false, true);
    }
    if prewarm.progressing {
        info!(release = target, "waiting for prewarm unit to finish pulling before updating node");
        return (false, true);
    }
    info!(release = target, "prewarm complete; updating node");
    (true, false)
}

fn stamp_annotations(decision: &mut RolloutDecision, input: &RolloutInput) {
    let mut common = BTreeMap::new();
    common.insert(RELEASE_VERSION_ANNOTATION.to_string(), input.release_version.clone());
    common.insert(IP_FAMILY_MODE_ANNOTATION.to_string(), input.desired_mode.to_string());
    common.insert(CLUSTER_NETWORK_CIDR_ANNOTATION.to_string(), input.desired_cidrs.join(","));

    let mut targets = vec![
        (RolloutTarget::Node, decision.update_node),
        (RolloutTarget::ControlPlane, decision.update_control_plane),
    ];
    if decision.render_prewarm {
        targets.push((RolloutTarget::Prewarm, true));
    }

    for (target, update) in targets {
        let mut annotations = common.clone();
        if !update {
            annotations.insert(CREATE_WAIT_ANNOTATION.to_string(), "true".to_string());
        }
        decision.annotations.insert(target, annotations);
    }
}
