//! Change-safety checker.
//!
//! Decides whether moving from the applied spec `prev` to the defaulted
//! `next` is allowed. The rules form a table evaluated jointly over both
//! specs; every rule runs and all violations come back in one
//! [`UnsafeChange`].
//!
//! The migration state machine lives here: a backend type change needs a
//! matching `migration.networkType` on the applied spec, a migration directive is frozen until it
//! is cleared, and the cluster and service networks stay fixed while any
//! migration is in flight.

use std::collections::BTreeSet;

use ipnet::IpNet;
use netgrid_core::NetworkSpec;
use tracing::{debug, info};

use crate::context::ReconcileContext;
use crate::error::{ConfigError, UnsafeChange};
use crate::net::{IpFamily, cluster_blocks, format_families, service_blocks};
use crate::registry::{Backend, resolve};

pub fn is_change_safe(
    prev: &NetworkSpec,
    next: &NetworkSpec,
    ctx: &ReconcileContext,
) -> Result<(), UnsafeChange> {
    if prev == next {
        return Ok(());
    }

    let backend = match resolve(next.network_type()) {
        Ok(b) => b,
        Err(e) => return Err(UnsafeChange { errors: vec![e] }),
    };
    let missing = not_defaulted(next, backend);
    if !missing.is_empty() {
        return Err(UnsafeChange { errors: missing });
    }

    let mut errs = Vec::new();
    errs.extend(check_network_type(prev, next));
    errs.extend(check_migration(prev, next));

    if prev.migration.is_some()
        && (prev.cluster_network != next.cluster_network
            || prev.service_network != next.service_network)
    {
        errs.push(ConfigError::conflict(
            "cannot change spec.clusterNetwork or spec.serviceNetwork while a migration is in progress",
        ));
    } else {
        errs.extend(check_family_conversion(prev, next, backend, ctx));
        errs.extend(check_service_network(prev, next));
        errs.extend(check_cluster_network(prev, next));
    }

    if prev.network_type() == next.network_type() {
        errs.extend(backend.is_change_safe(prev, next, ctx));
    }

    if errs.is_empty() {
        debug!(network_type = next.network_type(), "configuration change is safe");
        Ok(())
    } else {
        info!(
            network_type = next.network_type(),
            violations = errs.len(),
            "rejected unsafe configuration change"
        );
        Err(UnsafeChange { errors: errs })
    }
}

fn not_defaulted(next: &NetworkSpec, backend: &dyn Backend) -> Vec<ConfigError> {
    let mut errs = Vec::new();
    if backend.mtu(next).is_none() {
        errs.push(ConfigError::NotDefaulted(format!(
            "{} MTU",
            backend.kind().network_type()
        )));
    }
    if next.deploy_kube_proxy.is_none() {
        errs.push(ConfigError::NotDefaulted("spec.deployKubeProxy".into()));
    }
    errs
}

fn check_network_type(prev: &NetworkSpec, next: &NetworkSpec) -> Option<ConfigError> {
    if prev.network_type() == next.network_type() {
        return None;
    }
    // The target must already be recorded on the applied spec.
    let target = prev.migration.as_ref().and_then(|m| m.network_type.as_deref());
    if target == Some(next.network_type()) {
        info!(
            from = prev.network_type(),
            to = next.network_type(),
            "default network type migration accepted"
        );
        return None;
    }
    Some(ConfigError::conflict(
        "cannot change default network type when not doing migration",
    ))
}

/// A migration directive is frozen from the moment it is set until it is
/// cleared again.
fn check_migration(prev: &NetworkSpec, next: &NetworkSpec) -> Option<ConfigError> {
    let (Some(p), Some(n)) = (&prev.migration, &next.migration) else {
        return None;
    };
    if p.network_type != n.network_type {
        return Some(ConfigError::conflict(
            "cannot change migration network type after migration has started",
        ));
    }
    if p != n {
        return Some(ConfigError::conflict(
            "cannot change spec.migration while a migration is in progress; clear it first",
        ));
    }
    None
}

fn families(blocks: &[IpNet]) -> BTreeSet<IpFamily> {
    blocks.iter().map(IpFamily::of).collect()
}

/// Single-stack to dual-stack and back is limited to conversion platforms
/// and to backends that can run both families.
fn check_family_conversion(
    prev: &NetworkSpec,
    next: &NetworkSpec,
    backend: &dyn Backend,
    ctx: &ReconcileContext,
) -> Vec<ConfigError> {
    let before = families(&service_blocks(prev));
    let after = families(&service_blocks(next));
    if before == after {
        return Vec::new();
    }

    info!(
        platform = %ctx.platform,
        from = %format_families(&before),
        to = %format_families(&after),
        "IP family conversion requested"
    );

    let mut errs = Vec::new();
    if !ctx.allows_dual_stack_conversion() {
        errs.push(ConfigError::conflict(format!(
            "{} does not support converting between single-stack and dual-stack",
            ctx.platform
        )));
    }
    if !backend.supports_dual_stack() {
        errs.push(ConfigError::conflict(format!(
            "{} does not support dual-stack",
            backend.kind().network_type()
        )));
    }
    errs
}

/// Entries of families that appear only in `next` must follow every entry
/// of a family that was already present.
fn check_append_order(label: &str, next: &[IpNet], kept: &BTreeSet<IpFamily>) -> Option<ConfigError> {
    let first_new = next.iter().position(|n| !kept.contains(&IpFamily::of(n)))?;
    if next[first_new..].iter().any(|n| kept.contains(&IpFamily::of(n))) {
        return Some(ConfigError::conflict(format!(
            "new {label} entries must be appended after the existing ones"
        )));
    }
    None
}

/// The primary entry's family never changes. Conversions only add or drop
/// trailing entries.
fn check_primary_family(label: &str, prev: &[IpNet], next: &[IpNet]) -> Option<ConfigError> {
    let (p, n) = (prev.first()?, next.first()?);
    let family = IpFamily::of(p);
    if IpFamily::of(n) != family {
        return Some(ConfigError::conflict(format!(
            "cannot change the IP family of the primary {label} from {family} to {}",
            IpFamily::of(n)
        )));
    }
    None
}

fn check_service_network(prev: &NetworkSpec, next: &NetworkSpec) -> Vec<ConfigError> {
    let before = service_blocks(prev);
    let after = service_blocks(next);
    let kept: BTreeSet<_> = families(&before).intersection(&families(&after)).copied().collect();

    let mut errs = Vec::new();
    let old: Vec<_> = before.iter().filter(|n| kept.contains(&IpFamily::of(n))).collect();
    let new: Vec<_> = after.iter().filter(|n| kept.contains(&IpFamily::of(n))).collect();
    if old != new {
        errs.push(ConfigError::conflict(format!(
            "cannot change spec.serviceNetwork from [{}] to [{}]",
            join(&old),
            join(&new)
        )));
    }
    errs.extend(check_primary_family("spec.serviceNetwork", &before, &after));
    errs.extend(check_append_order("spec.serviceNetwork", &after, &kept));
    errs
}

/// Existing cluster network entries may be widened in place but never
/// narrowed, moved, re-partitioned, or dropped.
fn check_cluster_network(prev: &NetworkSpec, next: &NetworkSpec) -> Vec<ConfigError> {
    let before = cluster_blocks(prev);
    let after = cluster_blocks(next);
    let before_nets: Vec<IpNet> = before.iter().map(|(n, _)| *n).collect();
    let after_nets: Vec<IpNet> = after.iter().map(|(n, _)| *n).collect();
    let kept: BTreeSet<_> = families(&before_nets)
        .intersection(&families(&after_nets))
        .copied()
        .collect();

    let old: Vec<_> = before.iter().filter(|(n, _)| kept.contains(&IpFamily::of(n))).collect();
    let new: Vec<_> = after.iter().filter(|(n, _)| kept.contains(&IpFamily::of(n))).collect();

    let mut errs = Vec::new();
    for ((p, p_hp), (n, n_hp)) in old.iter().zip(new.iter()) {
        if n.prefix_len() > p.prefix_len() {
            errs.push(ConfigError::conflict(format!(
                "cannot narrow spec.clusterNetwork {p} to {n}"
            )));
        } else if !n.contains(&p.network()) {
            errs.push(ConfigError::conflict(format!(
                "cannot change spec.clusterNetwork {p} to {n}"
            )));
        }
        if p_hp != n_hp {
            errs.push(ConfigError::conflict(format!(
                "cannot change the hostPrefix of spec.clusterNetwork {p} from {p_hp} to {n_hp}"
            )));
        }
    }
    if new.len() < old.len() {
        let removed: Vec<_> = old[new.len()..].iter().map(|(n, _)| n).collect();
        errs.push(ConfigError::conflict(format!(
            "cannot remove spec.clusterNetwork entries [{}]",
            join(&removed)
        )));
    }
    errs.extend(check_primary_family("spec.clusterNetwork", &before_nets, &after_nets));
    errs.extend(check_append_order("spec.clusterNetwork", &after_nets, &kept));
    errs
}

fn join<T: ToString>(items: &[T]) -> String {
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::fill_defaults;
    use netgrid_core::{
        ClusterNetworkEntry, DefaultNetwork, NETWORK_TYPE_OPENSHIFT_SDN,
        NETWORK_TYPE_OVN_KUBERNETES, NetworkMigration, PlatformSettings,
    };

    fn ctx(platform: &str) -> ReconcileContext {
        ReconcileContext::new(platform, PlatformSettings::default()).with_host_mtu(1500)
    }

    fn applied(network_type: &str) -> NetworkSpec {
        let spec = NetworkSpec {
            cluster_network: vec![ClusterNetworkEntry::new("10.128.0.0/14", 23)],
            service_network: vec!["172.30.0.0/16".into()],
            default_network: DefaultNetwork::new(network_type),
            ..Default::default()
        };
        fill_defaults(&spec, None, &ctx("BareMetal")).unwrap()
    }

    fn messages(err: UnsafeChange) -> Vec<String> {
        err.errors.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn identical_specs_are_safe() {
        let spec = applied(NETWORK_TYPE_OVN_KUBERNETES);
        assert!(is_change_safe(&spec, &spec, &ctx("AWS")).is_ok());
    }

    #[test]
    fn undefaulted_next_is_a_contract_error() {
        let prev = applied(NETWORK_TYPE_OVN_KUBERNETES);
        let mut next = prev.clone();
        next.deploy_kube_proxy = None;
        let err = is_change_safe(&prev, &next, &ctx("AWS")).unwrap_err();
        assert!(matches!(err.errors[0], ConfigError::NotDefaulted(_)));
    }

    #[test]
    fn migration_is_frozen_until_cleared() {
        let mut prev = applied(NETWORK_TYPE_OPENSHIFT_SDN);
        prev.migration = Some(NetworkMigration {
            network_type: Some(NETWORK_TYPE_OVN_KUBERNETES.into()),
            ..Default::default()
        });
        let mut next = prev.clone();
        next.migration = Some(NetworkMigration {
            network_type: Some(NETWORK_TYPE_OPENSHIFT_SDN.into()),
            ..Default::default()
        });
        let err = is_change_safe(&prev, &next, &ctx("AWS")).unwrap_err();
        assert_eq!(
            messages(err),
            vec!["cannot change migration network type after migration has started"]
        );
    }

    #[test]
    fn networks_frozen_during_migration() {
        let mut prev = applied(NETWORK_TYPE_OVN_KUBERNETES);
        prev.migration = Some(NetworkMigration {
            network_type: Some(NETWORK_TYPE_OVN_KUBERNETES.into()),
            ..Default::default()
        });
        let mut next = prev.clone();
        next.cluster_network[0].cidr = "10.128.0.0/13".into();
        let err = is_change_safe(&prev, &next, &ctx("AWS")).unwrap_err();
        assert!(messages(err)[0].contains("while a migration is in progress"));
    }

    #[test]
    fn widening_allowed_narrowing_rejected() {
        let prev = applied(NETWORK_TYPE_OVN_KUBERNETES);
        let mut wider = prev.clone();
        wider.cluster_network[0].cidr = "10.128.0.0/13".into();
        assert!(is_change_safe(&prev, &wider, &ctx("AWS")).is_ok());

        let mut narrower = prev.clone();
        narrower.cluster_network[0].cidr = "10.128.0.0/15".into();
        let err = is_change_safe(&prev, &narrower, &ctx("AWS")).unwrap_err();
        assert_eq!(
            messages(err),
            vec!["cannot narrow spec.clusterNetwork 10.128.0.0/14 to 10.128.0.0/15"]
        );
    }

    #[test]
    fn moving_a_cluster_network_is_rejected() {
        let prev = applied(NETWORK_TYPE_OVN_KUBERNETES);
        let mut next = prev.clone();
        next.cluster_network[0] = ClusterNetworkEntry::new("10.0.0.0/14", 24);
        let err = is_change_safe(&prev, &next, &ctx("AWS")).unwrap_err();
        assert_eq!(err.errors.len(), 2);
    }

    #[test]
    fn service_network_is_immutable() {
        let prev = applied(NETWORK_TYPE_OVN_KUBERNETES);
        let mut next = prev.clone();
        next.service_network = vec!["172.31.0.0/16".into()];
        assert!(is_change_safe(&prev, &next, &ctx("AWS")).is_err());
    }

    #[test]
    fn prepending_a_new_family_is_rejected() {
        let prev = applied(NETWORK_TYPE_OVN_KUBERNETES);
        let mut next = prev.clone();
        next.cluster_network.insert(0, ClusterNetworkEntry::new("fd01::/48", 64));
        next.service_network.insert(0, "fd02::/112".into());
        let msgs = messages(is_change_safe(&prev, &next, &ctx("BareMetal")).unwrap_err());
        assert!(msgs.iter().any(|m| m.contains("primary spec.serviceNetwork")));
        assert!(msgs.iter().any(|m| m.contains("appended after")));
    }

    #[test]
    fn dropping_the_primary_family_is_rejected() {
        let prev = applied(NETWORK_TYPE_OVN_KUBERNETES);
        let mut dual = prev.clone();
        dual.cluster_network.push(ClusterNetworkEntry::new("fd01::/48", 64));
        dual.service_network.push("fd02::/112".into());

        let mut v6_only = dual.clone();
        v6_only.cluster_network.remove(0);
        v6_only.service_network.remove(0);
        let msgs = messages(is_change_safe(&dual, &v6_only, &ctx("BareMetal")).unwrap_err());
        assert!(msgs.iter().any(|m| m.contains("primary spec.serviceNetwork from IPv4 to IPv6")));
        assert!(msgs.iter().any(|m| m.contains("primary spec.clusterNetwork from IPv4 to IPv6")));

        assert!(is_change_safe(&dual, &prev, &ctx("BareMetal")).is_ok());
    }

    #[test]
    fn type_switch_needs_an_announced_migration() {
        let prev = applied(NETWORK_TYPE_OPENSHIFT_SDN);
        let mut next = applied(NETWORK_TYPE_OVN_KUBERNETES);
        next.migration = Some(NetworkMigration {
            network_type: Some(NETWORK_TYPE_OVN_KUBERNETES.into()),
            ..Default::default()
        });
        let msgs = messages(is_change_safe(&prev, &next, &ctx("AWS")).unwrap_err());
        assert_eq!(msgs, vec!["cannot change default network type when not doing migration"]);
    }

    #[test]
    fn conversion_needs_platform_and_backend() {
        let prev = applied(NETWORK_TYPE_OPENSHIFT_SDN);
        let mut next = prev.clone();
        next.cluster_network.push(ClusterNetworkEntry::new("fd01::/48", 64));
        next.service_network.push("fd02::/112".into());
        let msgs = messages(is_change_safe(&prev, &next, &ctx("AWS")).unwrap_err());
        assert_eq!(
            msgs,
            vec![
                "AWS does not support converting between single-stack and dual-stack",
                "OpenShiftSDN does not support dual-stack",
            ]
        );
    }
}
