//! Config validator.
//!
//! Returns every semantic error found in a proposed [`NetworkSpec`]; an empty
//! list means the spec is valid. Nothing here short-circuits except where a
//! later check would only repeat an earlier failure.

use netgrid_core::{IpPool, IpsecMode, NetworkSpec};
use tracing::debug;

use crate::context::ReconcileContext;
use crate::error::ConfigError;
use crate::net::{IpFamily, cluster_families, format_families, parse_cidr, service_families};
use crate::registry::{Backend, BackendKind, resolve};

/// Validate `spec` against the cluster facts in `ctx`.
pub fn validate(spec: &NetworkSpec, ctx: &ReconcileContext) -> Vec<ConfigError> {
    let mut errs = Vec::new();

    let backend = match resolve(spec.network_type()) {
        Ok(b) => Some(b),
        Err(e) => {
            errs.push(e);
            None
        }
    };

    errs.extend(validate_ip_pools(spec, backend));
    errs.extend(validate_families(spec, ctx));
    errs.extend(validate_migration(spec));

    if spec.use_multi_network_policy == Some(true) && spec.disable_multi_network == Some(true) {
        errs.push(ConfigError::conflict(
            "useMultiNetworkPolicy cannot be set when disableMultiNetwork is set",
        ));
    }

    if let Some(backend) = backend {
        errs.extend(backend.validate(spec, ctx));
    }

    debug!(
        network_type = spec.network_type(),
        errors = errs.len(),
        "validated network configuration"
    );
    errs
}

/// CIDR syntax, host prefix bounds, and pairwise overlap.
fn validate_ip_pools(spec: &NetworkSpec, backend: Option<&dyn Backend>) -> Vec<ConfigError> {
    let mut errs = Vec::new();
    let mut pool = IpPool::new();
    let ignores_host_prefix = backend.is_some_and(|b| !b.uses_host_prefix());

    for entry in &spec.cluster_network {
        let net = match parse_cidr("spec.clusterNetwork", &entry.cidr) {
            Ok(n) => n,
            Err(e) => {
                errs.push(e);
                continue;
            }
        };
        if let Err(e) = pool.add(net) {
            errs.push(e.into());
        }

        if ignores_host_prefix && entry.host_prefix == 0 {
            continue;
        }
        let mask = u32::from(net.prefix_len());
        let bits = IpFamily::of(&net).address_bits();
        if entry.host_prefix < mask {
            errs.push(ConfigError::conflict(format!(
                "hostPrefix {} is smaller than the mask of clusterNetwork {net}",
                entry.host_prefix
            )));
        } else if entry.host_prefix > bits - 2 {
            errs.push(ConfigError::conflict(format!(
                "hostPrefix {} for clusterNetwork {net} leaves fewer than 2 host bits",
                entry.host_prefix
            )));
        }
    }

    for cidr in &spec.service_network {
        match parse_cidr("spec.serviceNetwork", cidr) {
            Ok(net) => {
                if let Err(e) = pool.add(net) {
                    errs.push(e.into());
                }
            }
            Err(e) => errs.push(e),
        }
    }
    errs
}

/// Service network count, cluster/service family agreement, and the
/// dual-stack platform allow-list.
fn validate_families(spec: &NetworkSpec, ctx: &ReconcileContext) -> Vec<ConfigError> {
    let mut errs = Vec::new();
    let svc_families = service_families(spec);
    let cluster = cluster_families(spec);

    match spec.service_network.len() {
        1 => {}
        2 => {
            if svc_families.len() != 2 {
                errs.push(ConfigError::conflict(
                    "spec.serviceNetwork must contain at most one IPv4 and one IPv6 network",
                ));
            }
        }
        n => errs.push(ConfigError::conflict(format!(
            "spec.serviceNetwork must have one or two entries, found {n}"
        ))),
    }

    if spec.cluster_network.is_empty() {
        errs.push(ConfigError::conflict("spec.clusterNetwork must have at least 1 entry"));
    } else if !svc_families.is_empty() && !cluster.is_empty() && svc_families != cluster {
        errs.push(ConfigError::conflict(format!(
            "spec.clusterNetwork ({}) and spec.serviceNetwork ({}) must use the same IP families",
            format_families(&cluster),
            format_families(&svc_families)
        )));
    }

    if (svc_families.len() > 1 || cluster.len() > 1) && !ctx.allows_dual_stack() {
        errs.push(ConfigError::conflict(format!(
            "{} is not one of the supported platforms for dual-stack",
            ctx.platform
        )));
    }
    errs
}

fn validate_migration(spec: &NetworkSpec) -> Vec<ConfigError> {
    let mut errs = Vec::new();
    let Some(migration) = &spec.migration else {
        return errs;
    };

    if let Some(target) = &migration.network_type {
        if BackendKind::from_network_type(target).is_none() {
            errs.push(ConfigError::UnsupportedBackend(target.clone()));
        }
        if migration.mtu.is_some() {
            errs.push(ConfigError::conflict(
                "spec.migration.networkType and spec.migration.mtu cannot be set at the same time",
            ));
        }
    }

    if migration
        .ipsec_mode
        .is_some_and(|m| m != IpsecMode::Disabled)
        && BackendKind::from_network_type(spec.network_type()) != Some(BackendKind::OvnKubernetes)
    {
        errs.push(ConfigError::conflict(
            "spec.migration.ipsecMode is only supported with OVNKubernetes",
        ));
    }
    errs
}
