//! Per-backend rules.
//!
//! Each backend lives in its own module and implements
//! [`Backend`](crate::registry::Backend). Rules shared between backends,
//! such as MTU migration, live here.

mod kuryr;
mod ovn;
mod sdn;

pub use kuryr::Kuryr;
pub use ovn::OvnKubernetes;
pub use sdn::OpenShiftSdn;

use netgrid_core::NetworkSpec;

use crate::error::ConfigError;
use crate::net::{MAX_MTU, min_mtu};

/// Pod MTU for a first install: host MTU minus the backend overhead.
pub(crate) fn fresh_mtu(host_mtu: Option<u32>, overhead: u32) -> Result<u32, ConfigError> {
    let host = host_mtu.ok_or_else(|| {
        ConfigError::conflict("host MTU was not probed; cannot compute a default MTU on first install")
    })?;
    Ok(host.saturating_sub(overhead))
}

/// Validate a configured pod MTU against the family range minus overhead.
pub(crate) fn check_mtu_range(spec: &NetworkSpec, mtu: Option<u32>, overhead: u32, label: &str) -> Option<ConfigError> {
    let mtu = mtu?;
    let min = min_mtu(spec);
    let max = MAX_MTU - overhead;
    if mtu < min || mtu > max {
        return Some(ConfigError::conflict(format!(
            "invalid {label} MTU {mtu}, must be in range {min}-{max}"
        )));
    }
    None
}

/// MTU immutability, relaxed by an explicit `migration.mtu` directive.
///
/// With a directive present, `network.from` must match the applied MTU
/// (checked only when the directive is new or its `from` changed), both
/// targets must fall inside the family range, and the machine MTU must
/// leave room for the encapsulation overhead. Without one, the MTU may only
/// change to complete a previous directive.
pub(crate) fn check_mtu_change(
    prev: &NetworkSpec,
    next: &NetworkSpec,
    prev_mtu: Option<u32>,
    next_mtu: Option<u32>,
    overhead: u32,
    label: &str,
) -> Vec<ConfigError> {
    let mut errs = Vec::new();
    let prev_directive = prev.migration.as_ref().and_then(|m| m.mtu.as_ref());
    let next_directive = next.migration.as_ref().and_then(|m| m.mtu.as_ref());

    let Some(directive) = next_directive else {
        if prev_mtu != next_mtu {
            let completing = prev_directive
                .and_then(|d| d.network.as_ref())
                .and_then(|n| n.to);
            match completing {
                Some(target) if next_mtu == Some(target) => {}
                Some(target) => errs.push(ConfigError::conflict(format!(
                    "{label} MTU must be set to Migration.MTU.Network.To ({target}) when completing an MTU migration"
                ))),
                None => errs.push(ConfigError::conflict(format!(
                    "cannot change {label} MTU without migration"
                ))),
            }
        }
        return errs;
    };

    let network = directive.network.as_ref();
    let from = network.and_then(|n| n.from);
    let to = network.and_then(|n| n.to);
    let machine_to = directive.machine.as_ref().and_then(|m| m.to);
    let (Some(from), Some(to), Some(machine_to)) = (from, to, machine_to) else {
        errs.push(ConfigError::conflict(
            "invalid Migration.MTU, at least one of the required fields is missing",
        ));
        return errs;
    };

    let prev_from = prev_directive
        .and_then(|d| d.network.as_ref())
        .and_then(|n| n.from);
    if prev_from != Some(from) && prev_mtu != Some(from) {
        let applied = prev_mtu.map_or_else(|| "unset".to_string(), |m| m.to_string());
        errs.push(ConfigError::conflict(format!(
            "invalid Migration.MTU.Network.From({from}) not equal to the currently applied MTU({applied})"
        )));
    }

    let min = min_mtu(next);
    if to < min || to > MAX_MTU {
        errs.push(ConfigError::conflict(format!(
            "invalid Migration.MTU.Network.To({to}), has to be in range: {min}-{MAX_MTU}"
        )));
    }
    if machine_to < min || machine_to > MAX_MTU {
        errs.push(ConfigError::conflict(format!(
            "invalid Migration.MTU.Machine.To({machine_to}), has to be in range: {min}-{MAX_MTU}"
        )));
    }
    let required = to.saturating_add(overhead);
    if required > machine_to {
        errs.push(ConfigError::conflict(format!(
            "invalid Migration.MTU.Machine.To({machine_to}), has to be at least {required}"
        )));
    }
    errs
}
