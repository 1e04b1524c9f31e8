//! OpenShift SDN rules.

use netgrid_core::{NetworkSpec, OpenShiftSdnConfig, SdnMode};

use super::{check_mtu_change, check_mtu_range, fresh_mtu};
use crate::context::ReconcileContext;
use crate::error::ConfigError;
use crate::net::{uses_ipv6, valid_port};
use crate::registry::{Backend, BackendKind};

pub const VXLAN_OVERHEAD: u32 = 50;
pub const DEFAULT_VXLAN_PORT: u32 = 4789;

const LABEL: &str = "openshift-sdn";

pub struct OpenShiftSdn;

fn config(spec: &NetworkSpec) -> Option<&OpenShiftSdnConfig> {
    spec.default_network.openshift_sdn_config.as_ref()
}

impl Backend for OpenShiftSdn {
    fn kind(&self) -> BackendKind {
        BackendKind::OpenShiftSdn
    }

    fn encap_overhead(&self, _spec: &NetworkSpec) -> u32 {
        VXLAN_OVERHEAD
    }

    fn mtu(&self, spec: &NetworkSpec) -> Option<u32> {
        config(spec).and_then(|c| c.mtu)
    }

    fn validate(&self, spec: &NetworkSpec, _ctx: &ReconcileContext) -> Vec<ConfigError> {
        let mut errs = Vec::new();
        if uses_ipv6(spec) {
            errs.push(ConfigError::conflict("openshift-sdn does not support IPv6"));
        }
        let Some(cfg) = config(spec) else {
            return errs;
        };
        if let Some(port) = cfg.vxlan_port.filter(|p| !valid_port(*p)) {
            errs.push(ConfigError::conflict(format!("invalid vxlanPort {port}")));
        }
        if let Some(e) = check_mtu_range(spec, cfg.mtu, VXLAN_OVERHEAD, LABEL) {
            errs.push(e);
        }
        errs
    }

    fn fill_defaults(
        &self,
        next: &mut NetworkSpec,
        previous: Option<&NetworkSpec>,
        ctx: &ReconcileContext,
    ) -> Result<(), ConfigError> {
        let prev = previous.and_then(config);
        let cfg = next
            .default_network
            .openshift_sdn_config
            .get_or_insert_with(OpenShiftSdnConfig::default);

        if cfg.mode.is_none() {
            cfg.mode = Some(prev.and_then(|p| p.mode).unwrap_or(SdnMode::NetworkPolicy));
        }
        if cfg.vxlan_port.is_none() {
            cfg.vxlan_port = Some(prev.and_then(|p| p.vxlan_port).unwrap_or(DEFAULT_VXLAN_PORT));
        }
        if cfg.mtu.is_none() {
            cfg.mtu = match prev.and_then(|p| p.mtu) {
                Some(mtu) => Some(mtu),
                None => Some(fresh_mtu(ctx.host_mtu, VXLAN_OVERHEAD)?),
            };
        }
        cfg.enable_unidling.get_or_insert(true);
        Ok(())
    }

    fn is_change_safe(
        &self,
        prev: &NetworkSpec,
        next: &NetworkSpec,
        _ctx: &ReconcileContext,
    ) -> Vec<ConfigError> {
        let (Some(p), Some(n)) = (config(prev), config(next)) else {
            return Vec::new();
        };
        let mut errs = Vec::new();
        if p.mode != n.mode {
            errs.push(ConfigError::conflict("cannot change openshift-sdn mode"));
        }
        if p.vxlan_port != n.vxlan_port {
            errs.push(ConfigError::conflict("cannot change openshift-sdn vxlanPort"));
        }
        errs.extend(check_mtu_change(prev, next, p.mtu, n.mtu, VXLAN_OVERHEAD, LABEL));
        errs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netgrid_core::{ClusterNetworkEntry, DefaultNetwork, NETWORK_TYPE_OPENSHIFT_SDN, PlatformSettings};

    fn ctx() -> ReconcileContext {
        ReconcileContext::new("AWS", PlatformSettings::default()).with_host_mtu(9001)
    }

    fn spec() -> NetworkSpec {
        NetworkSpec {
            cluster_network: vec![ClusterNetworkEntry::new("10.128.0.0/14", 23)],
            service_network: vec!["172.30.0.0/16".into()],
            default_network: DefaultNetwork::new(NETWORK_TYPE_OPENSHIFT_SDN),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_on_first_install() {
        let mut s = spec();
        OpenShiftSdn.fill_defaults(&mut s, None, &ctx()).unwrap();
        let cfg = s.default_network.openshift_sdn_config.unwrap();
        assert_eq!(cfg.mode, Some(SdnMode::NetworkPolicy));
        assert_eq!(cfg.vxlan_port, Some(DEFAULT_VXLAN_PORT));
        assert_eq!(cfg.mtu, Some(8951));
        assert_eq!(cfg.enable_unidling, Some(true));
    }

    #[test]
    fn rejects_ipv6() {
        let mut s = spec();
        s.service_network = vec!["fd02::/112".into()];
        s.cluster_network = vec![ClusterNetworkEntry::new("fd01::/48", 64)];
        let errs = OpenShiftSdn.validate(&s, &ctx());
        assert_eq!(errs.len(), 1);
    }

    #[test]
    fn mode_and_port_are_immutable() {
        let mut prev = spec();
        OpenShiftSdn.fill_defaults(&mut prev, None, &ctx()).unwrap();
        let mut next = prev.clone();
        {
            let cfg = next.default_network.openshift_sdn_config.as_mut().unwrap();
            cfg.mode = Some(SdnMode::Multitenant);
            cfg.vxlan_port = Some(4790);
            cfg.enable_unidling = Some(false);
        }
        let errs = OpenShiftSdn.is_change_safe(&prev, &next, &ctx());
        assert_eq!(errs.len(), 2, "{errs:?}");
    }
}
