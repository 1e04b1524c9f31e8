//! Kuryr rules. Kuryr allocates pod addresses from OpenStack subnets and
//! does not partition the cluster network per node.

use ipnet::IpNet;
use netgrid_core::{KuryrConfig, NetworkSpec};

use super::fresh_mtu;
use crate::context::ReconcileContext;
use crate::error::ConfigError;
use crate::net::{parse_cidr, service_blocks, uses_ipv6, valid_port};
use crate::registry::{Backend, BackendKind};

pub const DEFAULT_DAEMON_PROBES_PORT: u32 = 8090;
pub const DEFAULT_CONTROLLER_PROBES_PORT: u32 = 8091;
pub const DEFAULT_POOL_BATCH_PORTS: u32 = 3;
pub const DEFAULT_POOL_MIN_PORTS: u32 = 1;

pub struct Kuryr;

fn config(spec: &NetworkSpec) -> Option<&KuryrConfig> {
    spec.default_network.kuryr_config.as_ref()
}

/// Service network widened by one bit, the default OpenStack service subnet.
fn widened_service_network(spec: &NetworkSpec) -> Option<String> {
    let svc = *service_blocks(spec).first()?;
    let widened = IpNet::new(svc.network(), svc.prefix_len().checked_sub(1)?).ok()?;
    Some(widened.trunc().to_string())
}

impl Backend for Kuryr {
    fn kind(&self) -> BackendKind {
        BackendKind::Kuryr
    }

    fn uses_host_prefix(&self) -> bool {
        false
    }

    fn embeds_service_proxy(&self) -> bool {
        false
    }

    fn encap_overhead(&self, _spec: &NetworkSpec) -> u32 {
        0
    }

    fn mtu(&self, spec: &NetworkSpec) -> Option<u32> {
        config(spec).and_then(|c| c.mtu)
    }

    fn validate(&self, spec: &NetworkSpec, _ctx: &ReconcileContext) -> Vec<ConfigError> {
        let mut errs = Vec::new();
        if uses_ipv6(spec) {
            errs.push(ConfigError::conflict("kuryr does not support IPv6"));
        }
        let Some(cfg) = config(spec) else {
            return errs;
        };

        for (field, port) in [
            ("daemonProbesPort", cfg.daemon_probes_port),
            ("controllerProbesPort", cfg.controller_probes_port),
        ] {
            if let Some(port) = port.filter(|p| !valid_port(*p)) {
                errs.push(ConfigError::conflict(format!("invalid {field} {port}")));
            }
        }

        if let Some(raw) = &cfg.openstack_service_network {
            match parse_cidr("kuryrConfig.openStackServiceNetwork", raw) {
                Ok(os_net) => {
                    for svc in service_blocks(spec) {
                        if !os_net.contains(&svc) || os_net.prefix_len() >= svc.prefix_len() {
                            errs.push(ConfigError::conflict(format!(
                                "openStackServiceNetwork {os_net} must contain and be larger than spec.serviceNetwork {svc}"
                            )));
                        }
                    }
                }
                Err(e) => errs.push(e),
            }
        }

        let max = cfg.pool_max_ports.unwrap_or(0);
        let min = cfg.pool_min_ports.unwrap_or(DEFAULT_POOL_MIN_PORTS);
        if max != 0 && min > max {
            errs.push(ConfigError::conflict(format!(
                "poolMinPorts {min} cannot be larger than poolMaxPorts {max}"
            )));
        }
        if cfg.pool_batch_ports == Some(0) {
            errs.push(ConfigError::conflict("poolBatchPorts must be greater than 0"));
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
        let widened = widened_service_network(next);
        let cfg = next.default_network.kuryr_config.get_or_insert_with(KuryrConfig::default);

        if cfg.daemon_probes_port.is_none() {
            cfg.daemon_probes_port =
                Some(prev.and_then(|p| p.daemon_probes_port).unwrap_or(DEFAULT_DAEMON_PROBES_PORT));
        }
        if cfg.controller_probes_port.is_none() {
            cfg.controller_probes_port = Some(
                prev.and_then(|p| p.controller_probes_port)
                    .unwrap_or(DEFAULT_CONTROLLER_PROBES_PORT),
            );
        }
        if cfg.openstack_service_network.is_none() {
            cfg.openstack_service_network = prev
                .and_then(|p| p.openstack_service_network.clone())
                .or(widened);
        }
        if cfg.mtu.is_none() {
            cfg.mtu = match prev.and_then(|p| p.mtu) {
                Some(mtu) => Some(mtu),
                None => Some(fresh_mtu(ctx.host_mtu, 0)?),
            };
        }
        cfg.enable_port_pools_prepopulation.get_or_insert(false);
        cfg.pool_max_ports.get_or_insert(0);
        cfg.pool_min_ports.get_or_insert(DEFAULT_POOL_MIN_PORTS);
        cfg.pool_batch_ports.get_or_insert(DEFAULT_POOL_BATCH_PORTS);
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
        if p.daemon_probes_port != n.daemon_probes_port {
            errs.push(ConfigError::conflict("cannot change kuryr daemonProbesPort"));
        }
        if p.controller_probes_port != n.controller_probes_port {
            errs.push(ConfigError::conflict("cannot change kuryr controllerProbesPort"));
        }
        if p.openstack_service_network != n.openstack_service_network {
            errs.push(ConfigError::conflict("cannot change kuryr openStackServiceNetwork"));
        }
        if next.migration.as_ref().is_some_and(|m| m.mtu.is_some()) {
            errs.push(ConfigError::conflict("MTU migration is not supported with kuryr"));
        } else if p.mtu != n.mtu {
            errs.push(ConfigError::conflict("cannot change kuryr MTU"));
        }
        errs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netgrid_core::{ClusterNetworkEntry, DefaultNetwork, NETWORK_TYPE_KURYR, PlatformSettings};

    fn ctx() -> ReconcileContext {
        ReconcileContext::new("OpenStack", PlatformSettings::default()).with_host_mtu(1450)
    }

    fn spec() -> NetworkSpec {
        NetworkSpec {
            cluster_network: vec![ClusterNetworkEntry::new("10.128.0.0/14", 0)],
            service_network: vec!["172.30.0.0/16".into()],
            default_network: DefaultNetwork::new(NETWORK_TYPE_KURYR),
            ..Default::default()
        }
    }

    #[test]
    fn openstack_service_network_defaults_to_double_size() {
        let mut s = spec();
        Kuryr.fill_defaults(&mut s, None, &ctx()).unwrap();
        let cfg = s.default_network.kuryr_config.as_ref().unwrap();
        assert_eq!(cfg.openstack_service_network.as_deref(), Some("172.30.0.0/15"));
        assert_eq!(cfg.mtu, Some(1450));
        assert!(Kuryr.validate(&s, &ctx()).is_empty());
    }

    #[test]
    fn openstack_service_network_must_cover_services() {
        let mut s = spec();
        s.default_network.kuryr_config = Some(KuryrConfig {
            openstack_service_network: Some("172.30.0.0/16".into()),
            pool_min_ports: Some(10),
            pool_max_ports: Some(5),
            ..Default::default()
        });
        let errs = Kuryr.validate(&s, &ctx());
        assert_eq!(errs.len(), 2, "{errs:?}");
    }

    #[test]
    fn ports_are_immutable() {
        let mut prev = spec();
        Kuryr.fill_defaults(&mut prev, None, &ctx()).unwrap();
        let mut next = prev.clone();
        next.default_network.kuryr_config.as_mut().unwrap().daemon_probes_port = Some(9000);
        let errs = Kuryr.is_change_safe(&prev, &next, &ctx());
        assert_eq!(errs.len(), 1);
    }
}
