//! OVN-Kubernetes rules.

use netgrid_core::{
    GatewayConfig, HybridOverlayConfig, IpPool, IpsecConfig, IpsecMode, NetworkSpec,
    OvnKubernetesConfig, PolicyAuditConfig,
};
use tracing::info;

use super::{check_mtu_change, check_mtu_range, fresh_mtu};
use crate::context::ReconcileContext;
use crate::error::ConfigError;
use crate::net::{IpFamily, cluster_blocks, cluster_families, parse_cidr, service_blocks, valid_port};
use crate::registry::{Backend, BackendKind};

pub const GENEVE_OVERHEAD: u32 = 100;
/// Additional ESP overhead when IPsec is on.
pub const IPSEC_OVERHEAD: u32 = 46;
pub const DEFAULT_GENEVE_PORT: u32 = 6081;
pub const DEFAULT_HYBRID_VXLAN_PORT: u32 = 4789;
pub const DEFAULT_V4_INTERNAL_SUBNET: &str = "100.64.0.0/16";
pub const DEFAULT_V6_INTERNAL_SUBNET: &str = "fd98::/64";
pub const DEFAULT_V4_TRANSIT_SUBNET: &str = "100.88.0.0/16";
pub const DEFAULT_V6_TRANSIT_SUBNET: &str = "fd97::/64";
pub const DEFAULT_V4_MASQUERADE_SUBNET: &str = "169.254.0.0/17";
pub const DEFAULT_V6_MASQUERADE_SUBNET: &str = "fd69::/112";

const LABEL: &str = "ovn-kubernetes";

pub struct OvnKubernetes;

fn overhead_for(mode: IpsecMode) -> u32 {
    match mode {
        IpsecMode::Disabled => GENEVE_OVERHEAD,
        IpsecMode::External | IpsecMode::Full => GENEVE_OVERHEAD + IPSEC_OVERHEAD,
    }
}

fn config(spec: &NetworkSpec) -> Option<&OvnKubernetesConfig> {
    spec.default_network.ovn_kubernetes_config.as_ref()
}

/// Internal subnet fields, effective value (configured or default), and family.
fn internal_subnets(cfg: &OvnKubernetesConfig) -> [(&'static str, String, IpFamily); 6] {
    let gw = cfg.gateway_config.clone().unwrap_or_default();
    let pick = |v: &Option<String>, d: &str| v.clone().unwrap_or_else(|| d.to_string());
    [
        ("v4InternalSubnet", pick(&cfg.v4_internal_subnet, DEFAULT_V4_INTERNAL_SUBNET), IpFamily::V4),
        ("v6InternalSubnet", pick(&cfg.v6_internal_subnet, DEFAULT_V6_INTERNAL_SUBNET), IpFamily::V6),
        ("v4TransitSubnet", pick(&cfg.v4_transit_subnet, DEFAULT_V4_TRANSIT_SUBNET), IpFamily::V4),
        ("v6TransitSubnet", pick(&cfg.v6_transit_subnet, DEFAULT_V6_TRANSIT_SUBNET), IpFamily::V6),
        (
            "gatewayConfig.v4InternalMasqueradeSubnet",
            pick(&gw.v4_internal_masquerade_subnet, DEFAULT_V4_MASQUERADE_SUBNET),
            IpFamily::V4,
        ),
        (
            "gatewayConfig.v6InternalMasqueradeSubnet",
            pick(&gw.v6_internal_masquerade_subnet, DEFAULT_V6_MASQUERADE_SUBNET),
            IpFamily::V6,
        ),
    ]
}

/// Maximum node count the IPv4 cluster network can hand subnets to.
fn max_v4_nodes(spec: &NetworkSpec) -> u64 {
    cluster_blocks(spec)
        .iter()
        .filter(|(net, hp)| IpFamily::of(net) == IpFamily::V4 && u32::from(net.prefix_len()) <= *hp)
        .map(|(net, hp)| 1u64 << (hp - u32::from(net.prefix_len())).min(32))
        .sum()
}

impl Backend for OvnKubernetes {
    fn kind(&self) -> BackendKind {
        BackendKind::OvnKubernetes
    }

    fn supports_dual_stack(&self) -> bool {
        true
    }

    fn encap_overhead(&self, spec: &NetworkSpec) -> u32 {
        overhead_for(config(spec).map_or(IpsecMode::Disabled, |c| c.ipsec_mode()))
    }

    fn mtu(&self, spec: &NetworkSpec) -> Option<u32> {
        config(spec).and_then(|c| c.mtu)
    }

    fn validate(&self, spec: &NetworkSpec, _ctx: &ReconcileContext) -> Vec<ConfigError> {
        let mut errs = Vec::new();
        let cfg = config(spec).cloned().unwrap_or_default();

        if let Some(e) = check_mtu_range(spec, cfg.mtu, self.encap_overhead(spec), LABEL) {
            errs.push(e);
        }
        if let Some(port) = cfg.geneve_port.filter(|p| !valid_port(*p)) {
            errs.push(ConfigError::conflict(format!("invalid genevePort {port}")));
        }

        // Internal subnets must stay clear of the pod and service space and
        // of each other. Only families the cluster uses are checked.
        let mut pool = IpPool::new();
        for (net, _) in cluster_blocks(spec) {
            let _ = pool.add(net);
        }
        for net in service_blocks(spec) {
            let _ = pool.add(net);
        }
        let families = cluster_families(spec);
        for (field, value, family) in internal_subnets(&cfg) {
            if !families.contains(&family) {
                continue;
            }
            let net = match parse_cidr(field, &value) {
                Ok(n) => n,
                Err(e) => {
                    errs.push(e);
                    continue;
                }
            };
            if IpFamily::of(&net) != family {
                errs.push(ConfigError::conflict(format!(
                    "{field} {value} must be an {family} subnet"
                )));
                continue;
            }
            if let Err(e) = pool.add(net) {
                errs.push(ConfigError::conflict(format!("{field} is invalid: {e}")));
                continue;
            }
            if field == "v4InternalSubnet" {
                let capacity = (1u64 << (32 - u32::from(net.prefix_len()))).saturating_sub(2);
                let nodes = max_v4_nodes(spec);
                if capacity < nodes {
                    errs.push(ConfigError::conflict(format!(
                        "v4InternalSubnet {value} is not large enough for the maximum number of nodes ({nodes}) supported by spec.clusterNetwork"
                    )));
                }
            }
        }

        if let Some(hybrid) = &cfg.hybrid_overlay_config {
            for entry in &hybrid.hybrid_cluster_network {
                let net = match parse_cidr("hybridOverlayConfig.hybridClusterNetwork", &entry.cidr) {
                    Ok(n) => n,
                    Err(e) => {
                        errs.push(e);
                        continue;
                    }
                };
                if IpFamily::of(&net) == IpFamily::V6 {
                    errs.push(ConfigError::conflict(format!(
                        "hybrid overlay is not supported on IPv6 networks: {net}"
                    )));
                    continue;
                }
                if let Err(e) = pool.add(net) {
                    errs.push(ConfigError::conflict(format!(
                        "hybridOverlayConfig.hybridClusterNetwork is invalid: {e}"
                    )));
                }
            }
            if let Some(port) = hybrid.hybrid_overlay_vxlan_port.filter(|p| !valid_port(*p)) {
                errs.push(ConfigError::conflict(format!("invalid hybridOverlayVXLANPort {port}")));
            }
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
            .ovn_kubernetes_config
            .get_or_insert_with(OvnKubernetesConfig::default);

        cfg.ipsec_config = Some(IpsecConfig {
            mode: Some(cfg.ipsec_mode()),
        });

        // The MTU can never change silently, so previous always wins.
        if cfg.mtu.is_none() {
            cfg.mtu = match prev.and_then(|p| p.mtu) {
                Some(mtu) => Some(mtu),
                None => Some(fresh_mtu(ctx.host_mtu, overhead_for(cfg.ipsec_mode()))?),
            };
        }
        if cfg.geneve_port.is_none() {
            cfg.geneve_port = Some(prev.and_then(|p| p.geneve_port).unwrap_or(DEFAULT_GENEVE_PORT));
        }

        if cfg.hybrid_overlay_config.is_none() {
            cfg.hybrid_overlay_config = prev.and_then(|p| p.hybrid_overlay_config.clone());
        }
        if let Some(hybrid) = cfg.hybrid_overlay_config.as_mut() {
            fill_hybrid_overlay(hybrid, prev.and_then(|p| p.hybrid_overlay_config.as_ref()));
        }

        let carry = |field: &mut Option<String>, prev_value: Option<&String>, default: &str| {
            if field.is_none() {
                *field = Some(prev_value.cloned().unwrap_or_else(|| default.to_string()));
            }
        };
        carry(
            &mut cfg.v4_internal_subnet,
            prev.and_then(|p| p.v4_internal_subnet.as_ref()),
            DEFAULT_V4_INTERNAL_SUBNET,
        );
        carry(
            &mut cfg.v6_internal_subnet,
            prev.and_then(|p| p.v6_internal_subnet.as_ref()),
            DEFAULT_V6_INTERNAL_SUBNET,
        );
        carry(
            &mut cfg.v4_transit_subnet,
            prev.and_then(|p| p.v4_transit_subnet.as_ref()),
            DEFAULT_V4_TRANSIT_SUBNET,
        );
        carry(
            &mut cfg.v6_transit_subnet,
            prev.and_then(|p| p.v6_transit_subnet.as_ref()),
            DEFAULT_V6_TRANSIT_SUBNET,
        );

        let prev_gw = prev.and_then(|p| p.gateway_config.as_ref());
        let gw = cfg.gateway_config.get_or_insert_with(GatewayConfig::default);
        carry(
            &mut gw.v4_internal_masquerade_subnet,
            prev_gw.and_then(|g| g.v4_internal_masquerade_subnet.as_ref()),
            DEFAULT_V4_MASQUERADE_SUBNET,
        );
        carry(
            &mut gw.v6_internal_masquerade_subnet,
            prev_gw.and_then(|g| g.v6_internal_masquerade_subnet.as_ref()),
            DEFAULT_V6_MASQUERADE_SUBNET,
        );

        fill_policy_audit(cfg.policy_audit_config.get_or_insert_with(PolicyAuditConfig::default));
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
        let mut errs = check_mtu_change(prev, next, p.mtu, n.mtu, self.encap_overhead(next), LABEL);

        if p.geneve_port != n.geneve_port {
            errs.push(ConfigError::conflict("cannot change ovn-kubernetes genevePort"));
        }

        match (&p.hybrid_overlay_config, &n.hybrid_overlay_config) {
            (None, Some(_)) => errs.push(ConfigError::conflict(
                "cannot start a hybrid overlay network after install time",
            )),
            (Some(a), b) if Some(a) != b.as_ref() => {
                errs.push(ConfigError::conflict("cannot edit a running hybrid overlay network"))
            }
            _ => {}
        }

        let (from, to) = (p.ipsec_mode(), n.ipsec_mode());
        if from != to {
            let directive = next.migration.as_ref().and_then(|m| m.ipsec_mode);
            if directive == Some(to) {
                info!(?from, ?to, "IPsec mode change covered by migration directive");
            } else {
                errs.push(ConfigError::conflict(format!(
                    "cannot change IPsec mode from {from:?} to {to:?} without spec.migration.ipsecMode set to {to:?}"
                )));
            }
        }

        let (pf, nf) = (internal_subnets(p), internal_subnets(n));
        for ((field, a, _), (_, b, _)) in pf.iter().zip(nf.iter()) {
            if a != b {
                errs.push(ConfigError::conflict(format!(
                    "cannot change ovn-kubernetes {field} from {a} to {b}"
                )));
            }
        }

        errs
    }
}

fn fill_hybrid_overlay(hybrid: &mut HybridOverlayConfig, prev: Option<&HybridOverlayConfig>) {
    if hybrid.hybrid_overlay_vxlan_port.is_none() {
        hybrid.hybrid_overlay_vxlan_port = Some(
            prev.and_then(|p| p.hybrid_overlay_vxlan_port)
                .unwrap_or(DEFAULT_HYBRID_VXLAN_PORT),
        );
    }
}

fn fill_policy_audit(audit: &mut PolicyAuditConfig) {
    audit.rate_limit.get_or_insert(20);
    audit.max_file_size.get_or_insert(50);
    audit.max_log_files.get_or_insert(5);
    audit.destination.get_or_insert_with(|| "null".to_string());
    audit.syslog_facility.get_or_insert_with(|| "local0".to_string());
}
