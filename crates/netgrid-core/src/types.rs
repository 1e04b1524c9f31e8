//! Network configuration data model.
//!
//! `NetworkSpec` is the shape of both the desired configuration (admin
//! intent) and the previously-applied configuration that the defaulter
//! produced on the last reconcile. Unset `Option` fields are unset intent;
//! `netgrid-gate` fills them in.

use serde::{Deserialize, Serialize};

pub const NETWORK_TYPE_OVN_KUBERNETES: &str = "OVNKubernetes";
pub const NETWORK_TYPE_OPENSHIFT_SDN: &str = "OpenShiftSDN";
pub const NETWORK_TYPE_KURYR: &str = "Kuryr";

// ── Network spec ───────────────────────────────────────────────────

/// Desired (or applied) cluster network configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSpec {
    /// Pod address space. Order matters: index 0 is the primary entry.
    #[serde(default)]
    pub cluster_network: Vec<ClusterNetworkEntry>,
    /// Service VIP space. Index 0 is the primary CIDR.
    #[serde(default)]
    pub service_network: Vec<String>,
    #[serde(default)]
    pub default_network: DefaultNetwork,
    /// In-flight migration directive. Immutable until cleared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migration: Option<NetworkMigration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_kube_proxy: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_multi_network: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_multi_network_policy: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
}

impl NetworkSpec {
    /// Desired IP family mode, derived from the service network CIDR count.
    pub fn ip_family_mode(&self) -> IpFamilyMode {
        if self.service_network.len() > 1 {
            IpFamilyMode::DualStack
        } else {
            IpFamilyMode::SingleStack
        }
    }

    /// Cluster network CIDRs in declaration order.
    pub fn cluster_cidrs(&self) -> Vec<String> {
        self.cluster_network.iter().map(|e| e.cidr.clone()).collect()
    }

    pub fn network_type(&self) -> &str {
        &self.default_network.network_type
    }
}

/// One pod address block and the size of the per-node slice carved from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNetworkEntry {
    pub cidr: String,
    /// Per-node subnet prefix length. 0 means unset.
    #[serde(default)]
    pub host_prefix: u32,
}

impl ClusterNetworkEntry {
    pub fn new(cidr: &str, host_prefix: u32) -> Self {
        Self {
            cidr: cidr.to_string(),
            host_prefix,
        }
    }
}

/// The primary pod network backend and its per-backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultNetwork {
    #[serde(rename = "type")]
    pub network_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ovn_kubernetes_config: Option<OvnKubernetesConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openshift_sdn_config: Option<OpenShiftSdnConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kuryr_config: Option<KuryrConfig>,
}

impl DefaultNetwork {
    pub fn new(network_type: &str) -> Self {
        Self {
            network_type: network_type.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IpFamilyMode {
    SingleStack,
    DualStack,
}

impl IpFamilyMode {
    /// Value recorded on rollout units.
    pub fn as_str(&self) -> &'static str {
        match self {
            IpFamilyMode::SingleStack => "single-stack",
            IpFamilyMode::DualStack => "dual-stack",
        }
    }
}

impl std::fmt::Display for IpFamilyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogLevel {
    #[default]
    Normal,
    Debug,
    Trace,
    TraceAll,
}

// ── Migration ─────────────────────────────────────────────────────

/// Operator-declared multi-step transition. While set, it loosens the
/// immutability rules for the fields it names.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkMigration {
    /// Backend type being migrated to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtu: Option<MtuMigration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<MigrationMode>,
    /// Target IPsec mode when changing encryption at runtime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipsec_mode: Option<IpsecMode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MtuMigration {
    /// Pod network MTU transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<MtuMigrationValues>,
    /// Host interface MTU transition. Only `to` is meaningful.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine: Option<MtuMigrationValues>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MtuMigrationValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MigrationMode {
    Live,
    Offline,
}

// ── OVN-Kubernetes ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OvnKubernetesConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geneve_port: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hybrid_overlay_config: Option<HybridOverlayConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipsec_config: Option<IpsecConfig>,
    /// Join switch subnet (IPv4).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v4_internal_subnet: Option<String>,
    /// Join switch subnet (IPv6).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v6_internal_subnet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v4_transit_subnet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v6_transit_subnet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_config: Option<GatewayConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_audit_config: Option<PolicyAuditConfig>,
}

impl OvnKubernetesConfig {
    /// Effective IPsec mode. An empty `ipsecConfig` block is the legacy way of
    /// asking for full encryption.
    pub fn ipsec_mode(&self) -> IpsecMode {
        match &self.ipsec_config {
            None => IpsecMode::Disabled,
            Some(cfg) => cfg.mode.unwrap_or(IpsecMode::Full),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HybridOverlayConfig {
    #[serde(default)]
    pub hybrid_cluster_network: Vec<ClusterNetworkEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hybrid_overlay_vxlan_port: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpsecConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<IpsecMode>,
}

/// Host-level encryption mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IpsecMode {
    Disabled,
    /// Only traffic leaving the cluster is encrypted.
    External,
    /// East-west and external traffic is encrypted.
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v4_internal_masquerade_subnet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v6_internal_masquerade_subnet: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyAuditConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<u32>,
    /// Megabytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_log_files: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syslog_facility: Option<String>,
}

// ── OpenShift SDN ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenShiftSdnConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<SdnMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vxlan_port: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_unidling: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SdnMode {
    NetworkPolicy,
    Multitenant,
    Subnet,
}

// ── Kuryr ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KuryrConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daemon_probes_port: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_probes_port: Option<u32>,
    /// Must contain, and be larger than, the service network.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openstack_service_network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_port_pools_prepopulation: Option<bool>,
    /// 0 means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_max_ports: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_min_ports: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_batch_ports: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_mode_follows_service_network() {
        let mut spec = NetworkSpec {
            service_network: vec!["172.30.0.0/16".into()],
            ..Default::default()
        };
        assert_eq!(spec.ip_family_mode(), IpFamilyMode::SingleStack);

        spec.service_network.push("fd02::/112".into());
        assert_eq!(spec.ip_family_mode(), IpFamilyMode::DualStack);
        assert_eq!(spec.ip_family_mode().as_str(), "dual-stack");
    }

    #[test]
    fn empty_ipsec_block_means_full() {
        let mut cfg = OvnKubernetesConfig::default();
        assert_eq!(cfg.ipsec_mode(), IpsecMode::Disabled);

        cfg.ipsec_config = Some(IpsecConfig::default());
        assert_eq!(cfg.ipsec_mode(), IpsecMode::Full);

        cfg.ipsec_config = Some(IpsecConfig {
            mode: Some(IpsecMode::External),
        });
        assert_eq!(cfg.ipsec_mode(), IpsecMode::External);
    }

    #[test]
    fn parses_camel_case_json() {
        let json = r#"{
            "clusterNetwork": [{"cidr": "10.128.0.0/14", "hostPrefix": 23}],
            "serviceNetwork": ["172.30.0.0/16"],
            "defaultNetwork": {
                "type": "OVNKubernetes",
                "ovnKubernetesConfig": {"mtu": 1400, "genevePort": 6081}
            }
        }"#;
        let spec: NetworkSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.cluster_network[0].host_prefix, 23);
        assert_eq!(spec.network_type(), NETWORK_TYPE_OVN_KUBERNETES);
        let ovn = spec.default_network.ovn_kubernetes_config.unwrap();
        assert_eq!(ovn.mtu, Some(1400));
        assert!(spec.migration.is_none());
    }
}
