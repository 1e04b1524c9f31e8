//! Config defaulter.
//!
//! [`fill_defaults`] returns a new, fully defaulted spec and leaves its input
//! untouched. Fields that can never change silently after install are taken
//! from `previous` when it was applied with the same backend; otherwise they
//! are computed fresh (first install or backend migration).

use netgrid_core::{LogLevel, NetworkSpec};
use tracing::debug;

use crate::context::ReconcileContext;
use crate::error::ConfigError;
use crate::registry::resolve;

pub fn fill_defaults(
    next: &NetworkSpec,
    previous: Option<&NetworkSpec>,
    ctx: &ReconcileContext,
) -> Result<NetworkSpec, ConfigError> {
    let backend = resolve(next.network_type())?;
    let previous = previous.filter(|p| p.network_type() == next.network_type());

    let mut out = next.clone();
    backend.fill_defaults(&mut out, previous, ctx)?;

    out.deploy_kube_proxy.get_or_insert(!backend.embeds_service_proxy());
    out.disable_multi_network.get_or_insert(false);
    out.use_multi_network_policy.get_or_insert(false);
    out.log_level.get_or_insert(LogLevel::Normal);

    debug!(
        network_type = next.network_type(),
        carried_over = previous.is_some(),
        mtu = ?backend.mtu(&out),
        "filled configuration defaults"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use netgrid_core::{
        ClusterNetworkEntry, DefaultNetwork, NETWORK_TYPE_KURYR, NETWORK_TYPE_OPENSHIFT_SDN,
        NETWORK_TYPE_OVN_KUBERNETES, OvnKubernetesConfig, PlatformSettings,
    };

    fn ctx() -> ReconcileContext {
        ReconcileContext::new("AWS", PlatformSettings::default()).with_host_mtu(1500)
    }

    fn spec(network_type: &str) -> NetworkSpec {
        NetworkSpec {
            cluster_network: vec![ClusterNetworkEntry::new("10.128.0.0/14", 23)],
            service_network: vec!["172.30.0.0/16".into()],
            default_network: DefaultNetwork::new(network_type),
            ..Default::default()
        }
    }

    #[test]
    fn input_is_not_mutated() {
        let next = spec(NETWORK_TYPE_OVN_KUBERNETES);
        let before = next.clone();
        let out = fill_defaults(&next, None, &ctx()).unwrap();
        assert_eq!(next, before);
        assert_ne!(out, before);
    }

    #[test]
    fn top_level_defaults() {
        let ovn = fill_defaults(&spec(NETWORK_TYPE_OVN_KUBERNETES), None, &ctx()).unwrap();
        assert_eq!(ovn.deploy_kube_proxy, Some(false));
        assert_eq!(ovn.disable_multi_network, Some(false));
        assert_eq!(ovn.log_level, Some(LogLevel::Normal));

        let kuryr = fill_defaults(&spec(NETWORK_TYPE_KURYR), None, &ctx()).unwrap();
        assert_eq!(kuryr.deploy_kube_proxy, Some(true));
    }

    #[test]
    fn previous_of_other_type_is_ignored() {
        let prev = fill_defaults(&spec(NETWORK_TYPE_OPENSHIFT_SDN), None, &ctx()).unwrap();
        let out = fill_defaults(&spec(NETWORK_TYPE_OVN_KUBERNETES), Some(&prev), &ctx()).unwrap();
        let cfg = out.default_network.ovn_kubernetes_config.unwrap();
        assert_eq!(cfg.mtu, Some(1400));
    }

    #[test]
    fn explicit_value_wins_over_previous() {
        let mut prev = spec(NETWORK_TYPE_OVN_KUBERNETES);
        prev.default_network.ovn_kubernetes_config = Some(OvnKubernetesConfig {
            mtu: Some(1400),
            ..Default::default()
        });
        let mut next = spec(NETWORK_TYPE_OVN_KUBERNETES);
        next.default_network.ovn_kubernetes_config = Some(OvnKubernetesConfig {
            mtu: Some(1300),
            ..Default::default()
        });
        let out = fill_defaults(&next, Some(&prev), &ctx()).unwrap();
        assert_eq!(out.default_network.ovn_kubernetes_config.unwrap().mtu, Some(1300));
    }

    #[test]
    fn unknown_type_cannot_be_defaulted() {
        let err = fill_defaults(&spec("Calico"), None, &ctx()).unwrap_err();
        assert_eq!(err, ConfigError::UnsupportedBackend("Calico".into()));
    }
}
