use netgrid_core::{BootstrapSnapshot, IpsecMode, NetworkSpec, OperatorSettings};
use netgrid_gate::BackendKind;
use netgrid_rollout::{RolloutInput, decide, plan_ipsec};
use serde_json::{Value, json};

use super::load_json;

pub fn rollout(spec: &str, snapshot: &str, settings: &OperatorSettings) -> anyhow::Result<()> {
    let spec: NetworkSpec = load_json(spec)?;
    let snapshot: BootstrapSnapshot = load_json(snapshot)?;

    println!("{}", serde_json::to_string_pretty(&report(&spec, &snapshot, settings))?);
    Ok(())
}

fn report(spec: &NetworkSpec, snapshot: &BootstrapSnapshot, settings: &OperatorSettings) -> Value {
    let input = RolloutInput::from_snapshot(snapshot, spec, &settings.rollout);
    let decision = decide(&input);

    // IPsec only exists for OVN-Kubernetes.
    let ipsec = match BackendKind::from_network_type(spec.network_type()) {
        Some(BackendKind::OvnKubernetes) => {
            let mode = spec
                .default_network
                .ovn_kubernetes_config
                .as_ref()
                .map_or(IpsecMode::Disabled, |c| c.ipsec_mode());
            Some(plan_ipsec(mode, snapshot))
        }
        _ => None,
    };

    json!({
        "decision": decision,
        "ipsec": ipsec,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(network_type: &str) -> NetworkSpec {
        serde_json::from_value(json!({
            "clusterNetwork": [{"cidr": "10.128.0.0/14", "hostPrefix": 23}],
            "serviceNetwork": ["172.30.0.0/16"],
            "defaultNetwork": {"type": network_type}
        }))
        .unwrap()
    }

    #[test]
    fn fresh_cluster_updates_everything() {
        let snapshot = BootstrapSnapshot {
            platform: "AWS".into(),
            release_version: "4.14.0".into(),
            ..Default::default()
        };
        let out = report(&spec("OVNKubernetes"), &snapshot, &OperatorSettings::default());

        assert_eq!(out["decision"]["updateNode"], json!(true));
        assert_eq!(out["decision"]["updateControlPlane"], json!(true));
        assert!(out["ipsec"].is_object());
    }

    #[test]
    fn ipsec_plan_is_omitted_for_other_backends() {
        let out = report(&spec("OpenShiftSDN"), &BootstrapSnapshot::default(), &OperatorSettings::default());
        assert!(out["ipsec"].is_null());
    }
}
