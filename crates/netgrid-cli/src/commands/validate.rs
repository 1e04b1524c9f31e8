use netgrid_core::{BootstrapSnapshot, NetworkSpec, OperatorSettings};
use netgrid_gate::ReconcileContext;

use super::load_json;

pub fn validate(spec: &str, snapshot: &str, settings: &OperatorSettings, format: &str) -> anyhow::Result<()> {
    let spec: NetworkSpec = load_json(spec)?;
    let snapshot: BootstrapSnapshot = load_json(snapshot)?;
    let ctx = ReconcileContext::from_snapshot(&snapshot, settings);

    let errors: Vec<String> = netgrid_gate::validate(&spec, &ctx)
        .iter()
        .map(ToString::to_string)
        .collect();

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&errors)?),
        _ if errors.is_empty() => println!("✓ Configuration is valid"),
        _ => {
            for e in &errors {
                println!("✗ {e}");
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("{} validation error(s)", errors.len())
    }
}
