use netgrid_core::{BootstrapSnapshot, NetworkSpec, OperatorSettings};
use netgrid_gate::{AdmissionError, ReconcileContext, admit};

use super::load_json;

pub fn check(
    spec: &str,
    previous: Option<&str>,
    snapshot: &str,
    settings: &OperatorSettings,
    output: Option<&str>,
) -> anyhow::Result<()> {
    let next: NetworkSpec = load_json(spec)?;
    let previous: Option<NetworkSpec> = previous.map(load_json).transpose()?;
    let snapshot: BootstrapSnapshot = load_json(snapshot)?;
    let ctx = ReconcileContext::from_snapshot(&snapshot, settings);

    let applied = match admit(&next, previous.as_ref(), &ctx) {
        Ok(applied) => applied,
        Err(e) => {
            report(&e);
            return Err(e.into());
        }
    };

    let json = serde_json::to_string_pretty(&applied)?;
    match output {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))?;
            println!("✓ Wrote applied configuration to {path}");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn report(err: &AdmissionError) {
    let errors = match err {
        AdmissionError::Invalid(errors) => errors.as_slice(),
        AdmissionError::Unsafe(u) => u.errors.as_slice(),
        AdmissionError::Defaulting(e) => std::slice::from_ref(e),
    };
    for e in errors {
        eprintln!("✗ {e}");
    }
}
