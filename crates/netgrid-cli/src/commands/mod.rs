pub mod check;
pub mod rollout;
pub mod settings;
pub mod validate;

use std::path::Path;

use anyhow::Context;
use netgrid_core::OperatorSettings;
use serde::de::DeserializeOwned;

/// Read and parse a JSON input file.
pub fn load_json<T: DeserializeOwned>(path: &str) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {path}"))
}

pub fn load_settings(path: Option<&str>) -> anyhow::Result<OperatorSettings> {
    match path {
        Some(p) => OperatorSettings::from_file(Path::new(p))
            .with_context(|| format!("failed to load settings from {p}")),
        None => Ok(OperatorSettings::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netgrid_core::NetworkSpec;
    use std::fs;

    #[test]
    fn load_json_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_json::<NetworkSpec>(path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("spec.json"));
    }

    #[test]
    fn missing_settings_path_uses_defaults() {
        let settings = load_settings(None).unwrap();
        assert_eq!(settings, OperatorSettings::default());
    }

    #[test]
    fn settings_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("netgrid.toml");
        fs::write(&path, "[rollout.hung_tolerance]\npercent = 25\n").unwrap();

        let settings = load_settings(path.to_str()).unwrap();
        assert_eq!(settings.rollout.hung_tolerance.percent, 25);
        assert_eq!(settings.rollout.hung_tolerance.minimum, 1);
    }
}
