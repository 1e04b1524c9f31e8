//! netgrid.toml operator settings.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OperatorSettings {
    #[serde(default)]
    pub platforms: PlatformSettings,
    #[serde(default)]
    pub rollout: RolloutSettings,
}

/// Platform types on which dual-stack networking is permitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformSettings {
    /// Platforms that may run dual-stack at all.
    pub dual_stack: Vec<String>,
    /// Platforms that may convert between single- and dual-stack after install.
    pub dual_stack_conversion: Vec<String>,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            dual_stack: vec![
                "BareMetal".to_string(),
                "None".to_string(),
                "VSphere".to_string(),
                "OpenStack".to_string(),
            ],
            dual_stack_conversion: vec![
                "BareMetal".to_string(),
                "None".to_string(),
                "VSphere".to_string(),
            ],
        }
    }
}

impl PlatformSettings {
    pub fn allows_dual_stack(&self, platform: &str) -> bool {
        self.dual_stack.iter().any(|p| p == platform)
    }

    pub fn allows_dual_stack_conversion(&self, platform: &str) -> bool {
        self.dual_stack_conversion.iter().any(|p| p == platform)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RolloutSettings {
    #[serde(default)]
    pub hung_tolerance: HungTolerance,
}

/// How far behind a hung per-node rollout may be before the orchestrator
/// stops treating it as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HungTolerance {
    /// Percentage of desired members allowed to lag.
    pub percent: u32,
    /// Floor on the number of members allowed to lag.
    pub minimum: u32,
}

impl Default for HungTolerance {
    fn default() -> Self {
        Self {
            percent: 10,
            minimum: 1,
        }
    }
}

impl HungTolerance {
    /// Maximum number of not-yet-updated members tolerated out of `desired`.
    pub fn max_behind(&self, desired: u32) -> u32 {
        let share = u64::from(desired) * u64::from(self.percent) / 100;
        (share as u32).max(self.minimum)
    }
}

impl OperatorSettings {
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: OperatorSettings = toml::from_str(content)?;
        settings.check()?;
        Ok(settings)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn check(&self) -> Result<(), SettingsError> {
        if self.rollout.hung_tolerance.percent > 100 {
            return Err(SettingsError::Invalid(format!(
                "rollout.hung_tolerance.percent must be at most 100, got {}",
                self.rollout.hung_tolerance.percent
            )));
        }
        for platform in &self.platforms.dual_stack_conversion {
            if !self.platforms.allows_dual_stack(platform) {
                return Err(SettingsError::Invalid(format!(
                    "platform {platform} allows dual-stack conversion but not dual-stack"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        let settings = OperatorSettings::from_toml("").unwrap();
        assert_eq!(settings, OperatorSettings::default());
        assert!(settings.platforms.allows_dual_stack("BareMetal"));
        assert!(!settings.platforms.allows_dual_stack("AWS"));
        assert!(!settings.platforms.allows_dual_stack_conversion("OpenStack"));
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let settings = OperatorSettings::from_toml(
            r#"
[rollout.hung_tolerance]
percent = 20
"#,
        )
        .unwrap();
        assert_eq!(settings.rollout.hung_tolerance.percent, 20);
        assert_eq!(settings.rollout.hung_tolerance.minimum, 1);
        assert_eq!(settings.platforms, PlatformSettings::default());
    }

    #[test]
    fn rejects_out_of_range_percent() {
        let err = OperatorSettings::from_toml("[rollout.hung_tolerance]\npercent = 150\n").unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(_)));
    }

    #[test]
    fn rejects_conversion_platform_without_dual_stack() {
        let err = OperatorSettings::from_toml(
            "[platforms]\ndual_stack = [\"BareMetal\"]\ndual_stack_conversion = [\"AWS\"]\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("AWS"));
    }

    #[test]
    fn max_behind_has_a_floor() {
        let t = HungTolerance::default();
        assert_eq!(t.max_behind(0), 1);
        assert_eq!(t.max_behind(5), 1);
        assert_eq!(t.max_behind(30), 3);
        assert_eq!(t.max_behind(109), 10);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[platforms]\ndual_stack = [\"AWS\"]\ndual_stack_conversion = []").unwrap();
        let settings = OperatorSettings::from_file(file.path()).unwrap();
        assert!(settings.platforms.allows_dual_stack("AWS"));
        assert!(settings.platforms.dual_stack_conversion.is_empty());
    }

    #[test]
    fn roundtrips_through_toml() {
        let text = OperatorSettings::default().to_toml_string().unwrap();
        assert_eq!(OperatorSettings::from_toml(&text).unwrap(), OperatorSettings::default());
    }
}
