//! Release version comparison.
//!
//! Release versions are free-form strings read from rollout unit
//! annotations. They may be full semver (`4.14.0-0.nightly-2023-09-01`),
//! a bare `major.minor`, or missing entirely on a fresh install.

use std::sync::LazyLock;

use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};

/// `4.14` or `4.14.2` with no pre-release.
static SHORT_VERSION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.(\d+)(?:\.(\d+))?$").ok());

/// Direction of a version transition from `from` to `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionChange {
    /// `from` is older than `to`.
    Upgrade,
    /// `from` is newer than `to`.
    Downgrade,
    Same,
    /// One side is empty or unparseable.
    Unknown,
}

impl std::fmt::Display for VersionChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VersionChange::Upgrade => "upgrade",
            VersionChange::Downgrade => "downgrade",
            VersionChange::Same => "same",
            VersionChange::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Classify the transition from `from` to `to`.
pub fn compare_versions(from: &str, to: &str) -> VersionChange {
    let (Some(from), Some(to)) = (parse_release_version(from), parse_release_version(to)) else {
        return VersionChange::Unknown;
    };
    match from.cmp(&to) {
        std::cmp::Ordering::Less => VersionChange::Upgrade,
        std::cmp::Ordering::Greater => VersionChange::Downgrade,
        std::cmp::Ordering::Equal => VersionChange::Same,
    }
}

/// Parse a release version string. Returns `None` for empty or malformed input.
pub fn parse_release_version(raw: &str) -> Option<Version> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let trimmed = raw.strip_prefix('v').unwrap_or(raw);
    if let Ok(v) = Version::parse(trimmed) {
        return Some(v);
    }

    let caps = SHORT_VERSION.as_ref()?.captures(trimmed)?;
    let major = caps.get(1)?.as_str().parse().ok()?;
    let minor = caps.get(2)?.as_str().parse().ok()?;
    let patch = match caps.get(3) {
        Some(p) => p.as_str().parse().ok()?,
        None => 0,
    };
    Some(Version::new(major, minor, patch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_are_same() {
        assert_eq!(compare_versions("4.14", "4.14"), VersionChange::Same);
        assert_eq!(
            compare_versions("4.14.0-0.nightly-2023-09-01-000000", "4.14.0-0.nightly-2023-09-01-000000"),
            VersionChange::Same
        );
    }

    #[test]
    fn identical_garbage_is_still_unknown() {
        assert_eq!(
            compare_versions("not-a-version", "not-a-version"),
            VersionChange::Unknown
        );
    }

    #[test]
    fn upgrade_and_downgrade() {
        assert_eq!(compare_versions("4.13", "4.14"), VersionChange::Upgrade);
        assert_eq!(compare_versions("4.14.1", "4.14.0"), VersionChange::Downgrade);
        assert_eq!(compare_versions("v4.9.0", "4.10.0"), VersionChange::Upgrade);
    }

    #[test]
    fn equivalent_spellings_are_same() {
        assert_eq!(compare_versions("4.14", "4.14.0"), VersionChange::Same);
        assert_eq!(compare_versions("v4.14.0", "4.14.0"), VersionChange::Same);
    }

    #[test]
    fn prerelease_orders_before_release() {
        assert_eq!(
            compare_versions("4.14.0-0.nightly-2023-09-01-000000", "4.14.0"),
            VersionChange::Upgrade
        );
    }

    #[test]
    fn empty_or_garbage_is_unknown() {
        assert_eq!(compare_versions("", "4.14"), VersionChange::Unknown);
        assert_eq!(compare_versions("4.14", ""), VersionChange::Unknown);
        assert_eq!(compare_versions("", ""), VersionChange::Unknown);
        assert_eq!(compare_versions("four.fourteen", "4.14"), VersionChange::Unknown);
        assert_eq!(compare_versions("4", "4.14"), VersionChange::Unknown);
    }
}
