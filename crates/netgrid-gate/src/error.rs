//! Gate error types.

use netgrid_core::IpPoolError;
use thiserror::Error;

/// A single reason a configuration (or a change to it) is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A field could not be parsed at all.
    #[error("could not parse {field} {value:?}: {reason}")]
    Malformed {
        field: String,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Overlap(#[from] IpPoolError),

    /// Semantically invalid value or forbidden transition.
    #[error("{0}")]
    Conflict(String),

    #[error("network type {0:?} is not supported")]
    UnsupportedBackend(String),

    /// The caller skipped a pipeline step.
    #[error("{0} is unset; defaults must be filled before checking change safety")]
    NotDefaulted(String),
}

impl ConfigError {
    pub fn malformed(field: impl Into<String>, value: &str, reason: impl ToString) -> Self {
        Self::Malformed {
            field: field.into(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

/// Aggregate of every violation found by a change safety check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid configuration: [{}]", join_errors(.errors))]
pub struct UnsafeChange {
    pub errors: Vec<ConfigError>,
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failure of the full validate → default → safety-check pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("configuration is invalid: [{}]", join_errors(.0))]
    Invalid(Vec<ConfigError>),

    #[error("failed to fill defaults: {0}")]
    Defaulting(ConfigError),

    #[error(transparent)]
    Unsafe(#[from] UnsafeChange),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsafe_change_lists_every_error() {
        let err = UnsafeChange {
            errors: vec![
                ConfigError::conflict("cannot change default network type"),
                ConfigError::conflict("cannot change ovn-kubernetes genevePort"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "invalid configuration: [cannot change default network type, cannot change ovn-kubernetes genevePort]"
        );
    }

    #[test]
    fn malformed_names_field_and_value() {
        let err = ConfigError::malformed("spec.serviceNetwork", "172.30.0.0/33", "invalid IP address syntax");
        let msg = err.to_string();
        assert!(msg.contains("spec.serviceNetwork"));
        assert!(msg.contains("172.30.0.0/33"));
    }
}
