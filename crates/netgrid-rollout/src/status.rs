//! Progress evaluation for rollout units.

use netgrid_core::{HungTolerance, RolloutCounts, RolloutUnitStatus, UnitObservation};
use tracing::warn;

/// Whether a unit still has members converging to its current revision.
///
/// With `tolerance`, a unit carrying the hung marker that is at most
/// `tolerance.max_behind(desired)` members short is treated as finished, so
/// a few permanently stuck nodes cannot block the rest of the rollout.
pub fn is_progressing(name: &str, counts: &RolloutCounts, tolerance: Option<&HungTolerance>) -> bool {
    let progressing = counts.updated < counts.desired
        || counts.available == 0
        || counts.generation > counts.observed_generation;
    if !progressing || !counts.hung {
        return progressing;
    }

    let Some(tolerance) = tolerance else {
        return true;
    };
    let behind = counts.desired.saturating_sub(counts.updated);
    let max_behind = tolerance.max_behind(counts.desired);
    if behind <= max_behind {
        warn!(
            unit = name,
            behind,
            max_behind,
            desired = counts.desired,
            "rollout is hung but within tolerance; treating it as complete"
        );
        return false;
    }
    true
}

/// Evaluate a raw observation into the status the orchestrator consumes.
pub fn unit_status(obs: &UnitObservation, tolerance: Option<&HungTolerance>) -> RolloutUnitStatus {
    let name = format!("{}/{}", obs.namespace, obs.name);
    RolloutUnitStatus {
        kind: obs.kind,
        namespace: obs.namespace.clone(),
        name: obs.name.clone(),
        version: obs.version.clone(),
        ip_family_mode: obs.ip_family_mode.clone(),
        cluster_network_cidrs: obs.cluster_network_cidrs.clone(),
        progressing: is_progressing(&name, &obs.counts, tolerance),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(desired: u32, updated: u32) -> RolloutCounts {
        RolloutCounts {
            desired,
            updated,
            available: desired,
            generation: 3,
            observed_generation: 3,
            hung: false,
        }
    }

    #[test]
    fn settled_unit_is_not_progressing() {
        assert!(!is_progressing("n", &counts(10, 10), None));
    }

    #[test]
    fn each_condition_marks_progress() {
        assert!(is_progressing("n", &counts(10, 9), None));

        let none_available = RolloutCounts {
            available: 0,
            ..counts(10, 10)
        };
        assert!(is_progressing("n", &none_available, None));

        let stale = RolloutCounts {
            generation: 4,
            ..counts(10, 10)
        };
        assert!(is_progressing("n", &stale, None));
    }

    #[test]
    fn hung_within_tolerance_is_complete() {
        let tol = HungTolerance::default();
        // 10% of 50 is 5.
        let hung = RolloutCounts {
            hung: true,
            ..counts(50, 45)
        };
        assert!(!is_progressing("n", &hung, Some(&tol)));

        let too_far = RolloutCounts {
            hung: true,
            ..counts(50, 44)
        };
        assert!(is_progressing("n", &too_far, Some(&tol)));
    }

    #[test]
    fn small_fleets_get_the_minimum() {
        let tol = HungTolerance::default();
        let hung = RolloutCounts {
            hung: true,
            ..counts(3, 2)
        };
        assert!(!is_progressing("n", &hung, Some(&tol)));

        let strict = HungTolerance {
            percent: 10,
            minimum: 0,
        };
        assert!(is_progressing("n", &hung, Some(&strict)));
    }

    #[test]
    fn hung_marker_ignored_without_tolerance() {
        let hung = RolloutCounts {
            hung: true,
            ..counts(50, 49)
        };
        assert!(is_progressing("n", &hung, None));
    }
}
