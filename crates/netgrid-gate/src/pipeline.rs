//! Validate → default → safety-check, in that order.

use netgrid_core::NetworkSpec;
use tracing::info;

use crate::context::ReconcileContext;
use crate::defaults::fill_defaults;
use crate::error::AdmissionError;
use crate::safety::is_change_safe;
use crate::validate::validate;

/// Run the full gate over a proposed spec.
///
/// Returns the defaulted spec to persist as the new applied configuration.
/// `previous` is the last applied spec, or `None` on first install.
pub fn admit(
    next: &NetworkSpec,
    previous: Option<&NetworkSpec>,
    ctx: &ReconcileContext,
) -> Result<NetworkSpec, AdmissionError> {
    let errs = validate(next, ctx);
    if !errs.is_empty() {
        return Err(AdmissionError::Invalid(errs));
    }

    let defaulted = fill_defaults(next, previous, ctx).map_err(AdmissionError::Defaulting)?;

    if let Some(prev) = previous {
        is_change_safe(prev, &defaulted, ctx)?;
    }

    info!(
        network_type = defaulted.network_type(),
        first_install = previous.is_none(),
        "network configuration admitted"
    );
    Ok(defaulted)
}
