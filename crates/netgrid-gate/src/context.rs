//! Per-reconcile context.

use netgrid_core::{BootstrapSnapshot, OperatorSettings, PlatformSettings};

/// Cluster facts and operator settings for a single reconcile pass.
///
/// Built fresh from the bootstrap snapshot on every pass and dropped
/// afterwards; nothing here outlives the reconcile.
#[derive(Debug, Clone)]
pub struct ReconcileContext {
    /// Infrastructure platform type.
    pub platform: String,
    /// Probed host MTU, needed only on first install.
    pub host_mtu: Option<u32>,
    pub platforms: PlatformSettings,
}

impl ReconcileContext {
    pub fn new(platform: &str, platforms: PlatformSettings) -> Self {
        Self {
            platform: platform.to_string(),
            host_mtu: None,
            platforms,
        }
    }

    pub fn from_snapshot(snapshot: &BootstrapSnapshot, settings: &OperatorSettings) -> Self {
        Self {
            platform: snapshot.platform.clone(),
            host_mtu: snapshot.host_mtu,
            platforms: settings.platforms.clone(),
        }
    }

    /// Builder method: set the probed host MTU.
    pub fn with_host_mtu(self, mtu: u32) -> Self {
        Self {
            host_mtu: Some(mtu),
            ..self
        }
    }

    pub fn allows_dual_stack(&self) -> bool {
        self.platforms.allows_dual_stack(&self.platform)
    }

    pub fn allows_dual_stack_conversion(&self) -> bool {
        self.platforms.allows_dual_stack_conversion(&self.platform)
    }
}
