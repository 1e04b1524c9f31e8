//! Backend registry.
//!
//! Maps `DefaultNetwork.type` to the capability set of the backend that
//! implements it. The pipeline resolves the backend once per reconcile and
//! calls through the `Backend` trait; an unknown type is a typed error.

use netgrid_core::{
    NETWORK_TYPE_KURYR, NETWORK_TYPE_OPENSHIFT_SDN, NETWORK_TYPE_OVN_KUBERNETES, NetworkSpec,
};

use crate::backend::{Kuryr, OpenShiftSdn, OvnKubernetes};
use crate::context::ReconcileContext;
use crate::error::ConfigError;

/// Backend-specific validation, defaulting, and change-safety rules.
pub trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Whether cluster network entries must carry a host prefix.
    fn uses_host_prefix(&self) -> bool {
        true
    }

    fn supports_dual_stack(&self) -> bool {
        false
    }

    /// Whether the backend proxies services itself, making kube-proxy redundant.
    fn embeds_service_proxy(&self) -> bool {
        true
    }

    /// Bytes the backend adds on top of the pod MTU.
    fn encap_overhead(&self, spec: &NetworkSpec) -> u32;

    /// Pod MTU recorded in the backend config, if set.
    fn mtu(&self, spec: &NetworkSpec) -> Option<u32>;

    fn validate(&self, spec: &NetworkSpec, ctx: &ReconcileContext) -> Vec<ConfigError>;

    /// Fill unset backend fields in `next`. `previous` is only passed when it
    /// was applied with this same backend.
    fn fill_defaults(
        &self,
        next: &mut NetworkSpec,
        previous: Option<&NetworkSpec>,
        ctx: &ReconcileContext,
    ) -> Result<(), ConfigError>;

    /// Backend-specific immutability rules. Only called when `prev` and
    /// `next` use this same backend.
    fn is_change_safe(
        &self,
        prev: &NetworkSpec,
        next: &NetworkSpec,
        ctx: &ReconcileContext,
    ) -> Vec<ConfigError>;
}

/// Network backends known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    OvnKubernetes,
    OpenShiftSdn,
    Kuryr,
}

/// All BackendKind variants for iteration.
pub const ALL_BACKENDS: &[BackendKind] = &[
    BackendKind::OvnKubernetes,
    BackendKind::OpenShiftSdn,
    BackendKind::Kuryr,
];

static OVN_KUBERNETES: OvnKubernetes = OvnKubernetes;
static OPENSHIFT_SDN: OpenShiftSdn = OpenShiftSdn;
static KURYR: Kuryr = Kuryr;

impl BackendKind {
    /// Value of `DefaultNetwork.type` selecting this backend.
    pub fn network_type(&self) -> &'static str {
        match self {
            Self::OvnKubernetes => NETWORK_TYPE_OVN_KUBERNETES,
            Self::OpenShiftSdn => NETWORK_TYPE_OPENSHIFT_SDN,
            Self::Kuryr => NETWORK_TYPE_KURYR,
        }
    }

    pub fn from_network_type(network_type: &str) -> Option<Self> {
        ALL_BACKENDS
            .iter()
            .copied()
            .find(|k| k.network_type() == network_type)
    }

    pub fn backend(&self) -> &'static dyn Backend {
        match self {
            Self::OvnKubernetes => &OVN_KUBERNETES,
            Self::OpenShiftSdn => &OPENSHIFT_SDN,
            Self::Kuryr => &KURYR,
        }
    }
}

/// Resolve the backend for a `DefaultNetwork.type` value.
pub fn resolve(network_type: &str) -> Result<&'static dyn Backend, ConfigError> {
    BackendKind::from_network_type(network_type)
        .map(|k| k.backend())
        .ok_or_else(|| ConfigError::UnsupportedBackend(network_type.to_string()))
}
