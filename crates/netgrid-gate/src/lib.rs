//! netgrid configuration gate — validation, defaulting, change safety.
//!
//! Every proposed network configuration passes through three pure steps
//! before it is applied: the validator reports every semantic error, the
//! defaulter fills unset fields while preserving values that may never
//! change after install, and the safety checker decides whether the move
//! from the previously applied configuration is allowed.
//!
//! # Components
//!
//! - **`registry`** — Backend capability sets keyed by `DefaultNetwork.type`
//! - **`validate`** — Config validator
//! - **`defaults`** — Config defaulter (returns a new value)
//! - **`safety`** — Change-safety checker and migration rules
//! - **`pipeline`** — `admit`, the three steps in order

pub mod backend;
pub mod context;
pub mod defaults;
pub mod error;
pub mod net;
pub mod pipeline;
pub mod registry;
pub mod safety;
pub mod validate;

pub use context::ReconcileContext;
pub use defaults::fill_defaults;
pub use error::{AdmissionError, ConfigError, UnsafeChange};
pub use pipeline::admit;
pub use registry::{ALL_BACKENDS, Backend, BackendKind, resolve};
pub use safety::is_change_safe;
pub use validate::validate;
