//! Flatpak sandbox integration for the layer.
//!
//! For each supported launcher this module reconciles two kinds of state:
//! the app's user override set (read-only path grants plus one environment
//! variable) and the symlink farm inside its private data directory that
//! makes the layer's artifacts appear where the Vulkan loader expects them.
//!
//! ## Module Structure
//! - `types.rs`: app registry, provenance, status types
//! - `pure.rs`: override-set computation and `--show` output parsing
//! - `operations/`: flatpak CLI plumbing, symlink farm
//! - `pipelines.rs`: status/apply/remove and their batch forms

pub mod operations;
pub mod pipelines;
pub mod pure;
pub mod types;

// Re-export public API
pub use pipelines::{apply, apply_all, remove, remove_all, status, status_all};
pub use types::{
    AppOutcome, ConfigState, Provenance, SUPPORTED_APPS, SandboxApp, SandboxAppStatus, find_app,
};
