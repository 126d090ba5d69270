//! Installation registry for wpfleet
//!
//! Durable mapping from tenant id to [`Installation`](wpfleet_core::Installation).
//! Records are only ever written whole, after a provisioning run has
//! completed, so the registry never holds a half-built installation.

pub mod error;
pub mod file;
pub mod store;

pub use error::{RegistryError, Result};
pub use file::{FileRegistry, REGISTRY_VERSION, RegistryFile};
pub use store::InstallationStore;
