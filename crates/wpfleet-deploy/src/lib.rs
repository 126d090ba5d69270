//! Provisioning and lifecycle for wpfleet installations
//!
//! [`Deployer`] drives the container runtime, the networking provider and
//! the installation registry. Provisioning is a fixed, strictly sequential
//! pipeline with a rollback ledger; lifecycle operations (status, restart,
//! logs, delete) read the registry and act on the stored identifiers.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wpfleet_core::ProvisionRequest;
//! use wpfleet_deploy::Deployer;
//!
//! let deployer = Deployer::new(runtime, provider, registry, settings.deploy);
//! let request = ProvisionRequest::new("alice", "alice.com", "alice@example.com");
//! let installation = deployer.provision(&request).await?;
//! println!("{}", installation.site_url());
//! ```

pub mod agent;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod orchestrator;
pub mod secret;
pub mod step;

pub use error::{DeployError, ErrorKind, Result, StepError};
pub use ledger::{ActionReport, Compensation, RollbackLedger, RollbackReport};
pub use lifecycle::{ContainerLogs, FacetStatus, InstallationLogs, InstallationStatus};
pub use orchestrator::Deployer;
pub use step::Step;
