//! Deployment error types

use crate::ledger::RollbackReport;
use crate::step::Step;
use std::time::Duration;
use thiserror::Error;
use wpfleet_cloudflare::CloudflareError;
use wpfleet_container::ContainerError;
use wpfleet_core::{Installation, ResourceNames, ValidationError};
use wpfleet_registry::RegistryError;

/// Stable error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Conflict,
    RuntimeResource,
    NetworkingProvider,
    Registry,
    NotFound,
    StepTimeout,
    FatalInconsistency,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::Conflict => "conflict_error",
            ErrorKind::RuntimeResource => "runtime_resource_error",
            ErrorKind::NetworkingProvider => "networking_provider_error",
            ErrorKind::Registry => "registry_error",
            ErrorKind::NotFound => "not_found_error",
            ErrorKind::StepTimeout => "step_timeout",
            ErrorKind::FatalInconsistency => "fatal_inconsistency",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a single pipeline step failed
#[derive(Error, Debug)]
pub enum StepError {
    #[error(transparent)]
    Runtime(#[from] ContainerError),

    #[error(transparent)]
    Provider(#[from] CloudflareError),

    #[error("step did not finish within {0:?}")]
    Timeout(Duration),
}

impl StepError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StepError::Runtime(_) => ErrorKind::RuntimeResource,
            StepError::Provider(_) => ErrorKind::NetworkingProvider,
            StepError::Timeout(_) => ErrorKind::StepTimeout,
        }
    }
}

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("tenant '{0}' is already provisioned")]
    Conflict(String),

    /// A step in 1..=8 failed and the ledger has been unwound
    #[error("provisioning '{tenant_id}' failed at step {step}: {source} (rollback: {rollback})")]
    Provisioning {
        tenant_id: String,
        step: Step,
        resources: ResourceNames,
        #[source]
        source: StepError,
        rollback: RollbackReport,
    },

    /// Every resource exists but the registry write failed; nothing was rolled back
    #[error(
        "installation for '{tenant_id}' is live but could not be registered: {source}; \
         retry the registration before provisioning this tenant again"
    )]
    Unregistered {
        tenant_id: String,
        installation: Box<Installation>,
        #[source]
        source: RegistryError,
    },

    #[error("no installation registered for tenant '{0}'")]
    NotFound(String),

    #[error("registry error: {0}")]
    Registry(#[source] RegistryError),

    #[error("container runtime error: {0}")]
    Runtime(#[from] ContainerError),

    #[error("networking provider error: {0}")]
    Provider(#[from] CloudflareError),
}

impl DeployError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeployError::Validation(_) => ErrorKind::Validation,
            DeployError::Conflict(_) => ErrorKind::Conflict,
            DeployError::Provisioning { source, .. } => source.kind(),
            DeployError::Unregistered { .. } => ErrorKind::FatalInconsistency,
            DeployError::NotFound(_) => ErrorKind::NotFound,
            DeployError::Registry(_) => ErrorKind::Registry,
            DeployError::Runtime(e) if e.is_not_found() => ErrorKind::NotFound,
            DeployError::Runtime(_) => ErrorKind::RuntimeResource,
            DeployError::Provider(e) if e.is_not_found() => ErrorKind::NotFound,
            DeployError::Provider(_) => ErrorKind::NetworkingProvider,
        }
    }

    /// Rollback outcome, for errors raised after the pipeline started
    pub fn rollback(&self) -> Option<&RollbackReport> {
        match self {
            DeployError::Provisioning { rollback, .. } => Some(rollback),
            _ => None,
        }
    }
}

impl From<RegistryError> for DeployError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(tenant) => DeployError::NotFound(tenant),
            RegistryError::AlreadyExists(tenant) => DeployError::Conflict(tenant),
            other => DeployError::Registry(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_strings() {
        assert_eq!(ErrorKind::Validation.to_string(), "validation_error");
        assert_eq!(ErrorKind::FatalInconsistency.to_string(), "fatal_inconsistency");
    }

    #[test]
    fn test_registry_error_mapping() {
        let not_found: DeployError = RegistryError::NotFound("alice".to_string()).into();
        assert_eq!(not_found.kind(), ErrorKind::NotFound);

        let conflict: DeployError = RegistryError::AlreadyExists("alice".to_string()).into();
        assert_eq!(conflict.kind(), ErrorKind::Conflict);

        let lock: DeployError = RegistryError::LockError("held".to_string()).into();
        assert_eq!(lock.kind(), ErrorKind::Registry);
    }

    #[test]
    fn test_step_error_kind() {
        let timeout = StepError::Timeout(Duration::from_secs(1));
        assert_eq!(timeout.kind(), ErrorKind::StepTimeout);

        let runtime = StepError::from(ContainerError::DockerApiError("x".to_string()));
        assert_eq!(runtime.kind(), ErrorKind::RuntimeResource);
    }
}
