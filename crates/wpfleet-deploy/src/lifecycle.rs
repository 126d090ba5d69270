//! Lifecycle operations on registered installations

use crate::error::{DeployError, Result};
use crate::ledger::{Compensation, RollbackLedger, RollbackReport};
use crate::orchestrator::Deployer;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use wpfleet_cloudflare::TokenStatus;
use wpfleet_container::ContainerState;
use wpfleet_core::Installation;

/// State of one facet of an installation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum FacetStatus {
    Running,
    /// Container exists but is not running
    Stopped(String),
    /// Non-container resource exists
    Present,
    NotFound,
    /// Probe failed for a reason other than absence
    Unknown(String),
}

impl FacetStatus {
    pub fn is_up(&self) -> bool {
        matches!(self, FacetStatus::Running | FacetStatus::Present)
    }
}

impl std::fmt::Display for FacetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FacetStatus::Running => write!(f, "running"),
            FacetStatus::Stopped(state) => write!(f, "{}", state),
            FacetStatus::Present => write!(f, "present"),
            FacetStatus::NotFound => write!(f, "not found"),
            FacetStatus::Unknown(reason) => write!(f, "unknown ({})", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationStatus {
    pub tenant_id: String,
    pub app: FacetStatus,
    pub db: FacetStatus,
    pub network: FacetStatus,
    pub tunnel: FacetStatus,
}

impl InstallationStatus {
    pub fn all_up(&self) -> bool {
        [&self.app, &self.db, &self.network, &self.tunnel]
            .iter()
            .all(|facet| facet.is_up())
    }
}

/// Log tail of one container, or why it could not be read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerLogs {
    pub container: String,
    pub output: std::result::Result<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationLogs {
    pub app: ContainerLogs,
    pub db: ContainerLogs,
}

impl Deployer {
    pub async fn get(&self, tenant_id: &str) -> Result<Installation> {
        Ok(self.registry.get(tenant_id).await?)
    }

    pub async fn list(&self) -> Result<Vec<Installation>> {
        Ok(self.registry.list().await?)
    }

    pub async fn verify_credentials(&self) -> Result<TokenStatus> {
        Ok(self.provider.verify_credentials().await?)
    }

    /// Probe every facet independently; one failing probe never hides the others
    pub async fn status(&self, tenant_id: &str) -> Result<InstallationStatus> {
        let installation = self.get(tenant_id).await?;

        let app = self.container_facet(&installation.app_container.name).await;
        let db = self.container_facet(&installation.db_container.name).await;

        let network = match self.runtime.inspect_network(&installation.network.name).await {
            Ok(_) => FacetStatus::Present,
            Err(e) if e.is_not_found() => FacetStatus::NotFound,
            Err(e) => FacetStatus::Unknown(e.to_string()),
        };

        let tunnel = match self.provider.get_tunnel(&installation.tunnel.id).await {
            Ok(_) => FacetStatus::Present,
            Err(e) if e.is_not_found() => FacetStatus::NotFound,
            Err(e) => FacetStatus::Unknown(e.to_string()),
        };

        Ok(InstallationStatus {
            tenant_id: installation.tenant_id,
            app,
            db,
            network,
            tunnel,
        })
    }

    async fn container_facet(&self, name: &str) -> FacetStatus {
        match self.runtime.inspect_container(name).await {
            Ok(info) if info.state == ContainerState::Running => FacetStatus::Running,
            Ok(info) => FacetStatus::Stopped(info.state.to_string()),
            Err(e) if e.is_not_found() => FacetStatus::NotFound,
            Err(e) => FacetStatus::Unknown(e.to_string()),
        }
    }

    /// Restart the database, then the application
    pub async fn restart(&self, tenant_id: &str) -> Result<()> {
        let installation = self.get(tenant_id).await?;

        self.runtime
            .restart_container(&installation.db_container.name)
            .await?;
        info!("Restarted {}", installation.db_container.name);

        self.runtime
            .restart_container(&installation.app_container.name)
            .await?;
        info!("Restarted {}", installation.app_container.name);

        Ok(())
    }

    /// Tail both containers' logs; `tail` defaults to the configured value
    pub async fn logs(&self, tenant_id: &str, tail: Option<usize>) -> Result<InstallationLogs> {
        let installation = self.get(tenant_id).await?;
        let tail = tail.unwrap_or(self.settings.log_tail);

        let app = self
            .container_logs(&installation.app_container.name, tail)
            .await;
        let db = self
            .container_logs(&installation.db_container.name, tail)
            .await;

        Ok(InstallationLogs { app, db })
    }

    async fn container_logs(&self, name: &str, tail: usize) -> ContainerLogs {
        ContainerLogs {
            container: name.to_string(),
            output: self
                .runtime
                .logs(name, tail)
                .await
                .map_err(|e| e.to_string()),
        }
    }

    /// Tear down every resource of an installation, then drop its record
    ///
    /// Each removal is best-effort and already-absent resources count as
    /// removed. The record is removed even when some removals failed; the
    /// returned report lists them.
    pub async fn delete(&self, tenant_id: &str) -> Result<RollbackReport> {
        let installation = self.get(tenant_id).await?;
        info!("Deleting '{}'", tenant_id);

        let report = teardown_ledger(&installation)
            .unwind(self.runtime.as_ref(), self.provider.as_ref())
            .await;
        if !report.is_clean() {
            warn!(
                "{} resource(s) of '{}' could not be removed",
                report.failed.len(),
                tenant_id
            );
        }

        match self.registry.remove(tenant_id).await {
            Ok(_) => {}
            // Removed concurrently; the outcome is the same
            Err(wpfleet_registry::RegistryError::NotFound(_)) => {}
            Err(e) => return Err(DeployError::from(e)),
        }

        info!("Deleted '{}'", tenant_id);
        Ok(report)
    }
}

/// Compensations that remove an installation: app, db, network, tunnel, zone
///
/// Pushed in reverse so that unwinding runs them in that order.
fn teardown_ledger(installation: &Installation) -> RollbackLedger {
    let mut ledger = RollbackLedger::new();
    ledger.push(Compensation::DeleteZone {
        id: installation.zone.id.clone(),
        name: installation.zone.name.clone(),
    });
    ledger.push(Compensation::DeleteTunnel {
        id: installation.tunnel.id.clone(),
    });
    ledger.push(Compensation::RemoveNetwork {
        name: installation.network.name.clone(),
    });
    ledger.push(Compensation::RemoveContainer {
        name: installation.db_container.name.clone(),
    });
    ledger.push(Compensation::RemoveContainer {
        name: installation.app_container.name.clone(),
    });
    ledger
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facet_is_up() {
        assert!(FacetStatus::Running.is_up());
        assert!(FacetStatus::Present.is_up());
        assert!(!FacetStatus::NotFound.is_up());
        assert!(!FacetStatus::Stopped("stopped".to_string()).is_up());
        assert!(!FacetStatus::Unknown("timeout".to_string()).is_up());
    }

    #[test]
    fn test_facet_display() {
        assert_eq!(FacetStatus::NotFound.to_string(), "not found");
        assert_eq!(
            FacetStatus::Unknown("boom".to_string()).to_string(),
            "unknown (boom)"
        );
    }
}
