//! Rollback ledger
//!
//! Every resource the pipeline brings into existence gets a compensating
//! action recorded here. On failure the ledger is unwound last-in,
//! first-out; each compensation is best-effort and its outcome lands in a
//! [`RollbackReport`]. Teardown of a registered installation reuses the
//! same machinery.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};
use wpfleet_cloudflare::NetworkingProvider;
use wpfleet_container::ContainerRuntime;

/// Inverse of one completed pipeline action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Compensation {
    RemoveNetwork { name: String },
    /// Stop, then remove
    RemoveContainer { name: String },
    DeleteTunnel { id: String },
    /// Look the tunnel up by name first; used before the provider has returned an id
    DeleteTunnelNamed { name: String },
    DeleteZone { id: String, name: String },
}

impl Compensation {
    /// Stable identifier used in reports
    pub fn action_id(&self) -> String {
        match self {
            Compensation::RemoveNetwork { name } => format!("remove_network:{}", name),
            Compensation::RemoveContainer { name } => format!("remove_container:{}", name),
            Compensation::DeleteTunnel { id } => format!("delete_tunnel:{}", id),
            Compensation::DeleteTunnelNamed { name } => format!("delete_tunnel:{}", name),
            Compensation::DeleteZone { name, .. } => format!("delete_zone:{}", name),
        }
    }

    /// Run the compensation; `Ok` carries a short outcome message
    pub async fn execute(
        &self,
        runtime: &dyn ContainerRuntime,
        provider: &dyn NetworkingProvider,
    ) -> Result<String, String> {
        match self {
            Compensation::RemoveNetwork { name } => match runtime.remove_network(name).await {
                Ok(()) => Ok("removed".to_string()),
                Err(e) if e.is_not_found() => Ok("already absent".to_string()),
                Err(e) => Err(e.to_string()),
            },
            Compensation::RemoveContainer { name } => {
                match runtime.stop_container(name).await {
                    Ok(()) => {}
                    Err(e) if e.is_not_found() => return Ok("already absent".to_string()),
                    // Removal may still succeed on a stuck container
                    Err(e) => warn!("Failed to stop {}: {}", name, e),
                }
                match runtime.remove_container(name).await {
                    Ok(()) => Ok("removed".to_string()),
                    Err(e) if e.is_not_found() => Ok("already absent".to_string()),
                    Err(e) => Err(e.to_string()),
                }
            }
            Compensation::DeleteTunnel { id } => match provider.delete_tunnel(id).await {
                Ok(()) => Ok("deleted".to_string()),
                Err(e) if e.is_not_found() => Ok("already absent".to_string()),
                Err(e) => Err(e.to_string()),
            },
            Compensation::DeleteTunnelNamed { name } => {
                let tunnel = match provider.find_tunnel(name).await {
                    Ok(Some(tunnel)) => tunnel,
                    Ok(None) => return Ok("already absent".to_string()),
                    Err(e) => return Err(e.to_string()),
                };
                match provider.delete_tunnel(&tunnel.id).await {
                    Ok(()) => Ok("deleted".to_string()),
                    Err(e) if e.is_not_found() => Ok("already absent".to_string()),
                    Err(e) => Err(e.to_string()),
                }
            }
            Compensation::DeleteZone { id, .. } => match provider.delete_zone(id).await {
                Ok(()) => Ok("deleted".to_string()),
                Err(e) if e.is_not_found() => Ok("already absent".to_string()),
                Err(e) => Err(e.to_string()),
            },
        }
    }
}

impl std::fmt::Display for Compensation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Compensation::RemoveNetwork { name } => write!(f, "remove network {}", name),
            Compensation::RemoveContainer { name } => write!(f, "remove container {}", name),
            Compensation::DeleteTunnel { id } => write!(f, "delete tunnel {}", id),
            Compensation::DeleteTunnelNamed { name } => write!(f, "delete tunnel {}", name),
            Compensation::DeleteZone { id, name } => write!(f, "delete zone {} ({})", name, id),
        }
    }
}

/// Ordered record of compensations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollbackLedger {
    entries: Vec<Compensation>,
}

impl RollbackLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, compensation: Compensation) {
        self.entries.push(compensation);
    }

    pub fn entries(&self) -> &[Compensation] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Execute every compensation, most recent first
    ///
    /// A failing compensation never stops the ones after it.
    pub async fn unwind(
        self,
        runtime: &dyn ContainerRuntime,
        provider: &dyn NetworkingProvider,
    ) -> RollbackReport {
        let started = Instant::now();
        let mut report = RollbackReport::new();

        for compensation in self.entries.into_iter().rev() {
            match compensation.execute(runtime, provider).await {
                Ok(message) => {
                    info!("{}: {}", compensation, message);
                    report.add_success(compensation.action_id(), message);
                }
                Err(error) => {
                    warn!("{} failed: {}", compensation, error);
                    report.add_failure(compensation.action_id(), error);
                }
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        report
    }
}

/// Outcome of unwinding a ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackReport {
    /// Compensations that completed (including already-absent resources)
    pub succeeded: Vec<ActionReport>,

    /// Compensations that failed; these resources may be orphaned
    pub failed: Vec<ActionReport>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl RollbackReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn add_success(&mut self, action_id: String, message: String) {
        self.succeeded.push(ActionReport {
            action_id,
            success: true,
            message,
            error: None,
        });
    }

    pub fn add_failure(&mut self, action_id: String, error: String) {
        self.failed.push(ActionReport {
            action_id,
            success: false,
            message: String::new(),
            error: Some(error),
        });
    }
}

impl std::fmt::Display for RollbackReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} compensated, {} failed",
            self.succeeded.len(),
            self.failed.len()
        )
    }
}

/// Result of a single compensation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReport {
    pub action_id: String,
    pub success: bool,
    pub message: String,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_ids() {
        assert_eq!(
            Compensation::RemoveContainer {
                name: "mysql_a_1".to_string()
            }
            .action_id(),
            "remove_container:mysql_a_1"
        );
        assert_eq!(
            Compensation::DeleteZone {
                id: "z1".to_string(),
                name: "a.com".to_string()
            }
            .action_id(),
            "delete_zone:a.com"
        );
    }

    #[test]
    fn test_report() {
        let mut report = RollbackReport::new();
        assert!(report.is_clean());

        report.add_success("remove_network:n".to_string(), "removed".to_string());
        report.add_failure("delete_tunnel:t".to_string(), "boom".to_string());

        assert!(!report.is_clean());
        assert_eq!(report.to_string(), "1 compensated, 1 failed");
        assert_eq!(report.failed[0].error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_compensation_serialization() {
        let value = serde_json::to_value(Compensation::DeleteTunnel {
            id: "t1".to_string(),
        })
        .unwrap();
        assert_eq!(value["action"], "delete_tunnel");
        assert_eq!(value["id"], "t1");
    }
}
