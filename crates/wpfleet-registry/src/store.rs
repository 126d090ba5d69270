use crate::error::Result;
use async_trait::async_trait;
use wpfleet_core::Installation;

/// Installation store abstraction
///
/// Keyed by tenant id. Implementations must tolerate concurrent `put`s
/// for distinct tenants.
#[async_trait]
pub trait InstallationStore: Send + Sync {
    /// Persist a new record; fails with `AlreadyExists` if the tenant is taken
    async fn put(&self, installation: &Installation) -> Result<()>;

    /// Fetch a record; fails with `NotFound` for unknown tenants
    async fn get(&self, tenant_id: &str) -> Result<Installation>;

    async fn contains(&self, tenant_id: &str) -> Result<bool> {
        match self.get(tenant_id).await {
            Ok(_) => Ok(true),
            Err(crate::RegistryError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// All records, ordered by tenant id
    async fn list(&self) -> Result<Vec<Installation>>;

    /// Remove a record and return it
    async fn remove(&self, tenant_id: &str) -> Result<Installation>;
}
