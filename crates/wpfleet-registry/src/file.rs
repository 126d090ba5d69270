//! JSON file registry
//!
//! Stores every installation in a single `installations.json`:
//!
//! ```json
//! { "version": 1, "updated_at": "...", "installations": { "<tenant>": { ... } } }
//! ```
//!
//! Writers take an in-process mutex and an on-disk lock file, rewrite the
//! whole document to a temp file, fsync it and rename it into place. The
//! previous document is kept next to it as `installations.json.backup`.

use crate::error::{RegistryError, Result};
use crate::store::InstallationStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use wpfleet_core::Installation;

pub const REGISTRY_VERSION: u32 = 1;

const LOCK_STALE_AFTER_HOURS: i64 = 1;
const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(100);
const LOCK_MAX_ATTEMPTS: u32 = 50;
/// How long an unparseable lock file may exist before it is considered abandoned
const LOCK_UNREADABLE_GRACE: Duration = Duration::from_secs(2);

/// On-disk registry document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryFile {
    pub version: u32,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub installations: BTreeMap<String, Installation>,
}

impl Default for RegistryFile {
    fn default() -> Self {
        Self {
            version: REGISTRY_VERSION,
            updated_at: Utc::now(),
            installations: BTreeMap::new(),
        }
    }
}

/// File-backed [`InstallationStore`]
pub struct FileRegistry {
    path: PathBuf,
    write_guard: Mutex<()>,
}

impl FileRegistry {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "installations.json".into());
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn backup_path(&self) -> PathBuf {
        self.sibling(".backup")
    }

    fn temp_path(&self) -> PathBuf {
        self.sibling(".tmp")
    }

    fn lock_path(&self) -> PathBuf {
        self.sibling(".lock")
    }

    async fn ensure_dir(&self) -> Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
            && !dir.exists()
        {
            fs::create_dir_all(dir).await?;
            tracing::debug!("Created registry directory: {}", dir.display());
        }
        Ok(())
    }

    /// Load the whole document; a missing file is an empty registry
    pub async fn load(&self) -> Result<RegistryFile> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("Registry file not found, returning empty registry");
                return Ok(RegistryFile::default());
            }
            Err(e) => return Err(e.into()),
        };

        let file: RegistryFile = serde_json::from_str(&content)?;

        if file.version > REGISTRY_VERSION {
            return Err(RegistryError::UnsupportedVersion {
                found: file.version,
                supported: REGISTRY_VERSION,
            });
        }

        tracing::debug!(
            "Loaded registry with {} installations",
            file.installations.len()
        );
        Ok(file)
    }

    async fn save(&self, file: &RegistryFile) -> Result<()> {
        self.ensure_dir().await?;

        let temp = self.temp_path();
        let content = serde_json::to_string_pretty(file)?;

        let mut handle = fs::File::create(&temp).await?;
        handle.write_all(content.as_bytes()).await?;
        handle.sync_all().await?;
        drop(handle);

        if self.path.exists() {
            fs::copy(&self.path, self.backup_path()).await?;
        }
        fs::rename(&temp, &self.path).await?;
        self.sync_dir().await?;

        tracing::debug!(
            "Saved registry with {} installations",
            file.installations.len()
        );
        Ok(())
    }

    /// Persist the rename itself
    #[cfg(unix)]
    async fn sync_dir(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::File::open(dir).await?.sync_all().await?;
        Ok(())
    }

    #[cfg(not(unix))]
    async fn sync_dir(&self) -> Result<()> {
        Ok(())
    }

    /// Load, apply `change`, and save under both locks
    async fn modify<T, F>(&self, change: F) -> Result<T>
    where
        F: FnOnce(&mut RegistryFile) -> Result<T> + Send,
    {
        let _guard = self.write_guard.lock().await;
        self.ensure_dir().await?;
        let lock = RegistryLock::acquire(self.lock_path()).await?;

        let outcome: Result<T> = async {
            let mut file = self.load().await?;
            let value = change(&mut file)?;
            file.updated_at = Utc::now();
            self.save(&file).await?;
            Ok(value)
        }
        .await;

        // The document is already durable; a lock left behind is reclaimed as stale
        if let Err(e) = lock.release().await {
            tracing::warn!("Failed to release registry lock: {}", e);
        }
        outcome
    }
}

#[async_trait]
impl InstallationStore for FileRegistry {
    async fn put(&self, installation: &Installation) -> Result<()> {
        let record = installation.clone();
        self.modify(move |file| {
            if file.installations.contains_key(&record.tenant_id) {
                return Err(RegistryError::AlreadyExists(record.tenant_id));
            }
            file.installations.insert(record.tenant_id.clone(), record);
            Ok(())
        })
        .await
    }

    async fn get(&self, tenant_id: &str) -> Result<Installation> {
        self.load()
            .await?
            .installations
            .remove(tenant_id)
            .ok_or_else(|| RegistryError::NotFound(tenant_id.to_string()))
    }

    async fn list(&self) -> Result<Vec<Installation>> {
        Ok(self.load().await?.installations.into_values().collect())
    }

    async fn remove(&self, tenant_id: &str) -> Result<Installation> {
        let tenant = tenant_id.to_string();
        self.modify(move |file| {
            file.installations
                .remove(&tenant)
                .ok_or(RegistryError::NotFound(tenant))
        })
        .await
    }
}

/// Lock file contents
#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    pid: u32,
    acquired_at: DateTime<Utc>,
}

/// Guard for the on-disk lock file
struct RegistryLock {
    path: PathBuf,
    released: bool,
}

impl RegistryLock {
    async fn acquire(path: PathBuf) -> Result<Self> {
        let info = LockInfo {
            holder: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            pid: std::process::id(),
            acquired_at: Utc::now(),
        };
        let content = serde_json::to_string_pretty(&info)?;

        for _ in 0..LOCK_MAX_ATTEMPTS {
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut handle) => {
                    // Drop removes the file if the write below fails
                    let lock = Self {
                        path,
                        released: false,
                    };
                    handle.write_all(content.as_bytes()).await?;
                    handle.flush().await?;
                    tracing::debug!("Acquired registry lock");
                    return Ok(lock);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if Self::is_stale(&path).await {
                        tracing::warn!("Removing stale registry lock: {}", path.display());
                        let _ = fs::remove_file(&path).await;
                        continue;
                    }
                    tokio::time::sleep(LOCK_RETRY_INTERVAL).await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        let holder = match fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str::<LockInfo>(&content)
                .map(|info| format!("{} (pid {}) since {}", info.holder, info.pid, info.acquired_at))
                .unwrap_or_else(|_| "unknown holder".to_string()),
            Err(_) => "unknown holder".to_string(),
        };
        Err(RegistryError::LockError(format!(
            "Registry is locked by {}",
            holder
        )))
    }

    /// Older than one hour, or unparseable for longer than the grace period
    async fn is_stale(path: &Path) -> bool {
        let Ok(content) = fs::read_to_string(path).await else {
            return false;
        };
        match serde_json::from_str::<LockInfo>(&content) {
            Ok(info) => {
                Utc::now()
                    .signed_duration_since(info.acquired_at)
                    .num_hours()
                    >= LOCK_STALE_AFTER_HOURS
            }
            // May be half-written by a concurrent acquirer, so judge by mtime
            Err(_) => Self::modified_before(path, LOCK_UNREADABLE_GRACE).await,
        }
    }

    async fn modified_before(path: &Path, age: Duration) -> bool {
        let Ok(modified) = fs::metadata(path).await.and_then(|m| m.modified()) else {
            return false;
        };
        modified
            .elapsed()
            .map(|elapsed| elapsed >= age)
            .unwrap_or(false)
    }

    async fn release(mut self) -> Result<()> {
        if !self.released {
            match fs::remove_file(&self.path).await {
                Ok(()) => tracing::debug!("Released registry lock"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            self.released = true;
        }
        Ok(())
    }
}

impl Drop for RegistryLock {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
