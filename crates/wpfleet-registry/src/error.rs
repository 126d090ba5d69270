//! Registry error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("No installation registered for tenant '{0}'")]
    NotFound(String),

    #[error("Tenant '{0}' is already registered")]
    AlreadyExists(String),

    #[error("Registry file version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Registry lock error: {0}")]
    LockError(String),

    #[error("Registry I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Registry file is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
