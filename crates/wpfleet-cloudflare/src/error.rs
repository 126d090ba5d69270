//! Cloudflare client error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloudflareError {
    /// The envelope's `success` flag was false
    #[error("Cloudflare API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Cloudflare resource not found: {0}")]
    NotFound(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected API response: {0}")]
    UnexpectedResponse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML render error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl CloudflareError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CloudflareError::NotFound(_) | CloudflareError::ApiError { status: 404, .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CloudflareError>;
