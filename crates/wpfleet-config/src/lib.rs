//! wpfleet の設定管理
//!
//! 設定は次の順に重ね合わせます（後のものが優先）:
//! 1. 組み込みのデフォルト値
//! 2. YAML 設定ファイル（`WPFLEET_CONFIG` で指定、なければ `~/.config/wpfleet/config.yaml`）
//! 3. 環境変数 `CLOUDFLARE_API_TOKEN` / `CLOUDFLARE_ACCOUNT_ID` / `WPFLEET_REGISTRY_PATH`

pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use wpfleet_core::WaitConfig;

pub const CONFIG_PATH_ENV: &str = "WPFLEET_CONFIG";
pub const API_TOKEN_ENV: &str = "CLOUDFLARE_API_TOKEN";
pub const ACCOUNT_ID_ENV: &str = "CLOUDFLARE_ACCOUNT_ID";
pub const REGISTRY_PATH_ENV: &str = "WPFLEET_REGISTRY_PATH";

pub const DEFAULT_API_BASE: &str = "https://api.cloudflare.com/client/v4";
pub const DEFAULT_APP_IMAGE: &str = "wordpress:latest";
pub const DEFAULT_DB_IMAGE: &str = "mysql:8.0";
pub const DEFAULT_TUNNEL_AGENT_URL: &str =
    "https://github.com/cloudflare/cloudflared/releases/latest/download/cloudflared-linux-amd64.deb";

/// wpfleet 全体の設定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub cloudflare: CloudflareSettings,
    pub registry: RegistrySettings,
    pub deploy: DeploySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudflareSettings {
    pub api_token: Option<String>,
    pub account_id: Option<String>,
    pub api_base: String,
}

impl Default for CloudflareSettings {
    fn default() -> Self {
        Self {
            api_token: None,
            account_id: None,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

impl CloudflareSettings {
    /// `(api_token, account_id)` を取得（未設定ならエラー）
    pub fn credentials(&self) -> Result<(&str, &str)> {
        let api_token = non_empty(&self.api_token).ok_or(ConfigError::MissingCredential {
            field: "api_token",
            env: API_TOKEN_ENV,
        })?;
        let account_id = non_empty(&self.account_id).ok_or(ConfigError::MissingCredential {
            field: "account_id",
            env: ACCOUNT_ID_ENV,
        })?;
        Ok((api_token, account_id))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// 未指定なら `~/.wpfleet/installations.json`
    pub path: Option<PathBuf>,
}

impl RegistrySettings {
    pub fn resolve_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => default_registry_path(),
        }
    }
}

/// プロビジョニングの設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploySettings {
    pub app_image: String,
    pub db_image: String,
    /// 各ステップのタイムアウト（秒）
    pub step_timeout_secs: u64,
    /// `logs` で取得する末尾行数
    pub log_tail: usize,
    /// トンネルエージェントの .deb パッケージ
    pub tunnel_agent_url: String,
    /// DB 準備完了待機のリトライ設定
    pub readiness: WaitConfig,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            app_image: DEFAULT_APP_IMAGE.to_string(),
            db_image: DEFAULT_DB_IMAGE.to_string(),
            step_timeout_secs: 300,
            log_tail: 100,
            tunnel_agent_url: DEFAULT_TUNNEL_AGENT_URL.to_string(),
            readiness: WaitConfig::default(),
        }
    }
}

impl DeploySettings {
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }
}

impl Settings {
    /// デフォルトの場所から設定を読み込み、環境変数を反映
    pub fn load() -> Result<Self> {
        let mut settings = match std::env::var(CONFIG_PATH_ENV) {
            // 明示指定されたファイルは存在必須
            Ok(path) if !path.trim().is_empty() => {
                let path = PathBuf::from(path);
                if !path.exists() {
                    return Err(ConfigError::ConfigFileNotFound(path));
                }
                Self::from_file(&path)?
            }
            _ => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    tracing::debug!("設定ファイルがないためデフォルト値を使用します");
                    Self::default()
                }
            },
        };

        settings.apply_env();
        settings.validate()?;
        Ok(settings)
    }

    /// YAML ファイルから読み込み（環境変数は反映しない）
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings = Self::from_yaml(&content)?;
        tracing::debug!("設定ファイルを読み込みました: {}", path.display());
        Ok(settings)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // 空ファイルはデフォルト扱い
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// 環境変数で上書き
    pub fn apply_env(&mut self) {
        if let Some(token) = env_value(API_TOKEN_ENV) {
            self.cloudflare.api_token = Some(token);
        }
        if let Some(account_id) = env_value(ACCOUNT_ID_ENV) {
            self.cloudflare.account_id = Some(account_id);
        }
        if let Some(path) = env_value(REGISTRY_PATH_ENV) {
            self.registry.path = Some(PathBuf::from(path));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.deploy.step_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "deploy.step_timeout_secs は 1 以上を指定してください".to_string(),
            ));
        }
        if self.deploy.log_tail == 0 {
            return Err(ConfigError::InvalidValue(
                "deploy.log_tail は 1 以上を指定してください".to_string(),
            ));
        }
        if self.deploy.readiness.max_retries == 0 {
            return Err(ConfigError::InvalidValue(
                "deploy.readiness.max_retries は 1 以上を指定してください".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// wpfleet の設定ディレクトリ（`~/.config/wpfleet`）
pub fn get_config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("wpfleet"))
}

fn default_config_path() -> Option<PathBuf> {
    get_config_dir().ok().map(|dir| dir.join("config.yaml"))
}

/// デフォルトの登録ファイル（`~/.wpfleet/installations.json`）
pub fn default_registry_path() -> Result<PathBuf> {
    Ok(dirs::home_dir()
        .ok_or(ConfigError::HomeDirNotFound)?
        .join(".wpfleet")
        .join("installations.json"))
}
