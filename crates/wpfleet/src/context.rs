use anyhow::Context as _;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use wpfleet_cloudflare::{CloudflareClient, CloudflareConfig};
use wpfleet_config::Settings;
use wpfleet_container::DockerRuntime;
use wpfleet_core::Installation;
use wpfleet_deploy::Deployer;
use wpfleet_registry::FileRegistry;

/// コマンド共通の実行コンテキスト
pub struct Context {
    pub settings: Settings,
    registry_path: PathBuf,
}

impl Context {
    pub fn load() -> anyhow::Result<Self> {
        let settings = Settings::load().context("設定の読み込みに失敗しました")?;
        let registry_path = settings.registry.resolve_path()?;
        tracing::debug!("登録ファイル: {}", registry_path.display());

        Ok(Self {
            settings,
            registry_path,
        })
    }

    pub fn registry(&self) -> Arc<FileRegistry> {
        Arc::new(FileRegistry::new(&self.registry_path))
    }

    pub fn provider(&self) -> anyhow::Result<Arc<CloudflareClient>> {
        let (api_token, account_id) = self.settings.cloudflare.credentials()?;
        let config = CloudflareConfig::new(api_token, account_id)
            .with_api_base(&self.settings.cloudflare.api_base);
        Ok(Arc::new(CloudflareClient::new(config)?))
    }

    /// Docker と Cloudflare の両方に接続した Deployer
    pub async fn deployer(&self) -> anyhow::Result<Deployer> {
        let provider = self.provider()?;
        let runtime = DockerRuntime::connect().await?;

        Ok(Deployer::new(
            Arc::new(runtime),
            provider,
            self.registry(),
            self.settings.deploy.clone(),
        ))
    }

    /// 登録に失敗したインストールの退避先
    pub fn pending_path(&self, tenant_id: &str) -> PathBuf {
        self.registry_path
            .with_file_name(format!("pending-{}.json", tenant_id))
    }

    pub fn save_pending(&self, installation: &Installation) -> anyhow::Result<PathBuf> {
        let path = self.pending_path(&installation.tenant_id);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&path, serde_json::to_string_pretty(installation)?)?;
        println!(
            "{}",
            format!("インストール情報を保存しました: {}", path.display()).yellow()
        );
        Ok(path)
    }
}
