use super::into_cli_error;
use crate::context::Context;
use anyhow::Context as _;
use colored::Colorize;
use std::path::Path;
use wpfleet_core::Installation;
use wpfleet_deploy::DeployError;
use wpfleet_registry::InstallationStore;

pub async fn handle(ctx: &Context, from: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(from)
        .with_context(|| format!("ファイルを読み込めません: {}", from.display()))?;
    let installation: Installation = serde_json::from_str(&content)
        .with_context(|| format!("インストール情報を解析できません: {}", from.display()))?;

    // Docker・Cloudflare への接続は不要なので registry に直接書き込む
    ctx.registry()
        .put(&installation)
        .await
        .map_err(|e| into_cli_error(DeployError::from(e)))?;

    println!(
        "{}",
        format!("✓ テナント '{}' を登録しました", installation.tenant_id).green()
    );

    if from == ctx.pending_path(&installation.tenant_id) {
        std::fs::remove_file(from)?;
    }

    Ok(())
}
