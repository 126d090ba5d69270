use super::{into_cli_error, print_rollback};
use crate::context::Context;
use colored::Colorize;
use std::io::{self, Write};

fn confirm(tenant_id: &str) -> anyhow::Result<bool> {
    print!(
        "テナント '{}' のコンテナ・トンネル・ゾーンを削除します。よろしいですか？ [y/N]: ",
        tenant_id
    );
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}

pub async fn handle(ctx: &Context, tenant_id: &str, yes: bool) -> anyhow::Result<()> {
    let deployer = ctx.deployer().await?;
    // 存在しないテナントは確認前にエラー
    let installation = deployer.get(tenant_id).await.map_err(into_cli_error)?;

    if !yes && !confirm(&installation.tenant_id)? {
        println!("{}", "キャンセルしました".dimmed());
        return Ok(());
    }

    println!("{}", format!("テナント '{}' を削除中...", tenant_id).yellow());
    let report = deployer.delete(tenant_id).await.map_err(into_cli_error)?;
    print_rollback(&report);

    println!();
    if report.is_clean() {
        println!("{}", "✓ 削除が完了しました".green().bold());
        Ok(())
    } else {
        anyhow::bail!(
            "{} 件のリソースを削除できませんでした。手動で確認してください",
            report.failed.len()
        )
    }
}
