use super::into_cli_error;
use crate::context::Context;
use colored::Colorize;
use wpfleet_deploy::FacetStatus;

fn colored_status(status: &FacetStatus) -> colored::ColoredString {
    let text = status.to_string();
    match status {
        FacetStatus::Running | FacetStatus::Present => text.green(),
        FacetStatus::Stopped(_) | FacetStatus::Unknown(_) => text.yellow(),
        FacetStatus::NotFound => text.red(),
    }
}

pub async fn handle(ctx: &Context, tenant_id: &str, json: bool) -> anyhow::Result<()> {
    let deployer = ctx.deployer().await?;
    let status = deployer.status(tenant_id).await.map_err(into_cli_error)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", format!("テナント: {}", status.tenant_id).bold());
    println!("  アプリ:       {}", colored_status(&status.app));
    println!("  DB:           {}", colored_status(&status.db));
    println!("  ネットワーク: {}", colored_status(&status.network));
    println!("  トンネル:     {}", colored_status(&status.tunnel));
    println!();
    if status.all_up() {
        println!("{}", "✓ すべて正常です".green());
    } else {
        println!("{}", "⚠ 一部のリソースが正常ではありません".yellow());
    }

    Ok(())
}
