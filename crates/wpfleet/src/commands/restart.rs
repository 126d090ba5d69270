use super::into_cli_error;
use crate::context::Context;
use colored::Colorize;

pub async fn handle(ctx: &Context, tenant_id: &str) -> anyhow::Result<()> {
    println!(
        "{}",
        format!("テナント '{}' を再起動中...", tenant_id).yellow()
    );

    let deployer = ctx.deployer().await?;
    deployer.restart(tenant_id).await.map_err(into_cli_error)?;

    println!("{}", "✓ 再起動しました".green());
    Ok(())
}
