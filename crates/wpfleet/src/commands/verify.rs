use super::into_cli_error;
use crate::context::Context;
use colored::Colorize;
use wpfleet_cloudflare::NetworkingProvider;
use wpfleet_deploy::DeployError;

pub async fn handle(ctx: &Context) -> anyhow::Result<()> {
    println!("{}", "Cloudflare API トークンを検証中...".blue());

    let provider = ctx.provider()?;
    let token = provider
        .verify_credentials()
        .await
        .map_err(|e| into_cli_error(DeployError::from(e)))?;

    if token.is_active() {
        println!("{}", format!("✓ トークンは有効です ({})", token.id).green());
        Ok(())
    } else {
        anyhow::bail!("トークンが有効ではありません: {}", token.status)
    }
}
