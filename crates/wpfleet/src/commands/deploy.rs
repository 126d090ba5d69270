use super::{into_cli_error, print_installation};
use crate::context::Context;
use colored::Colorize;
use wpfleet_core::ProvisionRequest;
use wpfleet_deploy::DeployError;

pub async fn handle(
    ctx: &Context,
    tenant_id: String,
    domain: String,
    email: String,
) -> anyhow::Result<()> {
    let request = ProvisionRequest::new(tenant_id, domain, email);
    // Docker や Cloudflare に触れる前に入力を検証
    request
        .validate()
        .map_err(|e| into_cli_error(DeployError::from(e)))?;

    println!(
        "{}",
        format!("テナント '{}' を構築中...", request.tenant_id)
            .blue()
            .bold()
    );
    println!("ドメイン: {}", request.domain.cyan());

    let deployer = ctx.deployer().await?;

    match deployer.provision(&request).await {
        Ok(installation) => {
            println!();
            println!("{}", "✓ 構築が完了しました".green().bold());
            println!();
            print_installation(&installation);
            if !installation.nameservers.is_empty() {
                println!();
                println!(
                    "{}",
                    "レジストラでネームサーバーを上記に変更してください".yellow()
                );
            }
            Ok(())
        }
        Err(DeployError::Unregistered {
            tenant_id,
            installation,
            source,
        }) => {
            println!();
            println!(
                "{}",
                "✗ リソースは作成されましたが登録に失敗しました".red().bold()
            );
            let path = ctx.save_pending(&installation)?;
            println!(
                "  再登録: {}",
                format!("wpfleet register --from {}", path.display()).cyan()
            );
            Err(into_cli_error(DeployError::Unregistered {
                tenant_id,
                installation,
                source,
            }))
        }
        Err(e) => {
            println!();
            println!("{}", "✗ 構築に失敗しました".red().bold());
            Err(into_cli_error(e))
        }
    }
}
