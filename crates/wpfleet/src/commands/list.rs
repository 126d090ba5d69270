use crate::context::Context;
use colored::Colorize;
use wpfleet_registry::InstallationStore;

pub async fn handle(ctx: &Context, json: bool) -> anyhow::Result<()> {
    let installations = ctx.registry().list().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&installations)?);
        return Ok(());
    }

    if installations.is_empty() {
        println!("{}", "登録済みのインストールはありません".dimmed());
        return Ok(());
    }

    println!(
        "{}",
        format!("{:<24} {:<32} {:<22}", "TENANT", "DOMAIN", "CREATED").bold()
    );
    println!("{}", "─".repeat(80).dimmed());
    for installation in &installations {
        println!(
            "{:<24} {:<32} {:<22}",
            installation.tenant_id.cyan(),
            installation.domain,
            installation
                .creation_instant
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
                .dimmed()
        );
    }
    println!();
    println!("合計: {} 件", installations.len());

    Ok(())
}
