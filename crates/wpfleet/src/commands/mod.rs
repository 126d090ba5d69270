pub mod delete;
pub mod deploy;
pub mod list;
pub mod logs;
pub mod register;
pub mod restart;
pub mod show;
pub mod status;
pub mod verify;

use colored::Colorize;
use wpfleet_core::Installation;
use wpfleet_deploy::{DeployError, RollbackReport};

/// DeployError を "[kind] メッセージ" 形式の anyhow エラーに変換
pub fn into_cli_error(err: DeployError) -> anyhow::Error {
    if let Some(report) = err.rollback() {
        print_rollback(report);
    }
    anyhow::anyhow!("[{}] {}", err.kind().as_str(), err)
}

pub fn print_rollback(report: &RollbackReport) {
    println!();
    println!("{}", format!("ロールバック: {}", report).bold());
    for action in &report.succeeded {
        println!("  {} {} ({})", "✓".green(), action.action_id, action.message.dimmed());
    }
    for action in &report.failed {
        println!(
            "  {} {}: {}",
            "✗".red(),
            action.action_id,
            action.error.as_deref().unwrap_or(&action.message).red()
        );
    }
}

pub fn print_installation(installation: &Installation) {
    println!("{}", installation.tenant_id.cyan().bold());
    println!("  ドメイン:     {}", installation.domain);
    println!("  連絡先:       {}", installation.contact_email);
    println!("  作成日時:     {}", installation.creation_instant.to_rfc3339());
    println!("  サイトURL:    {}", installation.site_url().green());
    println!("  管理画面:     {}", installation.admin_url());
    println!("  ネットワーク: {}", installation.network.name);
    println!("  DB:           {}", installation.db_container.name);
    println!("  アプリ:       {}", installation.app_container.name);
    println!("  公開ポート:   {}", installation.published_port);
    println!(
        "  トンネル:     {} ({})",
        installation.tunnel.name, installation.tunnel.id
    );
    println!(
        "  ゾーン:       {} ({})",
        installation.zone.name, installation.zone.id
    );
    if !installation.nameservers.is_empty() {
        println!("  ネームサーバー:");
        for ns in &installation.nameservers {
            println!("    • {}", ns);
        }
    }
}
