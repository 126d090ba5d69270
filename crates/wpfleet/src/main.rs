mod commands;
mod context;

use clap::{Parser, Subcommand};
use context::Context;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "wpfleet")]
#[command(
    about = "WordPress サイトをコンテナで立ち上げ、Cloudflare Tunnel で公開する",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 新しいテナントのサイトを構築
    Deploy {
        /// テナントID（英数字・ハイフン・アンダースコア）
        tenant_id: String,
        /// 公開ドメイン（例: example.com）
        domain: String,
        /// 連絡先メールアドレス
        #[arg(short, long)]
        email: String,
    },
    /// 登録済みのインストールを一覧表示
    List {
        /// JSON で出力
        #[arg(long)]
        json: bool,
    },
    /// インストールの詳細を表示
    Show {
        tenant_id: String,
        /// JSON で出力
        #[arg(long)]
        json: bool,
    },
    /// コンテナ・ネットワーク・トンネルの状態を確認
    Status {
        tenant_id: String,
        /// JSON で出力
        #[arg(long)]
        json: bool,
    },
    /// データベースとアプリケーションを再起動
    Restart { tenant_id: String },
    /// コンテナのログを表示
    Logs {
        tenant_id: String,
        /// ログの行数（デフォルトは設定値）
        #[arg(short = 'l', long)]
        lines: Option<usize>,
    },
    /// インストールを完全に削除
    Delete {
        tenant_id: String,
        /// 確認をスキップ
        #[arg(short, long)]
        yes: bool,
    },
    /// 登録に失敗したインストールを登録し直す
    Register {
        /// deploy が保存したインストール情報（JSON）
        #[arg(long)]
        from: PathBuf,
    },
    /// Cloudflare API トークンを検証
    Verify,
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout は利用者向けの出力に使うので、ログは stderr へ
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("wpfleet {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let ctx = Context::load()?;

    match cli.command {
        Commands::Deploy {
            tenant_id,
            domain,
            email,
        } => commands::deploy::handle(&ctx, tenant_id, domain, email).await?,
        Commands::List { json } => commands::list::handle(&ctx, json).await?,
        Commands::Show { tenant_id, json } => commands::show::handle(&ctx, &tenant_id, json).await?,
        Commands::Status { tenant_id, json } => {
            commands::status::handle(&ctx, &tenant_id, json).await?
        }
        Commands::Restart { tenant_id } => commands::restart::handle(&ctx, &tenant_id).await?,
        Commands::Logs { tenant_id, lines } => {
            commands::logs::handle(&ctx, &tenant_id, lines).await?
        }
        Commands::Delete { tenant_id, yes } => {
            commands::delete::handle(&ctx, &tenant_id, yes).await?
        }
        Commands::Register { from } => commands::register::handle(&ctx, &from).await?,
        Commands::Verify => commands::verify::handle(&ctx).await?,
        Commands::Version => {}
    }

    Ok(())
}
