use super::into_cli_error;
use crate::context::Context;
use colored::Colorize;
use wpfleet_deploy::ContainerLogs;

fn print_logs(label: &str, logs: &ContainerLogs) {
    println!(
        "{}",
        format!("=== {} ({}) ===", label, logs.container).bold()
    );
    match &logs.output {
        Ok(output) => print!("{}", output),
        Err(reason) => println!("{}", format!("ログを取得できません: {}", reason).red()),
    }
    println!();
}

pub async fn handle(ctx: &Context, tenant_id: &str, lines: Option<usize>) -> anyhow::Result<()> {
    let deployer = ctx.deployer().await?;
    let logs = deployer.logs(tenant_id, lines).await.map_err(into_cli_error)?;

    print_logs("アプリ", &logs.app);
    print_logs("DB", &logs.db);

    Ok(())
}
