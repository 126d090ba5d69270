use super::{into_cli_error, print_installation};
use crate::context::Context;
use wpfleet_deploy::DeployError;
use wpfleet_registry::InstallationStore;

pub async fn handle(ctx: &Context, tenant_id: &str, json: bool) -> anyhow::Result<()> {
    let installation = ctx
        .registry()
        .get(tenant_id)
        .await
        .map_err(|e| into_cli_error(DeployError::from(e)))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&installation)?);
    } else {
        print_installation(&installation);
    }

    Ok(())
}
