use super::helpers::{converge_locally, print_plan};
use crate::cli::ResourceCommands;
use crate::error::Result;
use crate::resource::{self, AgentConfig};
use crate::secrets::FileSecretStore;
use crate::settings::Settings;
use tracing::info;

pub fn execute(command: &ResourceCommands, settings: &Settings) -> Result<()> {
    let config: AgentConfig = resource::load(command.file())?;
    let store = FileSecretStore::new(&settings.secrets.directory);

    match command {
        ResourceCommands::Render { .. } => {
            println!("{}", config.render()?);
        }
        ResourceCommands::Plan { .. } => {
            print_plan(&config.create_plan(&store)?);
        }
        ResourceCommands::Create { .. } => {
            let report = converge_locally(&config.create_plan(&store)?)?;
            if report.updated() {
                info!(path = %config.path, tls = config.tls_active(), "agent configuration converged");
            }
        }
        ResourceCommands::Delete { .. } => {
            converge_locally(&config.delete_plan()?)?;
        }
    }

    Ok(())
}
