use super::helpers::{converge_locally, print_plan};
use crate::cli::ResourceCommands;
use crate::error::Result;
use crate::resource::{self, DefinitionEntry};
use crate::settings::Settings;

pub fn execute(command: &ResourceCommands, settings: &Settings) -> Result<()> {
    let entry: DefinitionEntry = resource::load(command.file())?;
    let base_dir = settings.definitions.directory.as_path();

    match command {
        ResourceCommands::Render { .. } => println!("{}", entry.render()?),
        ResourceCommands::Plan { .. } => print_plan(&entry.create_plan(base_dir)?),
        ResourceCommands::Create { .. } => {
            converge_locally(&entry.create_plan(base_dir)?)?;
        }
        ResourceCommands::Delete { .. } => {
            converge_locally(&entry.delete_plan(base_dir)?)?;
        }
    }

    Ok(())
}
