use crate::error::Result;
use crate::settings::{Settings, GLOBAL_SETTINGS_PATH};
use std::path::Path;

pub fn execute(settings: &Settings, explicit: Option<&Path>) -> Result<()> {
    let global = Path::new(GLOBAL_SETTINGS_PATH);
    if global.exists() {
        println!("# Global settings: {}", global.display());
    } else {
        println!("# Global settings: {} - not found (optional)", global.display());
    }
    if let Some(path) = explicit {
        println!("# Settings file: {}", path.display());
    }
    println!();

    print!("{}", settings.to_toml()?);
    Ok(())
}
