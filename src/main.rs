#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use consul_render::cli::{Cli, Commands};
use consul_render::commands;
use consul_render::settings::Settings;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = Settings::load(cli.settings.as_deref())
        .context("failed to load consul-render settings")?
        .with_cli_overrides(&cli);

    match &cli.command {
        Commands::Agent { command } => {
            commands::agent::execute(command, &settings)
                .with_context(|| format!("agent {}", command.file().display()))?;
        }
        Commands::Definition { command } => {
            commands::definition::execute(command, &settings)
                .with_context(|| format!("definition {}", command.file().display()))?;
        }
        Commands::Settings => {
            commands::settings::execute(&settings, cli.settings.as_deref())?;
        }
    }

    Ok(())
}
