use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum ResourceCommands {
    /// Print the rendered JSON to stdout
    Render {
        /// Desired-state file (.json, otherwise TOML)
        file: PathBuf,
    },

    /// Show the instructions `create` would run, without touching the disk
    Plan {
        /// Desired-state file (.json, otherwise TOML)
        file: PathBuf,
    },

    /// Converge the rendered file onto the filesystem
    Create {
        /// Desired-state file (.json, otherwise TOML)
        file: PathBuf,
    },

    /// Remove the rendered file
    Delete {
        /// Desired-state file (.json, otherwise TOML)
        file: PathBuf,
    },
}

impl ResourceCommands {
    pub fn file(&self) -> &PathBuf {
        match self {
            ResourceCommands::Render { file }
            | ResourceCommands::Plan { file }
            | ResourceCommands::Create { file }
            | ResourceCommands::Delete { file } => file,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "consul-render")]
#[command(about = "Render and converge Consul agent configuration and definitions", long_about = None)]
#[command(version)]
#[command(after_help = "\
EXAMPLES:
  consul-render agent render agent.toml        Print the agent config JSON
  consul-render agent create agent.toml        Write the agent config (and TLS files)
  consul-render definition create redis.toml   Write /etc/consul/redis.json
  consul-render --definition-dir /tmp/consul definition plan redis.toml

For details about a specific command, use:
  consul-render <command> --help")]
pub struct Cli {
    /// Log debug output (RUST_LOG takes precedence)
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Settings file applied on top of /etc/consul-render/config.toml
    #[arg(long, global = true, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Directory for service and check definition files
    #[arg(long, global = true, value_name = "DIR")]
    pub definition_dir: Option<PathBuf>,

    /// Root of the file-backed secret store
    #[arg(long, global = true, value_name = "DIR")]
    pub secrets_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Main agent configuration file
    #[command(long_about = "Main agent configuration file.\n\n\
        With verify_incoming or verify_outgoing set, create also writes the CA\n\
        certificate, certificate and private key fetched from the secret store,\n\
        before the configuration file itself.")]
    Agent {
        #[command(subcommand)]
        command: ResourceCommands,
    },

    /// Service or check definition file
    Definition {
        #[command(subcommand)]
        command: ResourceCommands,
    },

    /// Show effective settings after merging all sources
    Settings,
}
