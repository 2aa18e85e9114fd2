//! Command-line interface for svcctl.
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;

use crate::config::DEFAULT_MANIFEST;

/// Command-line interface for svcctl.
#[derive(Parser)]
#[command(name = "svcctl", version, author)]
#[command(about = "Install, control and query Windows services", long_about = None)]
pub struct Cli {
    /// Override the logging verbosity for this invocation only: off, error,
    /// warn, info, debug, trace, or 0-5.
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<LevelFilter>,

    /// Path to the service manifest. Its `settings` block tunes timeouts
    /// and polling for every command.
    #[arg(short, long, global = true, default_value = DEFAULT_MANIFEST)]
    pub config: String,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for svcctl.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show name, display name, description and state of services.
    Status {
        /// Service names to query.
        #[arg(required = true)]
        names: Vec<String>,

        /// Emit machine-readable JSON output.
        #[arg(long)]
        json: bool,
    },

    /// Install or update the services declared in the manifest.
    Install {
        /// Only install the named service.
        #[arg(short, long)]
        service: Option<String>,
    },

    /// Uninstall a service, stopping it first if needed.
    Uninstall {
        /// Service name.
        name: String,
    },

    /// Start a service and wait until it is running.
    Start {
        /// Service name.
        name: String,

        /// How long to wait (e.g., "30", "10s", "2m").
        #[arg(long, value_name = "DURATION")]
        timeout: Option<String>,
    },

    /// Stop a service and wait until it is stopped.
    Stop {
        /// Service name.
        name: String,

        /// How long to wait (e.g., "30", "10s", "2m").
        #[arg(long, value_name = "DURATION")]
        timeout: Option<String>,
    },

    /// Stop then start a service.
    Restart {
        /// Service name.
        name: String,

        /// How long to wait for each half (e.g., "60", "1m").
        #[arg(long, value_name = "DURATION")]
        timeout: Option<String>,
    },
}

impl Commands {
    /// Whether the command changes service registration or state.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Commands::Status { .. })
    }
}

/// Parses command-line arguments and returns a `Cli` struct.
pub fn parse_args() -> Cli {
    Cli::parse()
}
