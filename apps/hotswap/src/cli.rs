//! Command line interface definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// hotswap - self-updating service host
#[derive(Parser)]
#[command(name = "hotswap")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Self-updating service host and upgrade engine")]
#[command(long_about = None)]
pub struct Cli {
    /// Defaults to `run` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Enable debug logging to the configured log directory
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Behave as a service even when attached to a terminal
    #[arg(long, global = true)]
    pub unattended: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Register `<name>-<version>` with the service manager and start it
    Install {
        /// Version being installed
        version: String,
    },

    /// Stop and remove the registered service instance
    Uninstall {
        /// Only remove this version's instance
        version: Option<String>,
    },

    /// Switch the registered service over to a freshly applied release
    Updated {
        /// Version that was just applied
        version: String,
    },

    /// First launch after installation; nothing to do
    Firstrun,

    /// Release was superseded; nothing to do
    Obsolete,

    /// Host the configured payload and poll for updates
    Run,
}

impl Cli {
    /// The subcommand to execute, `run` when none was given
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run)
    }
}
