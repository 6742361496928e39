//! Command-line argument definitions

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Remote FreeBSD server console built on the Windlass core
#[derive(Debug, Parser)]
#[command(name = "windlass", version, about)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Connection parameters shared by every subcommand
#[derive(Debug, Args)]
pub struct ConnectionArgs {
    /// Remote hostname or IP address
    #[arg(long, env = "WINDLASS_HOST")]
    pub host: String,

    /// SSH port
    #[arg(long, default_value_t = 22)]
    pub port: u16,

    /// Login username
    #[arg(short, long, env = "WINDLASS_USER")]
    pub user: String,

    /// Path to the private key file
    #[arg(short, long, env = "WINDLASS_KEY")]
    pub key: PathBuf,

    /// Prompt for the key passphrase
    #[arg(long)]
    pub ask_passphrase: bool,
}

/// Available subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Verify connectivity, authentication, and remote platform
    Check {
        /// Connection parameters
        #[command(flatten)]
        connection: ConnectionArgs,
    },

    /// Run a command and print its output
    Run {
        /// Connection parameters
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Command text to execute remotely
        command: String,

        /// Keep stdout and stderr apart instead of combining them
        #[arg(long)]
        split: bool,
    },

    /// Stream a command's output as it arrives and report its exit status
    Stream {
        /// Connection parameters
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Command text to execute remotely
        command: String,
    },

    /// Poll telemetry once, or watch continuously
    Metrics {
        /// Connection parameters
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Keep polling until interrupted
        #[arg(long)]
        watch: bool,

        /// Polling interval in seconds (1-60)
        #[arg(long, default_value_t = 3)]
        interval: u8,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}
