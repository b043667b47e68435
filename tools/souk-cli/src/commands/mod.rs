//! CLI command implementations.

pub mod config;
pub mod orders;
pub mod run;

use clap::{Args, Subcommand};

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Script of request envelopes (JSON array, or one envelope per line for .jsonl).
    pub script: String,

    /// Store snapshot to seed from.
    #[arg(short, long)]
    pub seed: Option<String>,

    /// Accept a bearer token for an account, as TOKEN=ACCOUNT. Repeatable.
    #[arg(short, long = "bearer", value_name = "TOKEN=ACCOUNT")]
    pub bearers: Vec<String>,

    /// Attach the last minted guest token to later envelopes that carry none.
    #[arg(long)]
    pub keep_guest: bool,

    /// Write the final store snapshot to this path.
    #[arg(short, long)]
    pub dump: Option<String>,
}

/// Arguments for the orders command.
#[derive(Args)]
pub struct OrdersArgs {
    /// Store snapshot to read.
    pub snapshot: String,

    /// Show only orders in this status.
    #[arg(long)]
    pub status: Option<String>,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Initialize a new config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the config file.
    Validate,
}
