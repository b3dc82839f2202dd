//! # Strand CLI Module
//!
//! This module implements the CLI interface for strand.
//!
//! ## Available Commands
//!
//! - `id` - Compute a stamped identifier, or draw a random one
//! - `kinds` - List registered variable and constraint kinds
//! - `run` - Build a scenario and print the graph and its cost
//! - `check` - Validate a scenario without printing the graph

mod commands;

use crate::config::StrandConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use strand_core::StrandError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Strand - estimation graph inspector
///
/// Builds graphs of stamped variables and constraints and reports their
/// identities and cost.
#[derive(Parser, Debug)]
#[command(name = "strand")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the configuration file (default: strand.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute the identifier of a stamped variable, or draw a random one
    Id {
        /// Variable kind (e.g. Position2DStamped)
        #[arg(short, long, required_unless_present = "random")]
        kind: Option<String>,

        /// Timestamp in seconds
        #[arg(short, long, default_value = "0", allow_negative_numbers = true)]
        stamp: f64,

        /// Device name (default: the nil device)
        #[arg(short, long)]
        device: Option<String>,

        /// Draw a random identifier instead
        #[arg(short, long, conflicts_with_all = ["kind", "device"])]
        random: bool,
    },

    /// List registered variable and constraint kinds
    Kinds,

    /// Build a scenario, print the graph and its total cost
    Run {
        /// Path to the scenario file (TOML)
        #[arg(short = 'f', long)]
        scenario: PathBuf,
    },

    /// Validate a scenario file
    Check {
        /// Path to the scenario file (TOML)
        #[arg(short = 'f', long)]
        scenario: PathBuf,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments and loaded configuration.
pub fn execute(cli: Cli, config: &StrandConfig) -> Result<(), StrandError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Id {
            kind,
            stamp,
            device,
            random,
        }) => {
            if random {
                cmd_random_id(config, json_mode)
            } else {
                cmd_id(kind.as_deref(), stamp, device.as_deref(), json_mode)
            }
        }
        Some(Commands::Kinds) => cmd_kinds(json_mode),
        Some(Commands::Run { scenario }) => cmd_run(config, &scenario, json_mode),
        Some(Commands::Check { scenario }) => cmd_check(config, &scenario, json_mode),
        None => {
            // No subcommand - list kinds by default
            cmd_kinds(json_mode)
        }
    }
}
