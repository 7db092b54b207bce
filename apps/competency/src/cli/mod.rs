//! # Competency CLI Module
//!
//! This module implements the CLI interface for the competency engine.
//!
//! ## Available Commands
//!
//! - `status` - Show workspace counts
//! - `progress` - Matrix progress of one user
//! - `gaps` - Grouped gaps and development plan of one user
//! - `compare` - Rank users against a position's active matrix
//! - `program` - Program and track status of one user
//! - `history` - Recent assessments of one user in one competency
//! - `snapshot` - Write the loaded workspace as a binary snapshot
//! - `validate` - Load the data file and report consistency warnings

mod commands;

use crate::config::Config;
use crate::error::AppError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Competency assessment and gap analysis.
///
/// Reads a JSON dataset or a binary snapshot and reports matrix progress,
/// gaps, rankings and program status.
#[derive(Parser, Debug)]
#[command(name = "competency")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to a TOML config file (default: ./competency.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the data file (JSON dataset or binary snapshot)
    #[arg(short = 'D', long, global = true)]
    pub data: Option<PathBuf>,

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
    /// Show workspace counts
    Status,

    /// Show a user's progress against a competency matrix
    Progress {
        /// User id
        #[arg(short, long)]
        user: u64,

        /// Matrix id
        #[arg(short, long)]
        matrix: u64,
    },

    /// Show a user's gaps grouped by requirement type, with a development plan
    Gaps {
        /// User id
        #[arg(short, long)]
        user: u64,

        /// Matrix id
        #[arg(short, long)]
        matrix: u64,
    },

    /// Rank users against the active matrix of a position
    Compare {
        /// Position id
        #[arg(short, long)]
        position: u64,

        /// User ids (comma-separated)
        #[arg(short, long, value_delimiter = ',', required = true)]
        users: Vec<u64>,
    },

    /// Show a user's status in a program
    Program {
        /// User id
        #[arg(short, long)]
        user: u64,

        /// Program id
        #[arg(short, long)]
        program: u64,
    },

    /// Show a user's most recent assessments in one competency
    History {
        /// User id
        #[arg(short, long)]
        user: u64,

        /// Competency code
        #[arg(short, long)]
        competency: String,

        /// Maximum number of assessments
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Write the loaded workspace as a binary snapshot
    Snapshot {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Load the data file and report consistency warnings
    Validate,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments and a resolved configuration.
pub fn execute(cli: Cli, config: &Config) -> Result<(), AppError> {
    let ctx = Context {
        data: config.data_path(),
        json_mode: cli.json_mode,
        assessment: config.assessment,
    };
    tracing::debug!(data = %ctx.data.display(), "executing command");

    match cli.command {
        Some(Commands::Status) | None => cmd_status(&ctx),
        Some(Commands::Progress { user, matrix }) => cmd_progress(&ctx, user, matrix),
        Some(Commands::Gaps { user, matrix }) => cmd_gaps(&ctx, user, matrix),
        Some(Commands::Compare { position, users }) => cmd_compare(&ctx, position, &users),
        Some(Commands::Program { user, program }) => cmd_program(&ctx, user, program),
        Some(Commands::History {
            user,
            competency,
            limit,
        }) => cmd_history(&ctx, user, &competency, limit),
        Some(Commands::Snapshot { output }) => cmd_snapshot(&ctx, &output),
        Some(Commands::Validate) => cmd_validate(&ctx),
    }
}
