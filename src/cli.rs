use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pgconverge")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Converge PostgreSQL databases to a declared configuration", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file
    #[arg(long, env = "PGCONVERGE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Identity ledger recording what was applied
    #[arg(long, env = "PGCONVERGE_STATE", global = true)]
    pub state: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change, attribute by attribute
    Plan(PlanArgs),

    /// Make the server match the configuration
    Apply(ApplyArgs),

    /// Show the current state of a database
    Show {
        /// Database name
        name: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check whether a database exists (exit status 1 if not)
    Exists {
        /// Database name
        name: String,
    },

    /// Drop a database
    Drop {
        /// Database name
        name: String,

        /// Terminate existing sessions first (PostgreSQL 13+)
        #[arg(long)]
        force: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show the server version and which optional features it supports
    Probe {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct PlanArgs {
    /// Only plan specific targets: database, database.<key>, or a key
    pub target: Option<String>,

    /// Include recorded databases no longer in the configuration
    #[arg(long)]
    pub prune: bool,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Only apply specific targets: database, database.<key>, or a key
    pub target: Option<String>,

    /// Show what would change without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Number of databases to converge in parallel
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Drop recorded databases no longer in the configuration
    #[arg(long)]
    pub prune: bool,
}
