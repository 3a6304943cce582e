use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "trainlog")]
#[command(about = "Log training sessions and review them month by month")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// User whose training log to open
    #[arg(long, value_name = "ID")]
    pub user: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show one month of the training log
    #[command(alias = "show")]
    Month {
        /// Month to show (defaults to the current month)
        #[arg(long, value_name = "YYYY-MM")]
        month: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit entries and optionally save the result
    Edit {
        /// Month being edited (defaults to the month of the first dated operation)
        #[arg(long, value_name = "YYYY-MM")]
        month: Option<String>,
        /// Save the changes instead of only previewing them
        #[arg(long)]
        commit: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Operations: add:DATE, add:DATE:HOURS, set:ID:HOURS, del:ID
        #[arg(required = true, value_name = "OP")]
        ops: Vec<String>,
    },
    /// Configure CLI defaults
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update the CLI config file
    Init {
        /// Default user id
        #[arg(long, value_name = "ID")]
        user: Option<String>,
        /// Length of newly added sessions, in hours
        #[arg(long, value_name = "HOURS")]
        default_period: Option<f64>,
        /// Default database path
        #[arg(long, value_name = "PATH")]
        db_path: Option<PathBuf>,
    },
    /// Print the active configuration
    Show,
}
