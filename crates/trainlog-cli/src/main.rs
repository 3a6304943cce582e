//! Trainlog CLI - Command-line interface for logging training sessions
//!
//! Review a month of training and apply edits that are previewed before
//! they are saved.

mod cli;
mod commands;
mod config;
mod error;


use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::common::CommandContext;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::edit::run_edit;
use crate::commands::month::run_month;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trainlog=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Month { month, json }) => {
            let context = CommandContext::resolve(cli.db_path, cli.user)?;
            run_month(&context, month.as_deref(), json).await?;
        }
        Some(Commands::Edit {
            month,
            commit,
            json,
            ops,
        }) => {
            let context = CommandContext::resolve(cli.db_path, cli.user)?;
            run_edit(&context, month.as_deref(), &ops, commit, json).await?;
        }
        Some(Commands::Config { command }) => run_config(command)?,
        Some(Commands::Completions { shell, output }) => {
            run_completions(shell, output.as_deref())?;
        }
        None => {
            Cli::command().print_help().map_err(CliError::Io)?;
            println!();
        }
    }

    Ok(())
}
