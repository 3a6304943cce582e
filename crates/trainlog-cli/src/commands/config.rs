use std::path::PathBuf;

use trainlog_core::util::normalize_text_option;
use trainlog_core::{Period, UserId};

use crate::cli::ConfigCommands;
use crate::config::{default_config_path, CliConfig};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            user,
            default_period,
            db_path,
        } => {
            let mut config = CliConfig::load().map_err(CliError::Config)?;
            apply_config_init(&mut config, user, default_period, db_path)?;
            let path = config.save().map_err(CliError::Config)?;
            println!("Saved CLI config to {}", path.display());
            Ok(())
        }
        ConfigCommands::Show => {
            let config = CliConfig::load().map_err(CliError::Config)?;
            println!("# {}", default_config_path().display());
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

/// Merge `config init` flags into an existing config; omitted flags keep their value
pub fn apply_config_init(
    config: &mut CliConfig,
    user: Option<String>,
    default_period: Option<f64>,
    db_path: Option<PathBuf>,
) -> Result<(), CliError> {
    if let Some(user) = normalize_text_option(user) {
        config.default_user = Some(UserId::new(user)?.to_string());
    }
    if let Some(hours) = default_period {
        config.default_period = Some(Period::from_hours(hours)?);
    }
    if let Some(db_path) = db_path {
        config.db_path = Some(db_path);
    }
    Ok(())
}
