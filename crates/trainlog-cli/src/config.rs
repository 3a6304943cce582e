//! Persistent CLI configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use trainlog_core::util::normalize_text_option;
use trainlog_core::{EditorConfig, Period};

const CONFIG_FILE_NAME: &str = "cli-config.json";

pub const DB_PATH_ENV: &str = "TRAINLOG_DB_PATH";
pub const USER_ENV: &str = "TRAINLOG_USER";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub default_user: Option<String>,
    #[serde(default)]
    pub default_period: Option<Period>,
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("trainlog")
        .join(CONFIG_FILE_NAME)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("trainlog")
        .join("trainlog.db")
}

impl CliConfig {
    pub fn load() -> Result<Self, String> {
        Self::load_from_path(&default_config_path())
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, String> {
        let path = default_config_path();
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    /// Database path: explicit flag, then env, then config file, then the data dir
    pub fn resolve_db_path(&self, explicit: Option<PathBuf>) -> PathBuf {
        explicit
            .or_else(|| std::env::var_os(DB_PATH_ENV).map(PathBuf::from))
            .or_else(|| self.db_path.clone())
            .unwrap_or_else(default_db_path)
    }

    /// User id: explicit flag, then env, then config file
    pub fn resolve_user(&self, explicit: Option<String>) -> Option<String> {
        normalize_text_option(explicit)
            .or_else(|| normalize_text_option(std::env::var(USER_ENV).ok()))
            .or_else(|| self.default_user.clone())
    }

    pub fn editor_config(&self) -> EditorConfig {
        self.default_period.map_or_else(EditorConfig::default, |period| {
            EditorConfig::default().with_default_period(period)
        })
    }

    fn normalize(&mut self) {
        self.version = default_config_version();
        self.default_user = normalize_text_option(self.default_user.take());
    }
}
