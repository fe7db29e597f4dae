//! Configuration loading from approver.toml.

use plugin::EvaluatorConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_RBAC_FILE: &str = "rbac.toml";
const DATABASE_FILE: &str = "approver.db";

/// Top-level configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Log filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// SQLite database holding policies and review history.
    /// Defaults to the user data directory.
    #[serde(default)]
    pub database: Option<PathBuf>,

    /// RBAC rules file.
    #[serde(default = "default_rbac")]
    pub rbac: PathBuf,

    /// Evaluator processes, run in the order listed.
    #[serde(default, rename = "evaluator")]
    pub evaluators: Vec<EvaluatorConfig>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_rbac() -> PathBuf {
    PathBuf::from(DEFAULT_RBAC_FILE)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            database: None,
            rbac: default_rbac(),
            evaluators: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load configuration, falling back to defaults if the file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut names = std::collections::HashSet::new();
        for evaluator in &self.evaluators {
            if !names.insert(evaluator.name.as_str()) {
                return Err(ConfigError::DuplicateEvaluator(evaluator.name.clone()));
            }
        }
        Ok(())
    }

    /// Resolve the database path.
    pub fn database_path(&self) -> PathBuf {
        self.database.clone().unwrap_or_else(|| {
            dirs_data_dir()
                .unwrap_or_else(|| ".approver".into())
                .join(DATABASE_FILE)
        })
    }
}

fn dirs_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share/approver"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")))
            .map(|p| p.join("approver"))
    }
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|h| PathBuf::from(h).join("approver"))
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        None
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("evaluator {0:?} is configured more than once")]
    DuplicateEvaluator(String),
}
