//! Catalog runtime configuration.
//!
//! # Responsibility
//! - Load database and logging settings from TOML.
//! - Expand `${VAR}` environment references before parsing.
//!
//! # Invariants
//! - `database_path` is never blank; `:memory:` selects an in-memory store.
//! - A configured log directory must be absolute (same rule as `init_logging`).

use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::logging::default_log_level;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Database path value that selects an in-memory store.
pub const IN_MEMORY_DATABASE: &str = ":memory:";

static ENV_REF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env ref regex"));

/// Errors from loading or validating configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config TOML: {err}"),
            Self::Invalid { field, message } => write!(f, "invalid config `{field}`: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid { .. } => None,
        }
    }
}

/// Top-level catalog configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// SQLite file path, or `:memory:`.
    pub database_path: PathBuf,
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

/// `[logging]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `trace|debug|info|warn|error`; build-mode default when absent.
    pub level: Option<String>,
    /// Absolute directory for rolling log files.
    pub dir: PathBuf,
}

impl CatalogConfig {
    /// Loads and validates configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let expanded = substitute_env_vars(content);
        let config: Self = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "database_path",
                message: "must not be empty".to_string(),
            });
        }

        if let Some(logging) = &self.logging {
            if !logging.dir.is_absolute() {
                return Err(ConfigError::Invalid {
                    field: "logging.dir",
                    message: format!(
                        "must be an absolute path, got `{}`",
                        logging.dir.display()
                    ),
                });
            }
        }

        Ok(())
    }

    /// Effective log level.
    pub fn log_level(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|logging| logging.level.as_deref())
            .unwrap_or(default_log_level())
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY_DATABASE
    }

    /// Opens the configured database with the catalog schema applied.
    pub fn open_database(&self) -> DbResult<Connection> {
        if self.is_in_memory() {
            open_db_in_memory()
        } else {
            open_db(&self.database_path)
        }
    }
}

/// Replaces `${VAR}` with the environment value; unknown variables stay as-is.
fn substitute_env_vars(content: &str) -> String {
    ENV_REF_RE
        .replace_all(content, |caps: &Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}
