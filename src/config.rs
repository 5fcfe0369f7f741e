use crate::core::{Result, UsqlError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub sqlite: Option<SqliteConfig>,
}

/// Static connection settings used by the driver path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// SQLite-related configuration applied to every freshly opened connection.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SqliteConfig {
    pub busy_timeout_ms: Option<u64>,
    pub foreign_keys: Option<bool>,
}

impl Config {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| UsqlError::Config(e.to_string()))?;
        if config.database.url.trim().is_empty() {
            return Err(UsqlError::Config(
                "database.url must not be empty".to_string(),
            ));
        }
        Ok(config)
    }
}

/// Loads configuration from a TOML file at the given path.
///
/// # Arguments
///
/// * `path` - The file path to the TOML configuration file.
///
/// # Example
///
/// ```no_run
/// let config = usql::config::load_config("usql.toml").expect("Failed to load config");
/// println!("{:?}", config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    Config::from_toml_str(&content)
}

/// Default location of the configuration file, `<config dir>/usql/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("usql").join("config.toml"))
}
