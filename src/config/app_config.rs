use serde::Deserialize;
use std::{collections::HashMap, path::PathBuf};
use crate::errors::ConfigError;

use super::{
    database_config::{DatabaseConfig, PartialDatabaseConfig},
    loader::ConfigLoader,
};

// Configuration location constants
pub const DEFAULT_CONFIG_PATH: &str = "config/app.toml";
pub const ENV_CONFIG_PATH: &str = "BOOTWIRE_CONFIG";

/// Main Application Configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
}

/// Partial Application Configuration for loading from files
#[derive(Deserialize, Debug, Default)]
pub struct PartialAppConfig {
    pub database: Option<PartialDatabaseConfig>,
}

impl AppConfig {
    /// Load configuration from the default location and environment
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load_config()
    }

    /// Load configuration from an explicit file path
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        ConfigLoader::with_path(path.into()).load_config()
    }

    /// Create AppConfig from partial config and environment
    pub fn from_partial_and_env(
        partial: Option<PartialAppConfig>,
        env_map: HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let partial = partial.unwrap_or_default();
        let database = DatabaseConfig::from_env_or_file(partial.database, &env_map)?;

        Ok(AppConfig { database })
    }

    /// Parse a TOML document directly (no environment overrides)
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let partial: PartialAppConfig = toml::from_str(content)
            .map_err(|e| ConfigError::TomlParse("<inline>".to_string(), e))?;
        Self::from_partial_and_env(Some(partial), HashMap::new())
    }
}
