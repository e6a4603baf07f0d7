use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

use crate::errors::{field_missing, ConfigError};

pub const DEFAULT_DB_PORT: u16 = 3306;

// Environment overrides
pub const ENV_DB_HOST: &str = "BOOTWIRE_DB_HOST";
pub const ENV_DB_USERNAME: &str = "BOOTWIRE_DB_USERNAME";
pub const ENV_DB_PASSWORD: &str = "BOOTWIRE_DB_PASSWORD";
pub const ENV_DB_NAME: &str = "BOOTWIRE_DB_NAME";
pub const ENV_DB_PORT: &str = "BOOTWIRE_DB_PORT";

/// Database connection parameters
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub dbname: String,
    pub port: u16,
}

/// Port as written in the file: `3306` or `"3306"`
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum PortValue {
    Number(i64),
    Text(String),
}

/// Partial Database Configuration for loading from files
#[derive(Deserialize, Debug, Default)]
pub struct PartialDatabaseConfig {
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub dbname: Option<String>,
    pub port: Option<PortValue>,
}

impl DatabaseConfig {
    /// Create DatabaseConfig from environment variables and file config
    pub fn from_env_or_file(
        file_db_config: Option<PartialDatabaseConfig>,
        env_map: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let file = file_db_config.unwrap_or_default();

        let host = env_map
            .get(ENV_DB_HOST)
            .cloned()
            .or(file.host)
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| field_missing("database.host"))?;

        let username = env_map
            .get(ENV_DB_USERNAME)
            .cloned()
            .or(file.username)
            .ok_or_else(|| field_missing("database.username"))?;

        let password = env_map
            .get(ENV_DB_PASSWORD)
            .cloned()
            .or(file.password)
            .unwrap_or_default();

        let dbname = env_map
            .get(ENV_DB_NAME)
            .cloned()
            .or(file.dbname)
            .ok_or_else(|| field_missing("database.dbname"))?;

        let port = match env_map.get(ENV_DB_PORT) {
            Some(raw) => parse_port(&PortValue::Text(raw.clone()))?,
            None => match &file.port {
                Some(value) => parse_port(value)?,
                None => DEFAULT_DB_PORT,
            },
        };

        Ok(DatabaseConfig {
            host,
            username,
            password,
            dbname,
            port,
        })
    }
}

fn parse_port(value: &PortValue) -> Result<u16, ConfigError> {
    let parsed = match value {
        PortValue::Number(n) => u16::try_from(*n).ok(),
        PortValue::Text(s) => s.trim().parse::<u16>().ok(),
    };

    match parsed {
        Some(port) if port != 0 => Ok(port),
        _ => Err(ConfigError::InvalidPort(match value {
            PortValue::Number(n) => n.to_string(),
            PortValue::Text(s) => s.clone(),
        })),
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("dbname", &self.dbname)
            .field("port", &self.port)
            .finish()
    }
}
