use std::{collections::HashMap, env, fs, path::{Path, PathBuf}};
use crate::errors::ConfigError;

use super::{
    app_config::{AppConfig, PartialAppConfig, DEFAULT_CONFIG_PATH, ENV_CONFIG_PATH},
    database_config::{ENV_DB_HOST, ENV_DB_NAME, ENV_DB_PASSWORD, ENV_DB_PORT, ENV_DB_USERNAME},
};

/// Configuration loader responsible for loading config from files and environment
pub struct ConfigLoader {
    path: Option<PathBuf>,
    env_override: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    /// Create a new config loader with the default path
    pub fn new() -> Self {
        Self { path: None, env_override: None }
    }

    /// Create a config loader reading an explicit file
    pub fn with_path(path: PathBuf) -> Self {
        Self { path: Some(path), env_override: None }
    }

    /// Use a fixed variable map instead of the process environment (for testing)
    pub fn with_env(mut self, env_map: HashMap<String, String>) -> Self {
        self.env_override = Some(env_map);
        self
    }

    /// Load complete application configuration
    pub fn load_config(&self) -> Result<AppConfig, ConfigError> {
        let env_map = self.collect_env_vars();
        let config_path = self.config_path(&env_map);

        let partial_config = self.load_partial_config(&config_path)?;
        if partial_config.is_none() {
            tracing::info!(
                "配置文件 {:?} 不存在，仅使用环境变量",
                config_path
            );
        }

        let config = AppConfig::from_partial_and_env(partial_config, env_map)?;
        tracing::debug!(database = ?config.database, "configuration loaded");
        Ok(config)
    }

    /// Resolve the config file path: explicit path, then env, then default
    pub fn config_path(&self, env_map: &HashMap<String, String>) -> PathBuf {
        let raw = match &self.path {
            Some(path) => match path.to_str() {
                Some(raw) => raw.to_string(),
                // 非 UTF-8 路径不做 ~ 展开
                None => return path.clone(),
            },
            None => env_map
                .get(ENV_CONFIG_PATH)
                .cloned()
                .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string()),
        };

        let expanded = shellexpand::tilde(&raw);
        PathBuf::from(expanded.as_ref())
    }

    /// Load partial configuration from TOML file
    ///
    /// A missing file at the default or `BOOTWIRE_CONFIG` location means
    /// "environment only"; a missing explicit path is an error.
    fn load_partial_config(&self, config_path: &Path) -> Result<Option<PartialAppConfig>, ConfigError> {
        if self.path.is_none() && !config_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(config_path).map_err(|e| {
            ConfigError::FileRead(config_path.to_string_lossy().to_string(), e)
        })?;

        let partial_config: PartialAppConfig = toml::from_str(&content).map_err(|e| {
            ConfigError::TomlParse(config_path.to_string_lossy().to_string(), e)
        })?;

        Ok(Some(partial_config))
    }

    /// Collect relevant environment variables
    fn collect_env_vars(&self) -> HashMap<String, String> {
        if let Some(env_map) = &self.env_override {
            return env_map.clone();
        }

        let env_keys = [
            ENV_CONFIG_PATH,
            ENV_DB_HOST,
            ENV_DB_USERNAME,
            ENV_DB_PASSWORD,
            ENV_DB_NAME,
            ENV_DB_PORT,
        ];

        let mut env_map = HashMap::new();
        for key in &env_keys {
            if let Ok(value) = env::var(key) {
                env_map.insert(key.to_string(), value);
            }
        }
        env_map
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
