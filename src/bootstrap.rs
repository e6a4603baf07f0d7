//! Process start-up wiring

use std::path::PathBuf;
use std::sync::Arc;

use crate::app::App;
use crate::config::AppConfig;
use crate::errors::ConfigError;
use crate::database::{Connector, MySqlConnector};
use crate::infrastructure::{DatabaseProvider, ServiceContainer};

/// Build a container with the `"DB"` binding, without publishing it.
///
/// Use this to pass the container explicitly instead of through [`App`].
pub fn build_container<C>(config: &AppConfig, connector: C) -> ServiceContainer
where
    C: Connector + 'static,
{
    let container = ServiceContainer::new();
    let provider = DatabaseProvider::new(Arc::new(config.database.clone()), connector);
    provider.register(&container);
    container
}

/// Wire the MySQL binding and publish the container process-wide
pub fn bootstrap(config: &AppConfig) -> Arc<ServiceContainer> {
    bootstrap_with(config, MySqlConnector::new())
}

/// Same as [`bootstrap`] with a caller-supplied connector
pub fn bootstrap_with<C>(config: &AppConfig, connector: C) -> Arc<ServiceContainer>
where
    C: Connector + 'static,
{
    let container = Arc::new(build_container(config, connector));
    App::set_container(Arc::clone(&container));

    tracing::info!(
        bindings = ?container.keys(),
        host = %config.database.host,
        dbname = %config.database.dbname,
        "container published"
    );
    container
}

/// Load configuration (explicit path, `BOOTWIRE_CONFIG`, or the default
/// location, plus env overrides) and run [`bootstrap`].
pub fn init(config_path: Option<PathBuf>) -> Result<Arc<ServiceContainer>, ConfigError> {
    let config = match config_path {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    Ok(bootstrap(&config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::infrastructure::{ServiceLifetime, DB_KEY};

    fn sample_config() -> AppConfig {
        AppConfig {
            database: DatabaseConfig {
                host: "db".to_string(),
                username: "u".to_string(),
                password: "p".to_string(),
                dbname: "app".to_string(),
                port: 3306,
            },
        }
    }

    #[test]
    fn test_build_container_binds_db_only() {
        let container = build_container(&sample_config(), MySqlConnector::new());

        assert_eq!(container.keys(), vec![DB_KEY.to_string()]);
        assert_eq!(container.lifetime(DB_KEY), Some(ServiceLifetime::Transient));
        // binding must not connect
        assert_eq!(container.get_stats().factory_invocations, 0);
    }

    #[test]
    fn test_init_with_missing_config_file_fails() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.toml");

        let result = init(Some(path));

        assert!(matches!(result, Err(ConfigError::FileRead(_, _))));
        assert!(!App::is_initialized());
    }
}
