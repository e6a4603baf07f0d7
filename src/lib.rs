pub mod app;
pub mod bootstrap;
pub mod config;
pub mod database;
pub mod errors;
pub mod infrastructure;

// Re-export commonly used items for convenience
pub use app::App;
pub use bootstrap::{bootstrap, bootstrap_with, build_container, init};
pub use config::{AppConfig, DatabaseConfig};
pub use database::{Connector, DbConnection, MySqlConnector};
pub use errors::{AppError, ConfigError, ConnectionError};
pub use infrastructure::{ContainerError, ServiceContainer, ServiceKey, ServiceLifetime, DB};
