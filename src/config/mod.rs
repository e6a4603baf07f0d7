pub mod app_config;
pub mod database_config;
pub mod loader;

// Re-export commonly used types
pub use app_config::AppConfig;
pub use database_config::DatabaseConfig;
pub use loader::ConfigLoader;

pub use app_config::{DEFAULT_CONFIG_PATH, ENV_CONFIG_PATH};
