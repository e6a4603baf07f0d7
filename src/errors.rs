use thiserror::Error;

pub use crate::infrastructure::container::ContainerError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Service container has not been initialized; run bootstrap first")]
    Uninitialized,
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Database connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file '{0}': {1}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to parse TOML from file '{0}': {1}")]
    TomlParse(String, #[source] toml::de::Error),
    #[error("Required configuration field '{0}' is missing or invalid")]
    FieldMissing(String),
    #[error("Invalid port '{0}': expected an integer between 1 and 65535")]
    InvalidPort(String),
}

/// Failure to open or check a database session.
///
/// Returned in the `Err` slot of the connector, so a caller can always tell a
/// live handle apart from a failed attempt.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Connection to {host}:{port} failed: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: sqlx::Error,
    },
    #[error("Connection ping failed: {0}")]
    Ping(#[source] sqlx::Error),
    #[error("Closing connection failed: {0}")]
    Close(#[source] sqlx::Error),
}

/// Builds a config error for a missing field
pub fn field_missing(field: impl Into<String>) -> ConfigError {
    ConfigError::FieldMissing(field.into())
}

impl AppError {
    /// True when the failure came from the database connector
    pub fn is_connection_error(&self) -> bool {
        matches!(self, AppError::Connection(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uninitialized_message() {
        let err = AppError::Uninitialized;
        assert!(err.to_string().contains("bootstrap"));
        assert!(!err.is_connection_error());
    }

    #[test]
    fn test_connection_error_display_names_endpoint() {
        let err = ConnectionError::Connect {
            host: "db".to_string(),
            port: 3306,
            source: sqlx::Error::PoolClosed,
        };
        let msg = err.to_string();
        assert!(msg.contains("db:3306"));

        let app: AppError = err.into();
        assert!(app.is_connection_error());
    }

    #[test]
    fn test_field_missing() {
        let err = field_missing("database.host");
        assert_eq!(
            err.to_string(),
            "Required configuration field 'database.host' is missing or invalid"
        );
    }
}
