use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection};
use std::ops::{Deref, DerefMut};

use crate::config::DatabaseConfig;
use crate::errors::ConnectionError;

/// Opens a database session from connection parameters.
///
/// One attempt per call. Implementations do not retry and do not cache.
#[async_trait]
pub trait Connector: Send + Sync {
    type Connection: Send + 'static;

    async fn connect(&self, config: &DatabaseConfig) -> Result<Self::Connection, ConnectionError>;
}

/// MySQL connector backed by `sqlx`
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlConnector;

impl MySqlConnector {
    pub fn new() -> Self {
        Self
    }

    /// Build driver options from the configuration record
    pub fn connect_options(config: &DatabaseConfig) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.username)
            .password(&config.password)
            .database(&config.dbname)
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    type Connection = DbConnection;

    async fn connect(&self, config: &DatabaseConfig) -> Result<DbConnection, ConnectionError> {
        let options = Self::connect_options(config);

        match options.connect().await {
            Ok(conn) => {
                tracing::info!(
                    host = %config.host,
                    port = config.port,
                    dbname = %config.dbname,
                    "connected to database"
                );
                Ok(DbConnection { inner: conn })
            }
            Err(source) => {
                tracing::warn!(
                    host = %config.host,
                    port = config.port,
                    error = %source,
                    "database connection failed"
                );
                Err(ConnectionError::Connect {
                    host: config.host.clone(),
                    port: config.port,
                    source,
                })
            }
        }
    }
}

/// A live MySQL session.
///
/// Owned by whoever resolved it. Derefs to [`MySqlConnection`] for queries.
pub struct DbConnection {
    inner: MySqlConnection,
}

impl DbConnection {
    /// Round-trip to the server
    pub async fn ping(&mut self) -> Result<(), ConnectionError> {
        self.inner.ping().await.map_err(ConnectionError::Ping)
    }

    /// Close the session gracefully
    pub async fn close(self) -> Result<(), ConnectionError> {
        self.inner.close().await.map_err(ConnectionError::Close)
    }
}

impl std::fmt::Debug for DbConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConnection").finish_non_exhaustive()
    }
}

impl Deref for DbConnection {
    type Target = MySqlConnection;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for DbConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
