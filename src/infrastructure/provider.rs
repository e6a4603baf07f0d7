//! 服务提供者实现
//!
//! 为各种服务提供具体的实例化逻辑

use std::sync::Arc;

use super::container::{ServiceContainer, ServiceKey};
use crate::config::DatabaseConfig;
use crate::database::{Connector, DbConnection};

/// 数据库绑定的键名
pub const DB_KEY: &str = "DB";

/// MySQL 连接的类型化键
pub const DB: ServiceKey<DbConnection> = ServiceKey::new(DB_KEY);

/// 数据库服务提供者
///
/// Binds `"DB"` as a transient service: every resolve opens a new connection.
pub struct DatabaseProvider<C> {
    config: Arc<DatabaseConfig>,
    connector: Arc<C>,
}

impl<C> DatabaseProvider<C>
where
    C: Connector + 'static,
{
    pub fn new(config: Arc<DatabaseConfig>, connector: C) -> Self {
        Self {
            config,
            connector: Arc::new(connector),
        }
    }

    /// 注册数据库绑定
    pub fn register(&self, container: &ServiceContainer) {
        let config = Arc::clone(&self.config);
        let connector = Arc::clone(&self.connector);

        container.bind(DB_KEY, move || {
            let config = Arc::clone(&config);
            let connector = Arc::clone(&connector);
            async move { connector.connect(&config).await }
        });
    }
}
