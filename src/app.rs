// 全局容器访问

use lazy_static::lazy_static;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::database::DbConnection;
use crate::errors::{AppError, ConnectionError};
use crate::infrastructure::{ContainerError, ServiceContainer, ServiceKey, DB};

lazy_static! {
    static ref CONTAINER: RwLock<Option<Arc<ServiceContainer>>> = RwLock::new(None);
}

/// Process-wide access to the published container.
///
/// Starts uninitialized; the first `set_container` makes it ready and there is
/// no way back. Later calls replace the container.
pub struct App;

impl App {
    /// 发布容器（后调用者覆盖）
    pub fn set_container(container: Arc<ServiceContainer>) {
        let previous = CONTAINER.write().replace(container);
        if previous.is_some() {
            tracing::debug!("replaced published container");
        }
    }

    /// 获取当前容器
    pub fn container() -> Result<Arc<ServiceContainer>, AppError> {
        CONTAINER.read().clone().ok_or(AppError::Uninitialized)
    }

    pub fn is_initialized() -> bool {
        CONTAINER.read().is_some()
    }

    /// Resolve a typed binding from the published container
    pub async fn resolve<T: Send + 'static>(key: &ServiceKey<T>) -> Result<T, AppError> {
        let container = Self::container()?;
        container.resolve_key(key).await.map_err(into_app_error)
    }

    /// 打开一个新的数据库连接
    pub async fn db() -> Result<DbConnection, AppError> {
        Self::resolve(&DB).await
    }
}

/// Surface connector failures as their own variant so callers can branch on them.
fn into_app_error(err: ContainerError) -> AppError {
    match err {
        ContainerError::Factory(source) => match source.downcast::<ConnectionError>() {
            Ok(connection_error) => AppError::Connection(connection_error),
            Err(other) => AppError::Container(ContainerError::Factory(other)),
        },
        other => AppError::Container(other),
    }
}
