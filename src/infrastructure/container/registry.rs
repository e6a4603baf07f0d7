//! 服务容器实现
//!
//! 以字符串键注册零参数异步工厂：
//! - 绑定时不执行工厂
//! - 瞬态绑定每次解析都重新执行工厂
//! - 单例绑定按需启用，首次成功后缓存

use dashmap::DashMap;
use futures_util::future::{self, BoxFuture};
use futures_util::FutureExt;
use std::any::{Any, TypeId};
use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;

use super::{ServiceKey, ServiceLifetime};

/// 容器错误类型
#[derive(Debug, Error)]
pub enum ContainerError {
    /// 键未绑定
    #[error("Service '{key}' is not bound in the container")]
    NotBound { key: String },
    /// 绑定存在，但产出的类型与请求的不同
    #[error("Service '{key}' produces '{actual}', not the requested '{expected}'")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        actual: &'static str,
    },
    /// 工厂自身的错误，原样传递
    #[error(transparent)]
    Factory(anyhow::Error),
}

impl ContainerError {
    /// Borrow the factory's own error as `E`, if that is what failed.
    pub fn factory_error<E>(&self) -> Option<&E>
    where
        E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        match self {
            ContainerError::Factory(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}

type ErasedService = Box<dyn Any + Send>;

/// 服务工厂trait
trait ServiceFactory: Send + Sync {
    /// 创建服务实例
    fn create(&self) -> BoxFuture<'static, Result<ErasedService, anyhow::Error>>;

    fn service_type_id(&self) -> TypeId;

    /// 获取服务类型名称（用于错误信息）
    fn service_type_name(&self) -> &'static str;
}

/// 函数式服务工厂
struct FnServiceFactory<F, T> {
    factory_fn: F,
    _phantom: PhantomData<fn() -> T>,
}

impl<F, T> FnServiceFactory<F, T> {
    fn new(factory_fn: F) -> Self {
        Self {
            factory_fn,
            _phantom: PhantomData,
        }
    }
}

impl<F, Fut, T> ServiceFactory for FnServiceFactory<F, T>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, anyhow::Error>> + Send + 'static,
    T: Send + 'static,
{
    fn create(&self) -> BoxFuture<'static, Result<ErasedService, anyhow::Error>> {
        (self.factory_fn)()
            .map(|result| result.map(|service| Box::new(service) as ErasedService))
            .boxed()
    }

    fn service_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn service_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

struct ServiceRegistration {
    factory: Arc<dyn ServiceFactory>,
    lifetime: ServiceLifetime,
}

/// 内部容器统计信息（原子计数器）
#[derive(Default)]
struct InnerStats {
    total_resolutions: AtomicUsize,
    factory_invocations: AtomicUsize,
    cache_hits: AtomicUsize,
}

/// 服务容器
///
/// Clones share the same registry.
#[derive(Clone, Default)]
pub struct ServiceContainer {
    factories: Arc<DashMap<String, ServiceRegistration>>,
    stats: Arc<InnerStats>,
}

impl ServiceContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册瞬态服务：每次解析都会重新调用工厂
    ///
    /// Re-binding an existing key replaces the previous factory.
    pub fn bind<T, E, F, Fut>(&self, key: impl Into<String>, factory: F)
    where
        T: Send + 'static,
        E: Into<anyhow::Error> + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let stats = Arc::clone(&self.stats);
        self.register(key.into(), ServiceLifetime::Transient, move || {
            stats.factory_invocations.fetch_add(1, Ordering::Relaxed);
            factory().map(|result| result.map_err(Into::<anyhow::Error>::into))
        });
    }

    /// 注册同步工厂的瞬态服务
    pub fn bind_fn<T, E, F>(&self, key: impl Into<String>, factory: F)
    where
        T: Send + 'static,
        E: Into<anyhow::Error> + Send + 'static,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        self.bind(key, move || future::ready(factory()));
    }

    /// 注册单例服务：首次成功解析后缓存，之后返回克隆
    ///
    /// A failing factory is not cached; the next resolve calls it again.
    pub fn bind_singleton<T, E, F, Fut>(&self, key: impl Into<String>, factory: F)
    where
        T: Clone + Send + Sync + 'static,
        E: Into<anyhow::Error> + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let cell: Arc<OnceCell<T>> = Arc::new(OnceCell::new());
        let factory = Arc::new(factory);
        let stats = Arc::clone(&self.stats);

        self.register(key.into(), ServiceLifetime::Singleton, move || {
            let cell = Arc::clone(&cell);
            let factory = Arc::clone(&factory);
            let stats = Arc::clone(&stats);
            async move {
                if let Some(service) = cell.get() {
                    stats.cache_hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(service.clone());
                }
                // 等待他人初始化完成的调用同样算命中
                let initialized_here = AtomicBool::new(false);
                let service = cell
                    .get_or_try_init(|| async {
                        initialized_here.store(true, Ordering::Relaxed);
                        stats.factory_invocations.fetch_add(1, Ordering::Relaxed);
                        (*factory)().await.map_err(Into::<anyhow::Error>::into)
                    })
                    .await?;
                if !initialized_here.load(Ordering::Relaxed) {
                    stats.cache_hits.fetch_add(1, Ordering::Relaxed);
                }
                Ok::<T, anyhow::Error>(service.clone())
            }
        });
    }

    /// 通过类型化键注册瞬态服务
    pub fn bind_key<T, E, F, Fut>(&self, key: &ServiceKey<T>, factory: F)
    where
        T: Send + 'static,
        E: Into<anyhow::Error> + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.bind(key.name(), factory);
    }

    /// 通过类型化键注册单例服务
    pub fn bind_key_singleton<T, E, F, Fut>(&self, key: &ServiceKey<T>, factory: F)
    where
        T: Clone + Send + Sync + 'static,
        E: Into<anyhow::Error> + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.bind_singleton(key.name(), factory);
    }

    fn register<T, F, Fut>(&self, key: String, lifetime: ServiceLifetime, factory: F)
    where
        T: Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, anyhow::Error>> + Send + 'static,
    {
        let registration = ServiceRegistration {
            factory: Arc::new(FnServiceFactory::<F, T>::new(factory)),
            lifetime,
        };

        if self.factories.insert(key.clone(), registration).is_some() {
            tracing::debug!(key = %key, ?lifetime, "replaced existing binding");
        } else {
            tracing::debug!(key = %key, ?lifetime, "bound service");
        }
    }

    /// 解析服务
    ///
    /// Looks up `key` and runs its factory. Factory errors come back as
    /// [`ContainerError::Factory`] holding the original error.
    pub async fn resolve<T: Send + 'static>(&self, key: &str) -> Result<T, ContainerError> {
        self.stats.total_resolutions.fetch_add(1, Ordering::Relaxed);

        // the map guard must be gone before the factory runs: factories may bind
        let factory = {
            let registration = self.factories.get(key).ok_or_else(|| {
                tracing::debug!(key, "resolve of unbound key");
                ContainerError::NotBound {
                    key: key.to_string(),
                }
            })?;

            if registration.factory.service_type_id() != TypeId::of::<T>() {
                return Err(ContainerError::TypeMismatch {
                    key: key.to_string(),
                    expected: std::any::type_name::<T>(),
                    actual: registration.factory.service_type_name(),
                });
            }

            Arc::clone(&registration.factory)
        };

        tracing::debug!(key, "resolving service");
        let instance = factory.create().await.map_err(ContainerError::Factory)?;

        instance
            .downcast::<T>()
            .map(|service| *service)
            .map_err(|_| ContainerError::TypeMismatch {
                key: key.to_string(),
                expected: std::any::type_name::<T>(),
                actual: factory.service_type_name(),
            })
    }

    /// 通过类型化键解析服务
    pub async fn resolve_key<T: Send + 'static>(
        &self,
        key: &ServiceKey<T>,
    ) -> Result<T, ContainerError> {
        self.resolve(key.name()).await
    }

    /// 检查键是否已绑定
    pub fn is_bound(&self, key: &str) -> bool {
        self.factories.contains_key(key)
    }

    /// 已绑定的键（排序）
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.factories.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn lifetime(&self, key: &str) -> Option<ServiceLifetime> {
        self.factories.get(key).map(|registration| registration.lifetime)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// 获取容器统计信息
    pub fn get_stats(&self) -> ContainerStats {
        ContainerStats {
            total_resolutions: self.stats.total_resolutions.load(Ordering::Relaxed),
            factory_invocations: self.stats.factory_invocations.load(Ordering::Relaxed),
            cache_hits: self.stats.cache_hits.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("keys", &self.keys())
            .finish()
    }
}

/// 容器统计信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerStats {
    pub total_resolutions: usize,
    pub factory_invocations: usize,
    pub cache_hits: usize,
}

impl ContainerStats {
    /// 获取缓存命中率
    pub fn hit_rate(&self) -> f64 {
        if self.total_resolutions == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_resolutions as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, Clone, PartialEq)]
    struct TestService {
        id: usize,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("factory exploded: {0}")]
    struct FactoryFailure(&'static str);

    #[tokio::test]
    async fn test_bind_does_not_invoke_factory() {
        let container = ServiceContainer::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        container.bind_fn("svc", move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            Ok::<_, anyhow::Error>(TestService { id: 1 })
        });

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(container.is_bound("svc"));
        assert_eq!(container.lifetime("svc"), Some(ServiceLifetime::Transient));
    }

    #[tokio::test]
    async fn test_transient_reinvokes_factory() {
        let container = ServiceContainer::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        container.bind("svc", move || {
            let id = counter_clone.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, anyhow::Error>(TestService { id }) }
        });

        let first = container.resolve::<TestService>("svc").await.unwrap();
        let second = container.resolve::<TestService>("svc").await.unwrap();

        assert_eq!(first.id, 0);
        assert_eq!(second.id, 1);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_service_not_bound() {
        let container = ServiceContainer::new();

        let result = container.resolve::<TestService>("missing").await;

        match result {
            Err(ContainerError::NotBound { key }) => assert_eq!(key, "missing"),
            other => panic!("expected NotBound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rebind_last_wins() {
        let container = ServiceContainer::new();
        container.bind_fn("svc", || Ok::<_, anyhow::Error>(TestService { id: 1 }));
        container.bind_fn("svc", || Ok::<_, anyhow::Error>(TestService { id: 2 }));

        let service = container.resolve::<TestService>("svc").await.unwrap();
        assert_eq!(service.id, 2);
        assert_eq!(container.len(), 1);
    }

    #[tokio::test]
    async fn test_factory_error_is_passed_through() {
        let container = ServiceContainer::new();
        container.bind_fn("svc", || Err::<TestService, _>(FactoryFailure("boom")));

        let err = container.resolve::<TestService>("svc").await.unwrap_err();

        assert_eq!(err.to_string(), "factory exploded: boom");
        let inner = err.factory_error::<FactoryFailure>().expect("original error kept");
        assert_eq!(inner.0, "boom");
    }

    #[tokio::test]
    async fn test_type_mismatch_skips_factory() {
        let container = ServiceContainer::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();
        container.bind_fn("svc", move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            Ok::<_, anyhow::Error>("wrong type")
        });

        let result = container.resolve::<TestService>("svc").await;

        assert!(matches!(result, Err(ContainerError::TypeMismatch { .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_singleton_caches_first_success() {
        let container = ServiceContainer::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        container.bind_singleton("svc", move || {
            let id = counter_clone.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, anyhow::Error>(TestService { id }) }
        });

        for _ in 0..5 {
            let service = container.resolve::<TestService>("svc").await.unwrap();
            assert_eq!(service.id, 0);
        }

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        let stats = container.get_stats();
        assert_eq!(stats.total_resolutions, 5);
        assert_eq!(stats.factory_invocations, 1);
        assert_eq!(stats.cache_hits, 4);
        assert!(stats.hit_rate() > 0.7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_singleton_waiters_count_as_hits() {
        let container = ServiceContainer::new();
        container.bind_singleton("svc", || async {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            Ok::<_, anyhow::Error>(TestService { id: 7 })
        });

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let container = container.clone();
                tokio::spawn(async move { container.resolve::<TestService>("svc").await })
            })
            .collect();

        for handle in future::join_all(handles).await {
            assert_eq!(handle.unwrap().unwrap().id, 7);
        }

        let stats = container.get_stats();
        assert_eq!(stats.total_resolutions, 10);
        assert_eq!(stats.factory_invocations, 1);
        assert_eq!(stats.cache_hits, 9);
    }

    #[tokio::test]
    async fn test_singleton_does_not_cache_failure() {
        let container = ServiceContainer::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        container.bind_singleton("svc", move || {
            let attempt = counter_clone.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(anyhow::anyhow!("first attempt fails"))
                } else {
                    Ok(TestService { id: attempt })
                }
            }
        });

        assert!(container.resolve::<TestService>("svc").await.is_err());
        let service = container.resolve::<TestService>("svc").await.unwrap();
        assert_eq!(service.id, 1);
        assert_eq!(container.lifetime("svc"), Some(ServiceLifetime::Singleton));
    }

    #[tokio::test]
    async fn test_typed_key() {
        const ANSWER: ServiceKey<u64> = ServiceKey::new("ANSWER");
        let container = ServiceContainer::new();
        container.bind_key(&ANSWER, || async { Ok::<_, anyhow::Error>(42u64) });

        assert_eq!(container.resolve_key(&ANSWER).await.unwrap(), 42);
        assert_eq!(container.keys(), vec!["ANSWER".to_string()]);
    }

    #[tokio::test]
    async fn test_factory_may_bind_while_resolving() {
        let container = ServiceContainer::new();
        let inner = container.clone();
        container.bind_fn("outer", move || {
            inner.bind_fn("late", || Ok::<_, anyhow::Error>(7u8));
            Ok::<_, anyhow::Error>(1u8)
        });

        assert_eq!(container.resolve::<u8>("outer").await.unwrap(), 1);
        assert_eq!(container.resolve::<u8>("late").await.unwrap(), 7);
    }
}
