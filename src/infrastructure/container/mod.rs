//! Container module

pub mod key;
pub mod registry;

pub use key::ServiceKey;
pub use registry::{ContainerError, ContainerStats, ServiceContainer};

/// 绑定的生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceLifetime {
    /// New instance per resolve; the factory runs every time
    Transient,
    /// First successful instance is cached and cloned for later resolves
    Singleton,
}
