//! 共享库
//!
//! 包含各服务共用的配置加载、数据库连接池、日志初始化等基础设施代码。

pub mod config;
pub mod database;
pub mod observability;

pub use config::{AppConfig, DatabaseConfig, EngineConfig, ObservabilityConfig, ServerConfig};
pub use database::Database;
