pub mod blockchain;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod notifier;
pub mod retry;

pub use blockchain::{BurnWatcher, BurnWatcherConfig, ChainClient, ChainConnector, RpcClient, RpcConnector};
pub use cache::DedupCache;
pub use config::{AppConfig, CacheConfig, LoggingConfig, RpcConfig, TelegramConfig, WatchConfig};
pub use error::{CacheError, ConfigError, DeliveryError, Result, RpcError, WatchError};
pub use logging::{ErrorLogger, LogContext, MetricsLogger, PerformanceMonitor};
pub use notifier::{Notifier, TelegramNotifier};
pub use retry::{retry_until_success, ReconnectPolicy};
