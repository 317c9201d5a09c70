pub mod config;
pub mod paths;

pub use config::{Config, LoggingConfig, RetryConfig, StoreConfig, DEFAULT_NAMESPACE};
pub use paths::{PathManager, container_base_path};
