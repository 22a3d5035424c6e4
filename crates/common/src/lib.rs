//! veilink 基础设施库
//!
//! 为链接中继服务提供配置管理与监控指标等通用组件

pub mod config;
pub mod metrics;

pub use config::{
    BindConfig, ConfigError, HttpBindConfig, LogConfig, ObservabilityConfig, RelayConfig,
    VeilinkConfig,
};
