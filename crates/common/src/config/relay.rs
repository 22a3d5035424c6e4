use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 中继行为配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RelayConfig {
    /// 源站未返回 Cache-Control 时使用的值
    #[serde(default = "default_cache_control")]
    pub cache_control: String,

    /// 连接源站的超时时间（秒）
    ///
    /// 未设置时不限制。只约束建立连接，不约束流式传输的总时长。
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,

    /// 请求源站时默认使用的 User-Agent
    ///
    /// 客户端自带 User-Agent 时以客户端为准。
    #[serde(default)]
    pub user_agent: Option<String>,

    /// 流式转发缓冲的分块数量
    ///
    /// 客户端读取变慢时，最多缓冲这么多个分块后暂停读取源站。
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_cache_control() -> String {
    "no-cache".to_string()
}

fn default_channel_capacity() -> usize {
    16
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            cache_control: default_cache_control(),
            connect_timeout_secs: None,
            user_agent: None,
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl RelayConfig {
    /// 连接超时
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    pub(crate) fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.channel_capacity == 0 {
            errors.push("relay.channel_capacity must be greater than 0".to_string());
        }
        if self.connect_timeout_secs == Some(0) {
            errors.push("relay.connect_timeout_secs must be greater than 0 when set".to_string());
        }
        if self.cache_control.trim().is_empty() {
            errors.push("relay.cache_control cannot be empty".to_string());
        }
        errors
    }
}
