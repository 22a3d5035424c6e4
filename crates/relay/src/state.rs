//! Relay 服务状态

use crate::error::{RelayError, RelayResult};
use std::sync::Arc;
use token::TokenCodec;
use veilink_common::{RelayConfig, VeilinkConfig};

/// 处理器共享状态
///
/// 启动时构造一次；所有字段只读，克隆开销为几个引用计数。
#[derive(Clone, Debug)]
pub struct RelayState {
    pub codec: Arc<TokenCodec>,
    pub client: reqwest::Client,
    pub settings: Arc<RelaySettings>,
}

/// 处理器需要的配置子集
#[derive(Debug, Clone, Default)]
pub struct RelaySettings {
    /// 对外公开的基础地址（已去掉末尾 `/`）
    pub public_url: Option<String>,
    pub relay: RelayConfig,
}

impl From<&VeilinkConfig> for RelaySettings {
    fn from(config: &VeilinkConfig) -> Self {
        Self {
            public_url: config.public_base_url(),
            relay: config.relay.clone(),
        }
    }
}

impl RelayState {
    /// 创建状态，按配置构造源站 HTTP 客户端
    ///
    /// 客户端使用默认的重定向策略（最多跟随 10 次）。
    pub fn new(codec: TokenCodec, settings: RelaySettings) -> RelayResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = settings.relay.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(user_agent) = &settings.relay.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client = builder
            .build()
            .map_err(|e| RelayError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            codec: Arc::new(codec),
            client,
            settings: Arc::new(settings),
        })
    }
}

/// 从主配置创建状态（加载 secret 并派生密钥）
pub fn create_relay_state(config: &VeilinkConfig) -> RelayResult<RelayState> {
    let codec = TokenCodec::from_source(&config.secret_source())?;
    RelayState::new(codec, RelaySettings::from(config))
}
