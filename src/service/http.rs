//! Link Relay HTTP 服务实现
//!
//! 提供短链接发放、跳转页与流式中继的 HTTP API 服务

use crate::service::{HttpRouterService, ServiceType, info::ServiceInfo};
use anyhow::Result;
use async_trait::async_trait;
use axum::Router;
use relay::{create_relay_state, create_router};
use tracing::info;
use veilink_common::VeilinkConfig;

/// Link Relay HTTP 服务实现
#[derive(Debug)]
pub struct RelayHttpService {
    info: ServiceInfo,
    config: VeilinkConfig,
}

impl RelayHttpService {
    pub fn new(config: VeilinkConfig) -> Self {
        Self {
            info: ServiceInfo::new(
                "Link Relay",
                ServiceType::Relay,
                Some("加密限时短链接发放与流式中继服务".to_string()),
            ),
            config,
        }
    }
}

#[async_trait]
impl HttpRouterService for RelayHttpService {
    fn info(&self) -> &ServiceInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut ServiceInfo {
        &mut self.info
    }

    async fn build_router(&mut self) -> Result<Router> {
        info!("Building relay router");

        // secret 缺失或无法读取时在这里失败
        let state = create_relay_state(&self.config)
            .map_err(|e| anyhow::anyhow!("Failed to create relay state: {e}"))?;

        let router = create_router(state);

        info!("Relay router built successfully");
        Ok(router)
    }
}
