//! 服务信息管理模块

use super::{ServiceStatus, ServiceType};
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

/// 服务基本信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// 服务名称
    pub name: String,
    pub service_type: ServiceType,
    /// 服务监听地址（启动后可用）
    pub url: Option<Url>,
    /// 服务状态
    pub status: ServiceStatus,
    /// 服务描述
    pub description: Option<String>,
}

impl ServiceInfo {
    pub fn new(
        name: impl Into<String>,
        service_type: ServiceType,
        description: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            service_type,
            url: None,
            status: ServiceStatus::Unknown,
            description,
        }
    }

    pub fn set_running(&mut self, url: Url) {
        info!("Service '{}' running at {}", self.name, url);
        self.url = Some(url);
        self.status = ServiceStatus::Running;
    }

    pub fn is_running(&self) -> bool {
        self.status == ServiceStatus::Running
    }
}
