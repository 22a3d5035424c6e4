use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// 网络绑定配置
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct BindConfig {
    /// HTTP 服务绑定配置
    ///
    /// TLS 终止交给前置代理，veilink 本身只监听明文 HTTP。
    #[serde(default)]
    pub http: HttpBindConfig,
}

/// HTTP 服务绑定配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HttpBindConfig {
    /// 绑定 IP 地址
    ///
    /// 通常使用 "0.0.0.0" 监听所有接口。
    #[serde(default = "default_ip")]
    pub ip: String,

    /// 绑定端口
    ///
    /// 可被环境变量 `PORT` 覆盖。
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_ip() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for HttpBindConfig {
    fn default() -> Self {
        Self {
            ip: default_ip(),
            port: default_port(),
        }
    }
}

impl HttpBindConfig {
    /// 解析监听地址
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.ip, self.port)
            .parse()
            .map_err(|e| format!("Invalid HTTP bind address {}:{}: {e}", self.ip, self.port))
    }
}
