//! secret 来源
//!
//! 令牌密钥由运维提供的 secret 派生，secret 可以直接写在配置中、放在环境变量里或存放在文件中。

use crate::error::{TokenError, TokenResult};
use rand::RngCore;
use tracing::debug;

/// secret 来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    /// 直接从配置文件读取
    Direct(String),
    /// 从环境变量读取
    Environment(String),
    /// 从文件路径读取
    File(String),
}

impl SecretSource {
    /// 读取 secret 原文
    ///
    /// 首尾空白会被去除；读取结果为空视为未配置。
    pub fn load(&self) -> TokenResult<String> {
        let secret = match self {
            SecretSource::Direct(secret) => {
                debug!("Loading secret from direct configuration");
                secret.clone()
            }
            SecretSource::Environment(env_var) => {
                debug!("Loading secret from environment variable: {}", env_var);
                std::env::var(env_var).map_err(|e| {
                    TokenError::Secret(format!(
                        "Failed to read secret from environment variable {env_var}: {e}"
                    ))
                })?
            }
            SecretSource::File(path) => {
                debug!("Loading secret from file: {}", path);
                std::fs::read_to_string(path).map_err(|e| {
                    TokenError::Secret(format!("Failed to read secret from file {path}: {e}"))
                })?
            }
        };

        let secret = secret.trim();
        if secret.is_empty() {
            return Err(TokenError::Secret(format!("Secret from {self} is empty")));
        }
        Ok(secret.to_string())
    }
}

impl std::fmt::Display for SecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretSource::Direct(_) => write!(f, "config"),
            SecretSource::Environment(name) => write!(f, "env:{name}"),
            SecretSource::File(path) => write!(f, "file:{path}"),
        }
    }
}

/// 生成新的随机 secret（用于初始化）
///
/// 返回十六进制格式的 32 字节随机值
pub fn generate_secret() -> String {
    let mut key = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut key);
    hex::encode(key)
}
