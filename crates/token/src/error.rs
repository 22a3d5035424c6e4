//! 令牌错误定义

use thiserror::Error;

/// 令牌错误类型
///
/// 密钥错误、密文损坏、认证标签不匹配、载荷格式错误统一归为 [`TokenError::Decode`]，
/// 不向调用方区分具体失败原因。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// 令牌格式错误、被篡改或使用了其他密钥
    #[error("Invalid or tampered token")]
    Decode,

    /// 令牌结构完整但已过期
    #[error("Link expired at {exp}")]
    Expired {
        /// 过期时间（Unix 时间戳，秒）
        exp: u64,
    },

    /// 载荷序列化或加密失败
    #[error("Token encoding failed: {0}")]
    Encode(String),

    /// secret 读取或派生失败
    #[error("Secret error: {0}")]
    Secret(String),
}

impl TokenError {
    /// 是否为过期错误
    pub fn is_expired(&self) -> bool {
        matches!(self, TokenError::Expired { .. })
    }
}

/// 令牌结果类型别名
pub type TokenResult<T> = Result<T, TokenError>;
