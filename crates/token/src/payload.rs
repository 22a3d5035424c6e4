//! 令牌载荷定义

use serde::{Deserialize, Serialize};
use url::Url;

/// 令牌中加密传输的唯一实体
///
/// 序列化格式为 JSON：`{"url": "...", "exp": 1700000000}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// 真实的源站地址（绝对 URL）
    pub url: Url,
    /// 绝对过期时间（Unix 时间戳，秒）
    pub exp: u64,
}

impl Payload {
    pub fn new(url: Url, exp: u64) -> Self {
        Self { url, exp }
    }

    /// `now >= exp` 即视为过期
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.exp <= now
    }

    /// 距离过期的剩余秒数，已过期返回 0
    pub fn remaining_secs(&self, now: u64) -> u64 {
        self.exp.saturating_sub(now)
    }
}
