//! Expiry Gate
//!
//! 每个解析请求（跳转页与中继）都必须经过此校验：先解码令牌，再比较内嵌的过期时间。
//! 结果从不缓存。

use crate::codec::TokenCodec;
use crate::error::{TokenError, TokenResult};
use crate::payload::Payload;

/// 当前 Unix 时间戳（秒）
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// 解码令牌并校验是否仍然有效
///
/// 解码失败原样返回 [`TokenError::Decode`]；`exp <= now` 返回 [`TokenError::Expired`]。
pub fn check(codec: &TokenCodec, token: &str, now: u64) -> TokenResult<Payload> {
    let payload = codec.decrypt(token)?;
    if payload.is_expired_at(now) {
        return Err(TokenError::Expired { exp: payload.exp });
    }
    Ok(payload)
}

/// 以当前时间执行 [`check`]
pub fn check_now(codec: &TokenCodec, token: &str) -> TokenResult<Payload> {
    check(codec, token, unix_now())
}
