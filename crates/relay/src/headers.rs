//! 请求头处理
//!
//! - 向源站转发的请求头白名单
//! - 根据入站请求推导对外可见的基础地址

use axum::http::{HeaderMap, HeaderName, Uri, header};
use strum::{EnumIter, IntoEnumIterator};

/// 允许转发到源站的请求头
///
/// 白名单是封闭的：Cookie、Authorization、Referer 等一律不转发。
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum ForwardedHeader {
    Range,
    UserAgent,
    Accept,
    AcceptEncoding,
}

impl ForwardedHeader {
    pub fn name(self) -> HeaderName {
        match self {
            ForwardedHeader::Range => header::RANGE,
            ForwardedHeader::UserAgent => header::USER_AGENT,
            ForwardedHeader::Accept => header::ACCEPT,
            ForwardedHeader::AcceptEncoding => header::ACCEPT_ENCODING,
        }
    }
}

/// 从入站请求头中挑出允许转发的部分
pub fn forwarded_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut outbound = HeaderMap::new();
    for forwarded in ForwardedHeader::iter() {
        let name = forwarded.name();
        if let Some(value) = inbound.get(&name) {
            outbound.insert(name, value.clone());
        }
    }
    outbound
}

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// 推导对外可见的基础地址（不含末尾 `/`）
///
/// 优先级: 配置的 public_url > X-Forwarded-Proto/X-Forwarded-Host > Host > 请求 URI 的 authority
/// （HTTP/2 请求只带 `:authority`，没有 Host 头）。未转发 scheme 时为 http。
pub fn public_base(public_url: Option<&str>, headers: &HeaderMap, uri: &Uri) -> Option<String> {
    if let Some(base) = public_url {
        return Some(base.trim_end_matches('/').to_string());
    }

    let scheme = first_value(headers, X_FORWARDED_PROTO).unwrap_or_else(|| "http".to_string());
    let host = first_value(headers, X_FORWARDED_HOST)
        .or_else(|| first_value(headers, header::HOST.as_str()))
        .or_else(|| uri.authority().map(|authority| authority.as_str().to_string()))?;

    Some(format!("{scheme}://{host}"))
}

/// 取逗号分隔列表中的第一个非空值
fn first_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .split(',')
        .next()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
