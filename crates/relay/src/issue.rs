//! Link Issuer
//!
//! `POST /api/shorten`：校验源站地址与有效期，生成令牌并拼出对外短链接。不做任何持久化。

use crate::error::{RelayError, RelayResult};
use crate::headers::public_base;
use crate::state::RelayState;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, Uri},
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use token::{Payload, unix_now};
use tracing::info;
use url::Url;
use veilink_common::metrics::LINKS_ISSUED;

/// 有效期上限：一年
pub const MAX_EXPIRY_SECONDS: i64 = 31_536_000;

/// 短链接请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenRequest {
    pub original_url: Option<String>,
    pub expiry_seconds: Option<i64>,
}

/// 短链接响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenResponse {
    pub short_url: String,
    /// RFC 3339 (UTC)
    pub expires_at: String,
    pub original_url: String,
    pub expiry_seconds: i64,
}

/// 校验源站地址：必须是带主机名的 http/https 绝对地址
pub fn validate_origin(raw: &str) -> RelayResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| {
        RelayError::Validation(format!("originalUrl is not a valid absolute URL: {e}"))
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(RelayError::Validation(format!(
            "originalUrl scheme '{}' is not supported, use http or https",
            url.scheme()
        )));
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(RelayError::Validation(
            "originalUrl must include a host".to_string(),
        ));
    }

    Ok(url)
}

/// 校验有效期（秒）：`0 < ttl <= 31536000`
pub fn validate_expiry(seconds: i64) -> RelayResult<u64> {
    if seconds <= 0 || seconds > MAX_EXPIRY_SECONDS {
        return Err(RelayError::Validation(format!(
            "expirySeconds must be between 1 and {MAX_EXPIRY_SECONDS}"
        )));
    }
    Ok(seconds as u64)
}

/// 把 Unix 秒格式化为 RFC 3339 (UTC)
pub fn format_expiry(exp: u64) -> String {
    i64::try_from(exp)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| exp.to_string())
}

/// 发放短链接
pub async fn shorten(
    State(state): State<RelayState>,
    headers: HeaderMap,
    uri: Uri,
    body: Result<Json<ShortenRequest>, JsonRejection>,
) -> RelayResult<Json<ShortenResponse>> {
    let result = issue(&state, &headers, &uri, body);
    let status = if result.is_ok() { "ok" } else { "rejected" };
    LINKS_ISSUED.with_label_values(&[status]).inc();
    result.map(Json)
}

fn issue(
    state: &RelayState,
    headers: &HeaderMap,
    uri: &Uri,
    body: Result<Json<ShortenRequest>, JsonRejection>,
) -> RelayResult<ShortenResponse> {
    let Json(request) = body.map_err(|rejection| {
        RelayError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    })?;

    let (Some(original_url), Some(expiry_seconds)) = (request.original_url, request.expiry_seconds)
    else {
        return Err(RelayError::Validation(
            "originalUrl and expirySeconds required".to_string(),
        ));
    };

    let url = validate_origin(&original_url)?;
    let ttl = validate_expiry(expiry_seconds)?;

    let base = public_base(state.settings.public_url.as_deref(), headers, uri).ok_or_else(|| {
        RelayError::Validation("Cannot determine public address: missing Host header".to_string())
    })?;

    let exp = unix_now().saturating_add(ttl);
    let token = state.codec.encrypt(&Payload::new(url, exp))?;
    let short_url = format!("{base}/r/{}", urlencoding::encode(&token));

    info!("Short link issued: ttl={}s, exp={}", ttl, exp);

    Ok(ShortenResponse {
        short_url,
        expires_at: format_expiry(exp),
        original_url,
        expiry_seconds,
    })
}
