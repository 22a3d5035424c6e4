//! Relay Fetcher
//!
//! `GET /p/{token}`：重新执行过期校验后请求源站，镜像状态码与关键响应头，流式转发响应体。
//! 完整的 HTML 响应会先读取再改写链接；部分内容（206）原样流式转发。

use crate::error::{RelayError, RelayResult};
use crate::headers::forwarded_headers;
use crate::pump::spawn_body;
use crate::rewrite::rewrite_html;
use crate::state::RelayState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use token::check_now;
use tracing::{debug, info};
use url::Url;
use veilink_common::metrics::{ORIGIN_RESPONSES, TOKEN_CHECKS, status_class};

/// 源站响应中原样镜像的响应头
const MIRRORED_HEADERS: [header::HeaderName; 4] = [
    header::CONTENT_TYPE,
    header::CONTENT_LENGTH,
    header::CONTENT_RANGE,
    header::CONTENT_ENCODING,
];

/// 中继请求
pub async fn relay(
    State(state): State<RelayState>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> RelayResult<Response> {
    let payload = match check_now(&state.codec, &token) {
        Ok(payload) => {
            TOKEN_CHECKS.with_label_values(&["relay", "valid"]).inc();
            payload
        }
        Err(e) => {
            let outcome = if e.is_expired() {
                "expired"
            } else {
                "invalid"
            };
            TOKEN_CHECKS.with_label_values(&["relay", outcome]).inc();
            return Err(e.into());
        }
    };

    fetch(&state, &payload.url, &headers).await
}

async fn fetch(state: &RelayState, origin: &Url, inbound: &HeaderMap) -> RelayResult<Response> {
    let upstream = state
        .client
        .get(origin.clone())
        .headers(forwarded_headers(inbound))
        .send()
        .await
        .inspect_err(|_| ORIGIN_RESPONSES.with_label_values(&["error"]).inc())?;

    let status = upstream.status();
    ORIGIN_RESPONSES
        .with_label_values(&[status_class(status.as_u16())])
        .inc();

    if !status.is_success() {
        info!("Origin responded with non-success status {}", status);
        return Err(RelayError::OriginStatus(status));
    }

    let origin_headers = upstream.headers().clone();
    let default_cache_control = &state.settings.relay.cache_control;

    let rewritable = is_html(&origin_headers)
        && !is_encoded(&origin_headers)
        && !is_partial(status, &origin_headers);
    if rewritable {
        // 源站最终地址（跟随重定向后）作为相对链接的解析基准
        let base = upstream.url().clone();
        let body = upstream.bytes().await?;
        let rewritten = rewrite_html(&body, &base);
        debug!(
            "Rewrote HTML from origin: {} -> {} bytes",
            body.len(),
            rewritten.len()
        );

        let mut response = (status, rewritten).into_response();
        let headers = response.headers_mut();
        if let Some(content_type) = origin_headers.get(header::CONTENT_TYPE) {
            headers.insert(header::CONTENT_TYPE, content_type.clone());
        }
        apply_cache_control(headers, &origin_headers, default_cache_control)?;
        return Ok(response);
    }

    let mut stream = Box::pin(upstream.bytes_stream());
    // 先取首个分块：在提交响应头之前暴露源站错误
    let first = stream.next().await.transpose()?;
    let body = spawn_body(first, stream, state.settings.relay.channel_capacity);

    let mut response = Response::new(body);
    *response.status_mut() = status;
    let headers = response.headers_mut();
    for name in MIRRORED_HEADERS {
        if let Some(value) = origin_headers.get(&name) {
            headers.insert(name, value.clone());
        }
    }
    headers.insert(
        header::ACCEPT_RANGES,
        origin_headers
            .get(header::ACCEPT_RANGES)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static("bytes")),
    );
    apply_cache_control(headers, &origin_headers, default_cache_control)?;

    Ok(response)
}

fn apply_cache_control(
    headers: &mut HeaderMap,
    origin_headers: &HeaderMap,
    default: &str,
) -> RelayResult<()> {
    let value = match origin_headers.get(header::CACHE_CONTROL) {
        Some(value) => value.clone(),
        None => HeaderValue::from_str(default)
            .map_err(|e| RelayError::Internal(format!("Invalid cache_control setting: {e}")))?,
    };
    headers.insert(header::CACHE_CONTROL, value);
    Ok(())
}

fn is_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            let mime = value.split(';').next().unwrap_or("").trim();
            mime.eq_ignore_ascii_case("text/html")
                || mime.eq_ignore_ascii_case("application/xhtml+xml")
        })
        .unwrap_or(false)
}

/// 部分内容响应：改写会破坏 Content-Range，只能原样转发
fn is_partial(status: StatusCode, headers: &HeaderMap) -> bool {
    status == StatusCode::PARTIAL_CONTENT || headers.contains_key(header::CONTENT_RANGE)
}

/// 响应体是否经过了压缩等编码
fn is_encoded(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_ENCODING)
        .and_then(|value| value.to_str().ok())
        .map(|value| !value.trim().is_empty() && !value.trim().eq_ignore_ascii_case("identity"))
        .unwrap_or(false)
}
