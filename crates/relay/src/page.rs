//! Redirect Page
//!
//! `GET /r/{token}`：令牌有效时返回一个内嵌 `/p/{token}` 的外壳页面，附带倒计时；
//! 否则返回过期页或无效页。源站地址不会出现在任何输出里。

use crate::state::RelayState;
use axum::{
    extract::{Path, State},
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use token::{TokenError, check, unix_now};
use tracing::{debug, warn};
use veilink_common::metrics::TOKEN_CHECKS;

const SECURITY_HEADERS: [(HeaderName, &str); 5] = [
    (header::X_FRAME_OPTIONS, "DENY"),
    (header::CONTENT_SECURITY_POLICY, "frame-ancestors 'none'"),
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::REFERRER_POLICY, "no-referrer"),
    (header::CACHE_CONTROL, "no-store"),
];

/// 渲染跳转页
pub async fn redirect_page(
    State(state): State<RelayState>,
    Path(token): Path<String>,
) -> Response {
    let now = unix_now();
    let (status, html, outcome) = match check(&state.codec, &token, now) {
        Ok(payload) => (
            StatusCode::OK,
            shell_page(&token, payload.remaining_secs(now)),
            "valid",
        ),
        Err(TokenError::Expired { exp }) => {
            debug!("Expired link requested: exp={}", exp);
            (StatusCode::GONE, expired_page(exp), "expired")
        }
        Err(TokenError::Decode) => (StatusCode::BAD_REQUEST, invalid_page(), "invalid"),
        Err(e) => {
            warn!("Unexpected token error on redirect page: {}", e);
            (StatusCode::BAD_REQUEST, invalid_page(), "invalid")
        }
    };

    TOKEN_CHECKS.with_label_values(&["page", outcome]).inc();
    with_security_headers(status, html)
}

fn with_security_headers(status: StatusCode, html: String) -> Response {
    let mut response = (status, Html(html)).into_response();
    let headers = response.headers_mut();
    for (name, value) in SECURITY_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }
    response
}

/// 人类可读的过期时间（UTC）
fn human_expiry(exp: u64) -> String {
    i64::try_from(exp)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("{exp} (unix time)"))
}

/// 剩余时间的文字描述，如 `1h 02m 03s`
fn human_remaining(secs: u64) -> String {
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<meta name="robots" content="noindex">
<title>{title}</title>
<style>
html, body {{ margin: 0; height: 100%; font-family: system-ui, sans-serif; background: #111; color: #eee; }}
.bar {{ padding: 6px 12px; font-size: 13px; background: #1d1d1d; }}
.frame {{ border: 0; width: 100%; height: calc(100% - 30px); }}
.notice {{ max-width: 480px; margin: 15vh auto; text-align: center; }}
.notice h1 {{ font-size: 22px; }}
</style>
</head>
<body>
{body}
</body>
</html>
"#
    )
}

fn shell_page(token: &str, remaining: u64) -> String {
    let src = format!("/p/{}", escape_html(&urlencoding::encode(token)));
    let body = format!(
        r#"<div class="bar">Link expires in <span id="countdown" data-remaining="{remaining}">{text}</span></div>
<iframe class="frame" src="{src}" allow="fullscreen; autoplay" referrerpolicy="no-referrer"></iframe>
<script>
(function () {{
  var el = document.getElementById("countdown");
  var left = parseInt(el.getAttribute("data-remaining"), 10);
  function fmt(s) {{
    var h = Math.floor(s / 3600), m = Math.floor((s % 3600) / 60), r = s % 60;
    var pad = function (n) {{ return n < 10 ? "0" + n : "" + n; }};
    return h > 0 ? h + "h " + pad(m) + "m " + pad(r) + "s" : m > 0 ? m + "m " + pad(r) + "s" : r + "s";
  }}
  var timer = setInterval(function () {{
    left -= 1;
    if (left <= 0) {{ clearInterval(timer); el.textContent = "expired"; return; }}
    el.textContent = fmt(left);
  }}, 1000);
}})();
</script>"#,
        text = human_remaining(remaining),
    );
    layout("Shared link", &body)
}

fn expired_page(exp: u64) -> String {
    let body = format!(
        r#"<div class="notice">
<h1>This link has expired</h1>
<p>It stopped working at {}.</p>
<p>Ask the sender for a new link.</p>
</div>"#,
        escape_html(&human_expiry(exp))
    );
    layout("Link expired", &body)
}

fn invalid_page() -> String {
    layout(
        "Invalid link",
        r#"<div class="notice">
<h1>This link is invalid</h1>
<p>The link is damaged or was not issued by this service.</p>
</div>"#,
    )
}
