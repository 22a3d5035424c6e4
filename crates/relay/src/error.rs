//! Relay 服务错误定义

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use token::TokenError;

/// 源站错误时返回给客户端的正文
pub const ORIGIN_ERROR_BODY: &str = "Error fetching original content";

/// 过期链接的正文
pub const EXPIRED_BODY: &str = "Link expired";

/// Relay 服务错误类型
#[derive(Error, Debug)]
pub enum RelayError {
    /// 请求参数校验失败
    #[error("{0}")]
    Validation(String),

    /// 令牌解码失败或已过期
    #[error(transparent)]
    Token(#[from] TokenError),

    /// 源站返回非成功状态
    #[error("Origin responded with status {0}")]
    OriginStatus(StatusCode),

    /// 源站请求失败（响应头之前）
    #[error("Origin request failed: {0}")]
    Origin(#[from] reqwest::Error),

    /// 内部服务器错误
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            RelayError::Validation(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            RelayError::Token(TokenError::Expired { .. }) => {
                plain_text(StatusCode::GONE, EXPIRED_BODY)
            }
            RelayError::Token(TokenError::Decode) => {
                plain_text(StatusCode::BAD_REQUEST, TokenError::Decode.to_string())
            }
            RelayError::OriginStatus(status) => plain_text(status, ORIGIN_ERROR_BODY),
            RelayError::Token(ref e) => {
                // 不向客户端暴露内部错误详情
                tracing::error!("Token error: {}", e);
                plain_text(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            RelayError::Origin(ref e) => {
                tracing::warn!("Origin fetch failed: {}", e);
                plain_text(StatusCode::INTERNAL_SERVER_ERROR, ORIGIN_ERROR_BODY)
            }
            RelayError::Internal(ref e) => {
                tracing::error!("Internal error: {}", e);
                plain_text(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

fn plain_text(status: StatusCode, body: impl Into<String>) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body.into(),
    )
        .into_response()
}

/// Relay 结果类型别名
pub type RelayResult<T> = Result<T, RelayError>;
