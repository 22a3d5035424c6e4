//! 服务信息类处理器：首页、健康检查、监控指标

use crate::headers::public_base;
use crate::state::RelayState;
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, Uri, header},
    response::IntoResponse,
};
use serde_json::{Value, json};

/// 服务首页：返回可用接口列表
pub async fn index(State(state): State<RelayState>, headers: HeaderMap, uri: Uri) -> Json<Value> {
    let base_url =
        public_base(state.settings.public_url.as_deref(), &headers, &uri).unwrap_or_default();
    Json(json!({
        "status": "ok",
        "message": "veilink link relay is running",
        "baseUrl": base_url,
        "endpoints": {
            "shorten": "POST /api/shorten",
            "page": "GET /r/{token}",
            "relay": "GET /p/{token}",
            "health": "GET /health",
            "metrics": "GET /metrics",
        }
    }))
}

/// 健康检查
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "veilink",
        "timestamp": chrono::Utc::now().timestamp(),
    }))
}

/// Prometheus 指标
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        veilink_common::metrics::export_metrics(),
    )
}
