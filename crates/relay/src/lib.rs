//! Link Relay 服务
//!
//! 发放加密的限时短链接，并在链接有效期内把源站内容流式中继给客户端：
//!
//! - `POST /api/shorten`：发放短链接
//! - `GET /r/{token}`：跳转页（内嵌中继帧 + 倒计时）
//! - `GET /p/{token}`：流式中继，支持 Range
//!
//! 服务无状态，一个链接所需的全部信息都在令牌里。

pub mod error;
pub mod handlers;
pub mod headers;
pub mod issue;
pub mod page;
pub mod proxy;
pub mod pump;
pub mod rewrite;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};

pub use error::{RelayError, RelayResult};
pub use headers::ForwardedHeader;
pub use issue::{MAX_EXPIRY_SECONDS, ShortenRequest, ShortenResponse};
pub use state::{RelaySettings, RelayState, create_relay_state};

/// 创建 Relay 路由
pub fn create_router(state: RelayState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/api/shorten", post(issue::shorten))
        .route("/r/{token}", get(page::redirect_page))
        .route("/p/{token}", get(proxy::relay))
        .with_state(state)
}
