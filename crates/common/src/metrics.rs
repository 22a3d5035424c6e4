//! Prometheus 监控指标模块
//!
//! 提供全局指标收集和导出功能

use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Once;

static METRICS_INIT: Once = Once::new();

lazy_static! {
    /// 全局 Prometheus Registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ========== 发放 ==========

    /// 短链接发放次数
    pub static ref LINKS_ISSUED: IntCounterVec = IntCounterVec::new(
        Opts::new("links_issued_total", "Total number of link issue requests")
            .namespace("veilink"),
        &["status"]
    ).expect("valid metric definition");

    // ========== 解析 ==========

    /// 令牌校验结果（按入口分组）
    pub static ref TOKEN_CHECKS: IntCounterVec = IntCounterVec::new(
        Opts::new("token_checks_total", "Total number of token checks")
            .namespace("veilink"),
        &["endpoint", "outcome"]
    ).expect("valid metric definition");

    // ========== 中继 ==========

    /// 源站响应（按状态码类别分组，传输失败记为 error）
    pub static ref ORIGIN_RESPONSES: IntCounterVec = IntCounterVec::new(
        Opts::new("origin_responses_total", "Total number of origin responses")
            .namespace("veilink"),
        &["class"]
    ).expect("valid metric definition");

    /// 中继转发的字节数
    pub static ref BYTES_RELAYED: IntCounter = IntCounter::new(
        "veilink_bytes_relayed_total",
        "Total bytes relayed to clients"
    ).expect("valid metric definition");

    /// 正在进行的流式转发数
    pub static ref ACTIVE_STREAMS: IntGauge = IntGauge::new(
        "veilink_active_streams",
        "Number of active relay streams"
    ).expect("valid metric definition");

    /// 流式转发结束次数（按结束方式分组）
    pub static ref STREAMS_FINISHED: IntCounterVec = IntCounterVec::new(
        Opts::new("streams_finished_total", "Total number of finished relay streams")
            .namespace("veilink"),
        &["outcome"]
    ).expect("valid metric definition");
}

/// 注册所有指标到全局 Registry
///
/// 幂等：只有第一次调用会真正注册。
pub fn register_metrics() -> Result<(), prometheus::Error> {
    let mut result = Ok(());

    METRICS_INIT.call_once(|| {
        let register_result = (|| {
            REGISTRY.register(Box::new(LINKS_ISSUED.clone()))?;
            REGISTRY.register(Box::new(TOKEN_CHECKS.clone()))?;

            REGISTRY.register(Box::new(ORIGIN_RESPONSES.clone()))?;
            REGISTRY.register(Box::new(BYTES_RELAYED.clone()))?;
            REGISTRY.register(Box::new(ACTIVE_STREAMS.clone()))?;
            REGISTRY.register(Box::new(STREAMS_FINISHED.clone()))?;

            Ok::<(), prometheus::Error>(())
        })();

        if let Err(e) = register_result {
            result = Err(e);
        }
    });

    result
}

/// 源站状态码类别标签
pub fn status_class(status: u16) -> &'static str {
    match status {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

/// 导出 Prometheus 格式的指标
pub fn export_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
        return String::new();
    }

    String::from_utf8_lossy(&buffer).into_owned()
}
