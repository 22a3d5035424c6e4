use axum::http::Request;
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    trace::{MakeSpan, TraceLayer},
};
use tracing::{Span, info_span};

pub type HttpTraceLayer = TraceLayer<SharedClassifier<ServerErrorsAsFailures>, HttpMakeSpan>;

pub fn http_trace_layer() -> HttpTraceLayer {
    TraceLayer::new_for_http().make_span_with(HttpMakeSpan)
}

/// 令牌路径前缀；span 中只记录路由模板，不记录令牌本身
const TOKEN_ROUTES: [&str; 2] = ["/r/", "/p/"];

#[derive(Clone, Debug, Default)]
pub struct HttpMakeSpan;

impl<B> MakeSpan<B> for HttpMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        info_span!(
            "http.request",
            method = %request.method(),
            path = %redact_path(request.uri().path()),
            version = ?request.version()
        )
    }
}

fn redact_path(path: &str) -> String {
    for prefix in TOKEN_ROUTES {
        if let Some(rest) = path.strip_prefix(prefix)
            && !rest.is_empty()
        {
            return format!("{prefix}{{token}}");
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_path() {
        assert_eq!(redact_path("/r/abc.def"), "/r/{token}");
        assert_eq!(redact_path("/p/abc.def"), "/p/{token}");
        assert_eq!(redact_path("/api/shorten"), "/api/shorten");
        assert_eq!(redact_path("/r/"), "/r/");
    }
}
