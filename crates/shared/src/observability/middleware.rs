//! HTTP 中间件
//!
//! 请求追踪、HTTP 指标和请求 ID 注入。

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use tracing::{Instrument, info_span};

use super::metrics;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// HTTP 请求追踪和指标中间件
///
/// 指标的 path 标签使用路由模板（如 `/api/admin/notifications/{id}/send`），
/// 避免每个通知 ID 产生一条独立的时间序列。
///
/// ```ignore
/// let app = Router::new()
///     .nest("/api/admin", routes::api_routes())
///     .layer(middleware::from_fn(http_tracing))
///     .layer(middleware::from_fn(request_id));
/// ```
pub async fn http_tracing(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let route = route_label(&request);
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();

    let span = info_span!(
        "http_request",
        method = %method,
        route = %route,
        request_id = %request_id,
        status = tracing::field::Empty,
        latency_ms = tracing::field::Empty,
    );

    let start = Instant::now();
    let response = next.run(request).instrument(span.clone()).await;
    let latency = start.elapsed();
    let status = response.status().as_u16();

    span.record("status", status);
    span.record("latency_ms", latency.as_millis() as i64);

    metrics::record_http_request(&method, &route, status, latency.as_secs_f64());

    response
}

/// 请求 ID 中间件
///
/// 沿用上游传入的 x-request-id，没有则生成新的，并回写到响应头。
/// 需要放在 `http_tracing` 外层，追踪 span 才能带上请求 ID。
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    request.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// 指标使用的路由标签
///
/// 优先取匹配到的路由模板；未匹配（404）时把纯数字路径段折叠为 `{id}`。
fn route_label(request: &Request) -> String {
    if let Some(matched) = request.extensions().get::<MatchedPath>() {
        return matched.as_str().to_string();
    }
    normalize_path(request.uri().path())
}

fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// 请求 ID 包装类型
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_normalize_numeric_segments() {
        assert_eq!(
            normalize_path("/api/admin/notifications/42/send"),
            "/api/admin/notifications/{id}/send"
        );
        assert_eq!(
            normalize_path("/api/admin/notifications"),
            "/api/admin/notifications"
        );
        assert_eq!(normalize_path("/"), "/");
    }

    #[test]
    fn test_route_label_falls_back_to_normalized_path() {
        let request = axum::http::Request::builder()
            .uri("/api/admin/notifications/7/delivery-logs?category=admin")
            .body(Body::empty())
            .unwrap();

        assert_eq!(
            route_label(&request),
            "/api/admin/notifications/{id}/delivery-logs"
        );
    }

    #[test]
    fn test_request_id_as_str() {
        let id = RequestId("req-123".to_string());
        assert_eq!(id.as_str(), "req-123");
    }
}
