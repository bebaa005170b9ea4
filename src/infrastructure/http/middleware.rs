//! HTTP Middleware
//!
//! 请求耗时与 HTTP 错误状态日志

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::{Duration, Instant};

/// 超过该耗时的请求记一条 warn（故事生成是同步请求，通常需要数十秒）
const SLOW_REQUEST: Duration = Duration::from_secs(30);

/// HTTP 状态码错误日志中间件
///
/// 4xx/5xx 和慢请求记录日志；业务错误（errno != 0）在 ApiError::into_response() 中记录
pub async fn error_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            uri = %uri,
            status = status.as_u16(),
            elapsed_ms = elapsed_ms,
            "HTTP server error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            method = %method,
            uri = %uri,
            status = status.as_u16(),
            elapsed_ms = elapsed_ms,
            "HTTP client error"
        );
    } else if started.elapsed() > SLOW_REQUEST {
        tracing::warn!(method = %method, uri = %uri, elapsed_ms = elapsed_ms, "Slow request");
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        routing::{get, post},
        Router,
    };
    use tower::util::ServiceExt;

    fn create_test_router() -> Router {
        Router::new()
            .route("/api/ping", get(|| async { "pong" }))
            .route("/api/story/create", post(|| async { StatusCode::UNPROCESSABLE_ENTITY }))
            .route("/api/story/list", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
            .layer(axum::middleware::from_fn(error_logging_middleware))
    }

    async fn status_of(method: &str, uri: &str) -> StatusCode {
        let request = HttpRequest::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        create_test_router().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_responses_pass_through_unchanged() {
        assert_eq!(status_of("GET", "/api/ping").await, StatusCode::OK);
        assert_eq!(status_of("POST", "/api/story/create").await, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_of("GET", "/api/story/list").await, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_of("GET", "/api/missing").await, StatusCode::NOT_FOUND);
    }
}
