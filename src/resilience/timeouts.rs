//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound every handler dispatch by the configured request timeout
//! - Cancel the handler cleanly on expiry
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; dropping the handler future cancels it
//! - Timed-out requests return 503 with a JSON `timeout` error

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Duration;

use crate::http::error::ApiError;

/// Middleware that aborts the inner handler after `limit`.
///
/// Install with `axum::middleware::from_fn_with_state(limit, enforce_timeout)`.
pub async fn enforce_timeout(
    State(limit): State<Duration>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(
                method = %method,
                path = %path,
                timeout_ms = limit.as_millis() as u64,
                "Request timed out"
            );
            ApiError::Timeout.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::error::ErrorMessage;
    use axum::{http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn app(limit: Duration) -> Router {
        Router::new()
            .route("/fast", get(|| async { "ok" }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    "late"
                }),
            )
            .layer(middleware::from_fn_with_state(limit, enforce_timeout))
    }

    async fn status_of(router: Router, uri: &str) -> StatusCode {
        router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn fast_handler_passes_through() {
        assert_eq!(status_of(app(Duration::from_secs(1)), "/fast").await, StatusCode::OK);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_handler_times_out() {
        assert_eq!(
            status_of(app(Duration::from_secs(30)), "/slow").await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_carries_json_body_and_log_message() {
        let response = app(Duration::from_secs(30))
            .oneshot(Request::builder().uri("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(
            response.extensions().get::<ErrorMessage>().map(|m| m.0.as_str()),
            Some("Request timeout")
        );

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "timeout");
        assert_eq!(body["message"], "Request timeout");
    }
}
