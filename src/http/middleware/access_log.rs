//! Structured access logging.
//!
//! Emits one event per request after the response is produced, so the final
//! status (including timeouts and fallback 404s) is what gets logged.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::http::error::ErrorMessage;
use crate::http::request::X_REQUEST_ID;
use crate::observability::metrics;

pub async fn access_log(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let response = next.run(request).await;

    let status = response.status();
    let error = response
        .extensions()
        .get::<ErrorMessage>()
        .map(|e| e.0.as_str())
        .unwrap_or("");

    tracing::info!(
        target: "linkgate::access",
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = status.as_u16(),
        error = error,
        latency_ms = start.elapsed().as_millis() as u64,
        "request"
    );
    metrics::record_request(method.as_str(), status.as_u16(), start);

    response
}
