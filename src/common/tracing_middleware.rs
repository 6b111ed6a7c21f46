//! Structured request logging for the coordinator and node routers
//!
//! Every request carries an `X-Request-ID` (the caller's when present) that
//! is echoed back on the response and attached to the request span.

use axum::{
    body::Body,
    http::{HeaderValue, Request, Response},
    middleware::Next,
};
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

fn request_id_of(request: &Request<Body>) -> String {
    request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

pub async fn request_tracing_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let start = Instant::now();
    let request_id = request_id_of(&request);
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let span = tracing::info_span!("http_request", request_id = %request_id, %method, %path);
    let mut response = next.run(request).instrument(span).await;

    let status = response.status().as_u16();
    let elapsed_ms = start.elapsed().as_millis();
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    // Chunk traffic is high volume, so successes stay at debug
    if response.status().is_success() {
        tracing::debug!(%request_id, %method, %path, status, elapsed_ms, "request completed");
    } else {
        tracing::warn!(%request_id, %method, %path, status, elapsed_ms, "request failed");
    }

    response
}
