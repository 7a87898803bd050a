//! Per-request logging and metrics recording.

use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::{info, warn};

use crate::ApiState;

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Assigns a UUID `x-request-id` to requests that arrive without one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Copies the request's `x-request-id` onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// Log every request and, when metrics are enabled, count it and its latency.
///
/// Any 4xx or 5xx response counts as an error.
pub async fn track_requests(State(state): State<ApiState>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let started = Instant::now();
    info!(%request_id, %method, %path, "request started");

    let response = next.run(request).await;

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    let status = response.status();
    if state.settings.enable_metrics {
        state.metrics.record_request();
        state.metrics.record_response_time(elapsed_ms);
        if status.is_client_error() || status.is_server_error() {
            state.metrics.record_error();
        }
    }
    info!(
        %request_id,
        %method,
        %path,
        status = status.as_u16(),
        duration_ms = elapsed_ms,
        "request completed"
    );
    response
}

/// CORS policy for the configured origins. `*` allows any origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|_| warn!(%origin, "ignoring invalid CORS origin"))
                .ok()
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}
