use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use rookery_shared::types::api::{HealthCheck, HealthResponse};

use crate::AppState;

/// Health check that pings the store and, when configured, the broker.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let mut checks = Vec::with_capacity(2);

    let store = state.store.backend_name();
    checks.push(match state.store.ping() {
        Ok(()) => HealthCheck::healthy(store),
        Err(e) => HealthCheck::unhealthy(store, e.to_string()),
    });

    if let Some(rabbitmq) = &state.rabbitmq {
        checks.push(if rabbitmq.is_connected() {
            HealthCheck::healthy("rabbitmq")
        } else {
            HealthCheck::unhealthy("rabbitmq", "channel disconnected")
        });
    }

    let response = HealthResponse::healthy("rookery-social", env!("CARGO_PKG_VERSION")).with_checks(checks);
    (response.http_status(), Json(response)).into_response()
}

/// Returns Prometheus metrics.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics_handle {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
