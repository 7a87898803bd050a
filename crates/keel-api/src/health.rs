//! Service info and Kubernetes-style health probes.
//!
//! These endpoints sit outside the API prefix and return plain JSON
//! without the response envelope.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::ApiState;

/// GET /
pub async fn root(State(state): State<ApiState>) -> Json<Value> {
    let s = &state.settings;
    Json(json!({
        "message": format!("Welcome to {}", s.app_name),
        "version": s.app_version,
        "environment": s.environment,
        "health": "/health",
        "api": s.api_prefix,
    }))
}

/// GET /version
pub async fn version(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({
        "app_name": state.settings.app_name,
        "version": state.settings.app_version,
    }))
}

/// GET /health
pub async fn health(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": state.settings.app_version,
        "environment": state.settings.environment,
    }))
}

/// GET /health/live
pub async fn liveness() -> Json<Value> {
    Json(json!({
        "status": "alive",
        "checks": { "application": "ok" },
    }))
}

/// GET /health/ready
pub async fn readiness(State(state): State<ApiState>) -> Json<Value> {
    // Touching the store proves its lock is reachable.
    let tracked = state.deployments.store().count();
    Json(json!({
        "status": "ready",
        "checks": {
            "application": "ok",
            "deployment_store": "ok",
        },
        "deployments": tracked,
    }))
}

/// GET /health/startup
pub async fn startup() -> Json<Value> {
    Json(json!({
        "status": "started",
        "checks": { "initialization": "complete" },
    }))
}
