//! REST API handlers.
//!
//! Handlers validate input, delegate to `DeploymentService` or the metrics
//! aggregator, and wrap results in the [`ApiResponse`] envelope.

use std::time::Duration;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use serde::Serialize;

use keel_metrics::MetricsReport;
use keel_state::Deployment;

use crate::ApiState;
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::validation::{CompleteQuery, CreateDeploymentRequest, ListQuery};

/// Cache key for the host probe result.
pub const SYSTEM_METRICS_KEY: &str = "system";

#[derive(Debug, Serialize)]
pub struct DeploymentList {
    pub deployments: Vec<Deployment>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

// ── Deployments ────────────────────────────────────────────────

/// POST /api/v1/deployments
pub async fn create_deployment(
    State(state): State<ApiState>,
    payload: Result<Json<CreateDeploymentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    let valid = request.validate()?;
    let deployment = state.deployments.create_deployment(
        &valid.application,
        &valid.version,
        valid.environment.as_str(),
        valid.deployed_by,
    )?;
    Ok((StatusCode::CREATED, ApiResponse::ok(deployment)))
}

/// GET /api/v1/deployments?page=&page_size=
pub async fn list_deployments(
    State(state): State<ApiState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::Validation(e.body_text()))?;
    let (page, page_size) = query.validate()?;
    let result = state.deployments.list_deployments(page, page_size);
    Ok(ApiResponse::ok(DeploymentList {
        deployments: result.items,
        total: result.total,
        page,
        page_size,
    }))
}

/// GET /api/v1/deployments/{id}
pub async fn get_deployment(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(ApiResponse::ok(state.deployments.get_deployment(&id)?))
}

/// POST /api/v1/deployments/{id}/start
pub async fn start_deployment(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(ApiResponse::ok(state.deployments.start_deployment(&id)?))
}

/// POST /api/v1/deployments/{id}/complete?success=&error=
pub async fn complete_deployment(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    query: Result<Query<CompleteQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::Validation(e.body_text()))?;
    let success = query.success();
    let deployment = state
        .deployments
        .complete_deployment(&id, success, query.error)?;
    Ok(ApiResponse::ok(deployment))
}

// ── Metrics ────────────────────────────────────────────────────

/// Assemble a full report. Host samples are served from the cache while fresh.
pub fn metrics_report(state: &ApiState) -> Result<MetricsReport, ApiError> {
    let ttl = Duration::from_secs(state.settings.metrics_cache_ttl_secs);
    let system = state
        .system_cache
        .try_get_or_insert_with(SYSTEM_METRICS_KEY.to_string(), ttl, || {
            state.metrics.system_metrics()
        })?;

    Ok(MetricsReport {
        system,
        application: state.metrics.application_metrics(),
        deployment: state.metrics.deployment_metrics(state.deployments.store()),
    })
}

/// GET /api/v1/metrics
pub async fn get_metrics(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    Ok(ApiResponse::ok(metrics_report(&state)?))
}

/// GET /api/v1/metrics/prometheus
pub async fn prometheus_metrics(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let body = keel_metrics::render_prometheus(&metrics_report(&state)?);
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    ))
}
