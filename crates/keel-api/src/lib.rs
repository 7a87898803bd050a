//! keel-api — REST API for Keel.
//!
//! Axum route handlers for tracking deployments, reading metrics and
//! answering health probes.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/` | Service info |
//! | GET | `/version` | Name and version |
//! | GET | `/health`, `/health/{live,ready,startup}` | Health probes |
//! | GET | `/api/v1/deployments` | List deployments (paged) |
//! | POST | `/api/v1/deployments` | Create a deployment |
//! | GET | `/api/v1/deployments/{id}` | Get deployment details |
//! | POST | `/api/v1/deployments/{id}/start` | Mark in progress |
//! | POST | `/api/v1/deployments/{id}/complete` | Mark success or failure |
//! | GET | `/api/v1/metrics` | System, application and deployment metrics |
//! | GET | `/api/v1/metrics/prometheus` | Prometheus exposition |
//!
//! Every response carries an `x-request-id` header, echoed from the request
//! or freshly generated, which also tags the request logs.
//!
//! The `/api/v1` prefix is taken from `Settings::api_prefix`. Metrics
//! routes are only mounted when `Settings::enable_metrics` is set.

pub mod error;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod response;
pub mod validation;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};

use keel_cache::TtlCache;
use keel_core::Settings;
use keel_lifecycle::DeploymentService;
use keel_metrics::{HostProbe, MetricsAggregator, SystemMetrics};

pub use error::ApiError;
pub use response::ApiResponse;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub settings: Arc<Settings>,
    pub deployments: DeploymentService,
    pub metrics: Arc<MetricsAggregator>,
    /// Recent host probe results, keyed by [`handlers::SYSTEM_METRICS_KEY`].
    pub system_cache: TtlCache<String, SystemMetrics>,
}

impl ApiState {
    pub fn new(
        settings: Settings,
        deployments: DeploymentService,
        probe: Arc<dyn HostProbe>,
    ) -> Self {
        let metrics = MetricsAggregator::with_window(probe, settings.response_time_window);
        let system_cache =
            TtlCache::with_default_ttl(Duration::from_secs(settings.metrics_cache_ttl_secs));
        Self {
            settings: Arc::new(settings),
            deployments,
            metrics: Arc::new(metrics),
            system_cache,
        }
    }
}

/// Build the complete router: health probes, the prefixed API and middleware.
pub fn build_router(state: ApiState) -> Router {
    let mut api_routes = Router::new()
        .route(
            "/deployments",
            get(handlers::list_deployments).post(handlers::create_deployment),
        )
        .route("/deployments/{id}", get(handlers::get_deployment))
        .route("/deployments/{id}/start", post(handlers::start_deployment))
        .route(
            "/deployments/{id}/complete",
            post(handlers::complete_deployment),
        );

    if state.settings.enable_metrics {
        api_routes = api_routes
            .route("/metrics", get(handlers::get_metrics))
            .route("/metrics/prometheus", get(handlers::prometheus_metrics));
    }

    Router::new()
        .route("/", get(health::root))
        .route("/version", get(health::version))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/health/startup", get(health::startup))
        .nest(&state.settings.api_prefix, api_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::track_requests,
        ))
        // Later layers wrap earlier ones, so the id exists before it is propagated or logged.
        .layer(middleware::propagate_request_id_layer())
        .layer(middleware::set_request_id_layer())
        .layer(middleware::cors_layer(&state.settings.cors_origins))
        .with_state(state)
}
