//! Metrics snapshots. Immutable values stamped with the time they were taken.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Host utilisation, each value a percentage in `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub cpu_usage_percent: f64,
    pub memory_usage_percent: f64,
    pub disk_usage_percent: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationMetrics {
    pub request_count: u64,
    pub error_count: u64,
    /// Mean of the current response-time window; 0.0 when empty.
    pub average_response_time_ms: f64,
    /// Not tracked; always 0.
    pub active_connections: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentMetrics {
    pub total_deployments: u64,
    pub successful_deployments: u64,
    pub failed_deployments: u64,
    /// Not derived from start/complete times; always 0.0.
    pub average_deployment_time_seconds: f64,
    pub timestamp: DateTime<Utc>,
}

/// The three snapshots served together by the metrics endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub system: SystemMetrics,
    pub application: ApplicationMetrics,
    pub deployment: DeploymentMetrics,
}
