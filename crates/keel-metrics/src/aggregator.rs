//! Metrics aggregator — running request counters and derived snapshots.
//!
//! Counters are atomics; the response-time window is a mutex-protected
//! ring that keeps only the most recent samples.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::Mutex;
use tracing::warn;

use keel_state::{DeploymentStatus, DeploymentStore};

use crate::probe::{HostProbe, ProbeError};
use crate::types::*;

/// Number of response-time samples kept by default.
pub const DEFAULT_RESPONSE_TIME_WINDOW: usize = 1000;

pub struct MetricsAggregator {
    request_count: AtomicU64,
    error_count: AtomicU64,
    /// Most recent response times in milliseconds, oldest first.
    response_times: Mutex<VecDeque<f64>>,
    window: usize,
    probe: Arc<dyn HostProbe>,
}

impl MetricsAggregator {
    pub fn new(probe: Arc<dyn HostProbe>) -> Self {
        Self::with_window(probe, DEFAULT_RESPONSE_TIME_WINDOW)
    }

    /// Aggregator keeping the latest `window` response times (minimum 1).
    pub fn with_window(probe: Arc<dyn HostProbe>, window: usize) -> Self {
        let window = window.max(1);
        Self {
            request_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            response_times: Mutex::new(VecDeque::with_capacity(window)),
            window,
            probe,
        }
    }

    pub fn record_request(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Append a sample, dropping the oldest once the window is full.
    pub fn record_response_time(&self, ms: f64) {
        let mut samples = self.response_times.lock();
        if samples.len() == self.window {
            samples.pop_front();
        }
        samples.push_back(ms);
    }

    pub fn application_metrics(&self) -> ApplicationMetrics {
        let average_response_time_ms = {
            let samples = self.response_times.lock();
            if samples.is_empty() {
                0.0
            } else {
                samples.iter().sum::<f64>() / samples.len() as f64
            }
        };

        ApplicationMetrics {
            request_count: self.request_count.load(Ordering::Relaxed),
            error_count: self.error_count.load(Ordering::Relaxed),
            average_response_time_ms,
            active_connections: 0,
            timestamp: Utc::now(),
        }
    }

    pub fn deployment_metrics(&self, store: &DeploymentStore) -> DeploymentMetrics {
        DeploymentMetrics {
            total_deployments: store.count() as u64,
            successful_deployments: store.count_by_status(DeploymentStatus::Success) as u64,
            failed_deployments: store.count_by_status(DeploymentStatus::Failed) as u64,
            average_deployment_time_seconds: 0.0,
            timestamp: Utc::now(),
        }
    }

    /// Sample the host probe now.
    pub fn system_metrics(&self) -> Result<SystemMetrics, ProbeError> {
        let usage = self
            .probe
            .sample()
            .inspect_err(|e| warn!(error = %e, "host probe failed"))?
            .clamped();

        Ok(SystemMetrics {
            cpu_usage_percent: usage.cpu_percent,
            memory_usage_percent: usage.memory_percent,
            disk_usage_percent: usage.disk_percent,
            timestamp: Utc::now(),
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }
}
