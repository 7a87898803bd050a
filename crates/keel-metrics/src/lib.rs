//! keel-metrics — operational metrics for Keel.
//!
//! Maintains running request/error counters and a rolling window of
//! response times, and derives point-in-time snapshots from them, from
//! the deployment store, and from the host.
//!
//! # Architecture
//!
//! ```text
//! MetricsAggregator
//!   ├── record_request() / record_error() / record_response_time()
//!   ├── application_metrics() → ApplicationMetrics
//!   ├── deployment_metrics(&DeploymentStore) → DeploymentMetrics
//!   └── system_metrics() → SystemMetrics (via HostProbe)
//!
//! Prometheus exposition
//!   └── render_prometheus() → text/plain for the scrape endpoint
//! ```

pub mod aggregator;
pub mod probe;
pub mod prometheus;
pub mod types;

pub use aggregator::{DEFAULT_RESPONSE_TIME_WINDOW, MetricsAggregator};
pub use probe::{HostProbe, HostUsage, ProbeError, ProcfsProbe, StaticProbe};
pub use prometheus::render_prometheus;
pub use types::*;
