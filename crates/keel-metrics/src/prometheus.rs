//! Prometheus text exposition format.
//!
//! Renders a metrics report into the text format scraped by Prometheus
//! and compatible agents.

use crate::types::MetricsReport;

fn metric(out: &mut String, name: &str, kind: &str, help: &str, value: String) {
    out.push_str(&format!("# HELP {name} {help}\n"));
    out.push_str(&format!("# TYPE {name} {kind}\n"));
    out.push_str(&format!("{name} {value}\n"));
}

/// Render a metrics report into Prometheus text format.
pub fn render_prometheus(report: &MetricsReport) -> String {
    let app = &report.application;
    let dep = &report.deployment;
    let sys = &report.system;
    let mut out = String::new();

    metric(
        &mut out,
        "keel_requests_total",
        "counter",
        "Total HTTP requests handled.",
        app.request_count.to_string(),
    );
    metric(
        &mut out,
        "keel_errors_total",
        "counter",
        "Total HTTP requests answered with an error status.",
        app.error_count.to_string(),
    );
    metric(
        &mut out,
        "keel_response_time_avg_ms",
        "gauge",
        "Mean response time over the recent sample window in milliseconds.",
        format!("{:.2}", app.average_response_time_ms),
    );
    metric(
        &mut out,
        "keel_active_connections",
        "gauge",
        "Active client connections.",
        app.active_connections.to_string(),
    );

    metric(
        &mut out,
        "keel_deployments_total",
        "gauge",
        "Deployments currently tracked.",
        dep.total_deployments.to_string(),
    );
    metric(
        &mut out,
        "keel_deployments_successful",
        "gauge",
        "Deployments in the success state.",
        dep.successful_deployments.to_string(),
    );
    metric(
        &mut out,
        "keel_deployments_failed",
        "gauge",
        "Deployments in the failed state.",
        dep.failed_deployments.to_string(),
    );
    metric(
        &mut out,
        "keel_deployment_time_avg_seconds",
        "gauge",
        "Mean deployment duration in seconds.",
        format!("{:.2}", dep.average_deployment_time_seconds),
    );

    metric(
        &mut out,
        "keel_cpu_usage_percent",
        "gauge",
        "Host CPU utilisation percentage.",
        format!("{:.2}", sys.cpu_usage_percent),
    );
    metric(
        &mut out,
        "keel_memory_usage_percent",
        "gauge",
        "Host memory utilisation percentage.",
        format!("{:.2}", sys.memory_usage_percent),
    );
    metric(
        &mut out,
        "keel_disk_usage_percent",
        "gauge",
        "Root filesystem utilisation percentage.",
        format!("{:.2}", sys.disk_usage_percent),
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;
    use chrono::Utc;

    fn test_report() -> MetricsReport {
        let now = Utc::now();
        MetricsReport {
            system: SystemMetrics {
                cpu_usage_percent: 12.5,
                memory_usage_percent: 48.0,
                disk_usage_percent: 71.25,
                timestamp: now,
            },
            application: ApplicationMetrics {
                request_count: 1500,
                error_count: 12,
                average_response_time_ms: 4.5,
                active_connections: 0,
                timestamp: now,
            },
            deployment: DeploymentMetrics {
                total_deployments: 25,
                successful_deployments: 20,
                failed_deployments: 3,
                average_deployment_time_seconds: 0.0,
                timestamp: now,
            },
        }
    }

    #[test]
    fn render_includes_every_metric() {
        let output = render_prometheus(&test_report());

        assert!(output.contains("keel_requests_total 1500\n"));
        assert!(output.contains("keel_errors_total 12\n"));
        assert!(output.contains("keel_response_time_avg_ms 4.50\n"));
        assert!(output.contains("keel_active_connections 0\n"));
        assert!(output.contains("keel_deployments_total 25\n"));
        assert!(output.contains("keel_deployments_successful 20\n"));
        assert!(output.contains("keel_deployments_failed 3\n"));
        assert!(output.contains("keel_deployment_time_avg_seconds 0.00\n"));
        assert!(output.contains("keel_cpu_usage_percent 12.50\n"));
        assert!(output.contains("keel_memory_usage_percent 48.00\n"));
        assert!(output.contains("keel_disk_usage_percent 71.25\n"));
    }

    #[test]
    fn counters_are_typed_as_counters() {
        let output = render_prometheus(&test_report());
        assert!(output.contains("# TYPE keel_requests_total counter"));
        assert!(output.contains("# TYPE keel_errors_total counter"));
        assert!(output.contains("# TYPE keel_cpu_usage_percent gauge"));
    }

    #[test]
    fn render_format_is_prometheus_compatible() {
        let output = render_prometheus(&test_report());

        // Every sample line is `name value` with a numeric value.
        for line in output.lines() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (name, value) = line.split_once(' ').expect("sample line");
            assert!(name.starts_with("keel_"), "bad metric name: {line}");
            assert!(value.parse::<f64>().is_ok(), "bad value: {line}");
        }
    }
}
