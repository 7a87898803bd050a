//! Deployment event notifications.
//!
//! Delivery is fire-and-forget: a notifier can never fail the lifecycle
//! operation that triggered it. `LogNotifier` only emits tracing events;
//! integrations with chat or paging systems implement [`Notifier`].

use std::fmt;

use tracing::{info, warn};

use keel_state::Deployment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        })
    }
}

pub trait Notifier: Send + Sync {
    fn deployment_started(&self, deployment: &Deployment);

    fn deployment_completed(&self, deployment: &Deployment, success: bool);

    fn alert(&self, message: &str, severity: Severity);
}

/// Notifier that writes every event to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn deployment_started(&self, deployment: &Deployment) {
        info!(
            deployment = %deployment.id,
            application = %deployment.application,
            environment = %deployment.environment,
            "notify: deployment started"
        );
    }

    fn deployment_completed(&self, deployment: &Deployment, success: bool) {
        let outcome = if success { "succeeded" } else { "failed" };
        info!(
            deployment = %deployment.id,
            application = %deployment.application,
            environment = %deployment.environment,
            outcome,
            "notify: deployment completed"
        );
    }

    fn alert(&self, message: &str, severity: Severity) {
        warn!(%severity, "alert: {message}");
    }
}
