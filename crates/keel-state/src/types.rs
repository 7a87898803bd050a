//! Domain types for deployment tracking.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a deployment.
pub type DeploymentId = String;

/// Actor recorded when the caller doesn't name one.
pub const DEFAULT_DEPLOYED_BY: &str = "system";

// ── Status ────────────────────────────────────────────────────────

/// Lifecycle status of a deployment.
///
/// `Pending` is the only initial state. `Success`, `Failed` and
/// `RolledBack` are terminal: nothing in Keel moves a record out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Pending,
    InProgress,
    Success,
    Failed,
    RolledBack,
}

impl DeploymentStatus {
    pub const ALL: [DeploymentStatus; 5] = [
        DeploymentStatus::Pending,
        DeploymentStatus::InProgress,
        DeploymentStatus::Success,
        DeploymentStatus::Failed,
        DeploymentStatus::RolledBack,
    ];

    pub fn is_terminal(&self) -> bool {
        match self {
            DeploymentStatus::Pending | DeploymentStatus::InProgress => false,
            DeploymentStatus::Success | DeploymentStatus::Failed | DeploymentStatus::RolledBack => {
                true
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::Pending => "pending",
            DeploymentStatus::InProgress => "in_progress",
            DeploymentStatus::Success => "success",
            DeploymentStatus::Failed => "failed",
            DeploymentStatus::RolledBack => "rolled_back",
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Deployment ────────────────────────────────────────────────────

/// One attempt to roll out an application version to an environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    /// Empty until the store assigns one.
    pub id: DeploymentId,
    pub application: String,
    pub version: String,
    /// Environment name; checked by the caller, not here.
    pub environment: String,
    pub status: DeploymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set only once the deployment reaches a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
    /// Set only while `status == Failed`.
    pub error_message: Option<String>,
    pub deployed_by: String,
}

impl Deployment {
    /// A fresh `Pending` deployment with no id yet.
    ///
    /// Timestamps are provisional; [`DeploymentStore::create`](crate::DeploymentStore::create)
    /// overwrites them.
    pub fn new(
        application: impl Into<String>,
        version: impl Into<String>,
        environment: impl Into<String>,
        deployed_by: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            application: application.into(),
            version: version.into(),
            environment: environment.into(),
            status: DeploymentStatus::Pending,
            created_at: now,
            updated_at: now,
            completed_at: None,
            error_message: None,
            deployed_by: deployed_by.unwrap_or_else(|| DEFAULT_DEPLOYED_BY.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
