//! keel-lifecycle — the single entry point for changing deployments.
//!
//! `DeploymentService` creates deployments and drives them through
//! `pending → in_progress → success | failed`, persisting every change
//! through the `DeploymentStore` and announcing it via a `Notifier`.

pub mod error;
pub mod notifier;
pub mod service;

pub use error::{LifecycleError, LifecycleResult};
pub use notifier::{LogNotifier, Notifier, Severity};
pub use service::{DEFAULT_FAILURE_MESSAGE, DeploymentService, Page};
