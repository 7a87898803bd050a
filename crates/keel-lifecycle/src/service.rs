//! DeploymentService — drives deployments through their status machine.
//!
//! Transitions are permissive: `start` and `complete` do not
//! check the current status, so starting twice or completing a pending
//! deployment is accepted. Such moves are logged at `warn` level.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use keel_state::{Deployment, DeploymentStatus, DeploymentStore};

use crate::error::LifecycleResult;
use crate::notifier::{LogNotifier, Notifier, Severity};

/// Error message recorded when a deployment fails without one.
pub const DEFAULT_FAILURE_MESSAGE: &str = "deployment failed";

/// One page of deployments plus the total count across all pages.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Deployment>,
    pub total: usize,
}

#[derive(Clone)]
pub struct DeploymentService {
    store: DeploymentStore,
    notifier: Arc<dyn Notifier>,
}

impl DeploymentService {
    pub fn new(store: DeploymentStore) -> Self {
        Self::with_notifier(store, Arc::new(LogNotifier))
    }

    pub fn with_notifier(store: DeploymentStore, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    pub fn store(&self) -> &DeploymentStore {
        &self.store
    }

    /// Create a `Pending` deployment. Inputs are assumed already validated.
    pub fn create_deployment(
        &self,
        application: &str,
        version: &str,
        environment: &str,
        deployed_by: Option<String>,
    ) -> LifecycleResult<Deployment> {
        let deployment = self.store.create(Deployment::new(
            application,
            version,
            environment,
            deployed_by,
        ))?;
        info!(
            deployment = %deployment.id,
            application = %deployment.application,
            version = %deployment.version,
            environment = %deployment.environment,
            "deployment created"
        );
        Ok(deployment)
    }

    /// Move a deployment to `InProgress`.
    ///
    /// Restarting a finished deployment clears its `completed_at` and
    /// `error_message`, which only belong to terminal records.
    pub fn start_deployment(&self, id: &str) -> LifecycleResult<Deployment> {
        let deployment = self.store.modify(id, |deployment| {
            match deployment.status {
                DeploymentStatus::Pending => {}
                DeploymentStatus::InProgress
                | DeploymentStatus::Success
                | DeploymentStatus::Failed
                | DeploymentStatus::RolledBack => {
                    warn!(deployment = %id, from = %deployment.status, "starting deployment that is not pending");
                }
            }

            deployment.status = DeploymentStatus::InProgress;
            deployment.completed_at = None;
            deployment.error_message = None;
        })?;
        info!(deployment = %id, "deployment started");
        self.notifier.deployment_started(&deployment);
        Ok(deployment)
    }

    /// Move a deployment to `Success` or `Failed` and stamp `completed_at`.
    ///
    /// On failure the supplied error (or [`DEFAULT_FAILURE_MESSAGE`]) is
    /// recorded; on success any earlier error message is cleared.
    pub fn complete_deployment(
        &self,
        id: &str,
        success: bool,
        error: Option<String>,
    ) -> LifecycleResult<Deployment> {
        let deployment = self.store.modify(id, |deployment| {
            match deployment.status {
                DeploymentStatus::InProgress => {}
                DeploymentStatus::Pending
                | DeploymentStatus::Success
                | DeploymentStatus::Failed
                | DeploymentStatus::RolledBack => {
                    warn!(deployment = %id, from = %deployment.status, "completing deployment that is not in progress");
                }
            }

            if success {
                deployment.status = DeploymentStatus::Success;
                deployment.error_message = None;
            } else {
                deployment.status = DeploymentStatus::Failed;
                deployment.error_message =
                    Some(error.unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()));
            }
            deployment.completed_at = Some(Utc::now());
        })?;

        info!(deployment = %id, status = %deployment.status, "deployment completed");
        self.notifier.deployment_completed(&deployment, success);
        if !success {
            self.notifier.alert(
                &format!(
                    "{} {} failed in {}: {}",
                    deployment.application,
                    deployment.version,
                    deployment.environment,
                    deployment.error_message.as_deref().unwrap_or(DEFAULT_FAILURE_MESSAGE)
                ),
                Severity::Warning,
            );
        }
        Ok(deployment)
    }

    pub fn get_deployment(&self, id: &str) -> LifecycleResult<Deployment> {
        Ok(self.store.get_by_id(id)?)
    }

    /// Page `page` (1-based; 0 is treated as 1) of `page_size` deployments.
    pub fn list_deployments(&self, page: usize, page_size: usize) -> Page {
        let skip = page.saturating_sub(1).saturating_mul(page_size);
        Page {
            items: self.store.list_all(skip, page_size),
            total: self.store.count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LifecycleError;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        events: Mutex<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        fn deployment_started(&self, deployment: &Deployment) {
            self.events.lock().push(format!("started:{}", deployment.id));
        }

        fn deployment_completed(&self, deployment: &Deployment, success: bool) {
            self.events
                .lock()
                .push(format!("completed:{}:{success}", deployment.id));
        }

        fn alert(&self, _message: &str, severity: Severity) {
            self.events.lock().push(format!("alert:{severity}"));
        }
    }

    fn service() -> DeploymentService {
        DeploymentService::new(DeploymentStore::new())
    }

    fn create(svc: &DeploymentService) -> Deployment {
        svc.create_deployment("api", "1.4.2", "staging", Some("alice".to_string()))
            .unwrap()
    }

    // ── Create ─────────────────────────────────────────────────────

    #[test]
    fn create_returns_pending_record() {
        let svc = service();
        let d = create(&svc);

        assert!(!d.id.is_empty());
        assert_eq!(d.status, DeploymentStatus::Pending);
        assert_eq!(d.created_at, d.updated_at);
        assert_eq!(d.deployed_by, "alice");
        assert!(d.completed_at.is_none());
        assert_eq!(svc.get_deployment(&d.id).unwrap(), d);
    }

    #[test]
    fn create_defaults_deployed_by() {
        let svc = service();
        let d = svc.create_deployment("api", "1.0", "dev", None).unwrap();
        assert_eq!(d.deployed_by, "system");
    }

    // ── Start ──────────────────────────────────────────────────────

    #[test]
    fn start_sets_in_progress() {
        let svc = service();
        let d = create(&svc);

        let started = svc.start_deployment(&d.id).unwrap();
        assert_eq!(started.status, DeploymentStatus::InProgress);
        assert!(started.completed_at.is_none());
        assert!(started.updated_at >= started.created_at);
    }

    #[test]
    fn start_missing_is_not_found() {
        assert_eq!(
            service().start_deployment("missing"),
            Err(LifecycleError::NotFound("missing".to_string()))
        );
    }

    #[test]
    fn start_twice_is_permitted() {
        let svc = service();
        let d = create(&svc);
        svc.start_deployment(&d.id).unwrap();
        let again = svc.start_deployment(&d.id).unwrap();
        assert_eq!(again.status, DeploymentStatus::InProgress);
    }

    // ── Complete ───────────────────────────────────────────────────

    #[test]
    fn complete_success() {
        let svc = service();
        let d = create(&svc);
        svc.start_deployment(&d.id).unwrap();

        let done = svc.complete_deployment(&d.id, true, None).unwrap();
        assert_eq!(done.status, DeploymentStatus::Success);
        assert!(done.completed_at.is_some());
        assert!(done.error_message.is_none());
    }

    #[test]
    fn complete_failure_records_error() {
        let svc = service();
        let d = create(&svc);
        svc.start_deployment(&d.id).unwrap();

        let done = svc
            .complete_deployment(&d.id, false, Some("boom".to_string()))
            .unwrap();
        assert_eq!(done.status, DeploymentStatus::Failed);
        assert_eq!(done.error_message.as_deref(), Some("boom"));
        assert!(done.completed_at.is_some());
    }

    #[test]
    fn complete_failure_without_message_uses_default() {
        let svc = service();
        let d = create(&svc);
        let done = svc.complete_deployment(&d.id, false, None).unwrap();
        assert_eq!(done.error_message.as_deref(), Some(DEFAULT_FAILURE_MESSAGE));
    }

    #[test]
    fn complete_success_ignores_and_clears_error() {
        let svc = service();
        let d = create(&svc);
        svc.complete_deployment(&d.id, false, Some("first try".to_string()))
            .unwrap();

        let done = svc
            .complete_deployment(&d.id, true, Some("ignored".to_string()))
            .unwrap();
        assert_eq!(done.status, DeploymentStatus::Success);
        assert!(done.error_message.is_none());
    }

    #[test]
    fn complete_pending_is_permitted() {
        let svc = service();
        let d = create(&svc);
        let done = svc.complete_deployment(&d.id, true, None).unwrap();
        assert_eq!(done.status, DeploymentStatus::Success);
    }

    #[test]
    fn complete_missing_is_not_found() {
        assert_eq!(
            service().complete_deployment("missing", true, None),
            Err(LifecycleError::NotFound("missing".to_string()))
        );
    }

    #[test]
    fn get_missing_is_not_found() {
        assert!(matches!(
            service().get_deployment("missing"),
            Err(LifecycleError::NotFound(_))
        ));
    }

    // ── Listing ────────────────────────────────────────────────────

    #[test]
    fn pagination_over_25_deployments() {
        let svc = service();
        for i in 0..25 {
            svc.create_deployment(&format!("app-{i}"), "1.0", "dev", None)
                .unwrap();
        }

        let page2 = svc.list_deployments(2, 10);
        assert_eq!(page2.items.len(), 10);
        assert_eq!(page2.total, 25);
        assert_eq!(page2.items[0].application, "app-10");

        let page3 = svc.list_deployments(3, 10);
        assert_eq!(page3.items.len(), 5);
        assert_eq!(page3.total, 25);

        assert!(svc.list_deployments(4, 10).items.is_empty());
        assert_eq!(svc.list_deployments(0, 10).items.len(), 10);
    }

    #[test]
    fn counts_by_status_after_mixed_transitions() {
        let svc = service();
        let ids: Vec<_> = (0..6).map(|_| create(&svc).id).collect();
        svc.start_deployment(&ids[0]).unwrap();
        svc.start_deployment(&ids[1]).unwrap();
        svc.complete_deployment(&ids[1], true, None).unwrap();
        svc.complete_deployment(&ids[2], true, None).unwrap();
        svc.complete_deployment(&ids[3], false, Some("x".to_string()))
            .unwrap();

        let store = svc.store();
        for status in DeploymentStatus::ALL {
            let expected = store
                .list_all(0, usize::MAX)
                .iter()
                .filter(|d| d.status == status)
                .count();
            assert_eq!(store.count_by_status(status), expected, "{status}");
        }
        assert_eq!(store.count_by_status(DeploymentStatus::Pending), 2);
        assert_eq!(store.count_by_status(DeploymentStatus::InProgress), 1);
        assert_eq!(store.count_by_status(DeploymentStatus::Success), 2);
        assert_eq!(store.count_by_status(DeploymentStatus::Failed), 1);
    }

    // ── Invariants ─────────────────────────────────────────────────

    #[test]
    fn completed_at_set_iff_terminal() {
        let svc = service();
        let ids: Vec<_> = (0..4).map(|_| create(&svc).id).collect();
        svc.start_deployment(&ids[1]).unwrap();
        svc.complete_deployment(&ids[2], true, None).unwrap();
        svc.complete_deployment(&ids[3], false, None).unwrap();

        for d in svc.store().list_all(0, 10) {
            assert_eq!(d.completed_at.is_some(), d.is_terminal(), "{}", d.status);
            assert_eq!(
                d.error_message.is_some(),
                d.status == DeploymentStatus::Failed
            );
            assert!(d.updated_at >= d.created_at);
        }
    }

    #[test]
    fn restarting_failed_deployment_clears_completion() {
        let svc = service();
        let id = create(&svc).id;
        svc.complete_deployment(&id, false, Some("boom".to_string()))
            .unwrap();

        let restarted = svc.start_deployment(&id).unwrap();
        assert_eq!(restarted.status, DeploymentStatus::InProgress);
        assert!(restarted.completed_at.is_none());
        assert!(restarted.error_message.is_none());

        let stored = svc.get_deployment(&id).unwrap();
        assert_eq!(stored.completed_at.is_some(), stored.is_terminal());
    }

    #[test]
    fn restarting_successful_deployment_clears_completed_at() {
        let svc = service();
        let id = create(&svc).id;
        svc.complete_deployment(&id, true, None).unwrap();

        let restarted = svc.start_deployment(&id).unwrap();
        assert!(restarted.completed_at.is_none());
    }

    #[test]
    fn concurrent_start_and_complete_leave_consistent_record() {
        let svc = service();
        let ids: Vec<_> = (0..50).map(|_| create(&svc).id).collect();

        std::thread::scope(|scope| {
            for id in &ids {
                let starter = svc.clone();
                let completer = svc.clone();
                scope.spawn(move || starter.start_deployment(id).unwrap());
                scope.spawn(move || {
                    completer
                        .complete_deployment(id, false, Some("late".to_string()))
                        .unwrap()
                });
            }
        });

        // Whichever ran last wins outright; no record mixes the two.
        for d in svc.store().list_all(0, 100) {
            match d.status {
                DeploymentStatus::InProgress => {
                    assert!(d.completed_at.is_none());
                    assert!(d.error_message.is_none());
                }
                DeploymentStatus::Failed => {
                    assert!(d.completed_at.is_some());
                    assert_eq!(d.error_message.as_deref(), Some("late"));
                }
                other => panic!("unexpected status {other}"),
            }
        }
    }

    // ── Notifications ──────────────────────────────────────────────

    #[test]
    fn notifier_sees_transitions() {
        let notifier = Arc::new(RecordingNotifier::default());
        let svc = DeploymentService::with_notifier(DeploymentStore::new(), notifier.clone());
        let d = create(&svc);

        svc.start_deployment(&d.id).unwrap();
        svc.complete_deployment(&d.id, false, None).unwrap();

        assert_eq!(
            *notifier.events.lock(),
            vec![
                format!("started:{}", d.id),
                format!("completed:{}:false", d.id),
                "alert:warning".to_string(),
            ]
        );
    }

    #[test]
    fn notifier_not_called_for_missing_deployment() {
        let notifier = Arc::new(RecordingNotifier::default());
        let svc = DeploymentService::with_notifier(DeploymentStore::new(), notifier.clone());

        let _ = svc.start_deployment("missing");
        assert!(notifier.events.lock().is_empty());
    }
}
