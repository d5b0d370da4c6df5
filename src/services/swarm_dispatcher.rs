//! Parallel reviewer dispatch for swarm sessions.
//!
//! Fans one review target out to every reviewer concurrently, waits on the
//! shared completion set with a deadline, then hands the collected results
//! to the aggregator. A failing reviewer never aborts its peers.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::{error, info, warn};

use crate::domain::errors::{CoordinationError, CoordinationResult};
use crate::domain::models::{
    MessageType, ReviewerResult, ReviewerStatus, SwarmConfig, SwarmSession, SwarmStatus,
    UnifiedReport, BROADCAST_INSTANCE,
};
use crate::domain::ports::{CoordinationPublisher, ReviewExecutor, SwarmStore};
use crate::services::aggregator::ResultAggregator;
use crate::services::swarm_session::SwarmSessionManager;

/// Instance id the dispatcher publishes lifecycle events under.
pub const DISPATCHER_INSTANCE: &str = "swarm-dispatcher";

/// Admission control for concurrent swarm sessions.
///
/// Sized by `max_concurrent_swarms` and held at the API boundary for the
/// duration of a run; the dispatcher itself never throttles reviewer
/// tasks within a session.
#[derive(Debug, Clone)]
pub struct SwarmAdmission {
    semaphore: Arc<Semaphore>,
}

impl SwarmAdmission {
    /// Build an admission gate with `max_concurrent` permits.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    /// Take a slot immediately, or `None` when the budget is exhausted.
    pub fn try_admit(&self) -> Option<OwnedSemaphorePermit> {
        match self.semaphore.clone().try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(TryAcquireError::NoPermits | TryAcquireError::Closed) => None,
        }
    }

    /// Wait for a slot.
    pub async fn admit(&self) -> CoordinationResult<OwnedSemaphorePermit> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| CoordinationError::Backend(format!("admission closed: {e}")))
    }

    /// Slots currently available.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// Runs swarm review sessions end to end.
pub struct SwarmDispatcher<S: SwarmStore + 'static> {
    sessions: SwarmSessionManager<S>,
    store: Arc<S>,
    publisher: Arc<dyn CoordinationPublisher>,
    executor: Arc<dyn ReviewExecutor>,
    aggregator: ResultAggregator,
    config: Arc<SwarmConfig>,
}

impl<S: SwarmStore + 'static> SwarmDispatcher<S> {
    /// Wire a dispatcher over its collaborators.
    pub fn new(
        store: Arc<S>,
        publisher: Arc<dyn CoordinationPublisher>,
        executor: Arc<dyn ReviewExecutor>,
        config: Arc<SwarmConfig>,
    ) -> Self {
        Self {
            sessions: SwarmSessionManager::new(store.clone(), config.clone()),
            store,
            publisher,
            executor,
            aggregator: ResultAggregator::new(config.clone()),
            config,
        }
    }

    /// Run a full swarm session against `target_path`.
    ///
    /// Reviewers default from configuration when none are named. Timing
    /// out while waiting is not an error: reviewers that have not reported
    /// by the deadline appear in the report as failed, and their tasks are
    /// left to finish on their own.
    pub async fn run_swarm(
        &self,
        target_path: &str,
        reviewer_types: Option<Vec<String>>,
    ) -> CoordinationResult<UnifiedReport> {
        let session = self.sessions.create_session(target_path, reviewer_types).await?;

        self.publish_event(
            MessageType::SwarmStarted,
            &format!("Swarm {} started", session.id),
            &serde_json::json!({
                "session_id": session.id,
                "target_path": session.target_path,
                "reviewers": session.reviewers,
            })
            .to_string(),
        )
        .await?;

        self.sessions
            .update_status(&session.id, SwarmStatus::InProgress, None)
            .await?;

        for reviewer in session.reviewers.clone() {
            let store = self.store.clone();
            let publisher = self.publisher.clone();
            let executor = self.executor.clone();
            let session_id = session.id.clone();
            let target = session.target_path.clone();
            // Detached on purpose: a dispatch timeout must not cancel
            // reviewers still working, their late results stay retrievable.
            tokio::spawn(async move {
                run_reviewer(store, publisher, executor, session_id, target, reviewer).await;
            });
        }

        let timeout = Duration::from_secs(self.config.task_timeout_seconds);
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let all_reported = self
            .store
            .wait_for_completion(&session.id, &session.reviewers, timeout, poll_interval)
            .await?;
        if !all_reported {
            warn!(
                session_id = %session.id,
                timeout_seconds = self.config.task_timeout_seconds,
                "collecting partial results after reviewer timeout"
            );
        }

        self.sessions
            .update_status(&session.id, SwarmStatus::Aggregating, None)
            .await?;

        let mut results = self.store.get_results(&session.id).await?;
        for reviewer in &session.reviewers {
            if !results.contains_key(reviewer) {
                results.insert(
                    reviewer.clone(),
                    ReviewerResult::timed_out(reviewer, self.config.task_timeout_seconds as f64),
                );
            }
        }

        match self.finish(&session, &results).await {
            Ok(report) => {
                info!(
                    session_id = %session.id,
                    total_findings = report.total_findings,
                    duplicates_removed = report.duplicates_removed,
                    "swarm session complete"
                );
                Ok(report)
            }
            Err(e) => {
                error!(session_id = %session.id, error = %e, "swarm aggregation failed");
                if let Err(status_err) = self
                    .sessions
                    .update_status(&session.id, SwarmStatus::Failed, Some(Utc::now()))
                    .await
                {
                    error!(session_id = %session.id, error = %status_err, "failed to mark session failed");
                }
                if let Err(publish_err) = self
                    .publish_event(
                        MessageType::SwarmFailed,
                        &format!("Swarm {} failed", session.id),
                        &serde_json::json!({
                            "session_id": session.id,
                            "error": e.to_string(),
                        })
                        .to_string(),
                    )
                    .await
                {
                    warn!(session_id = %session.id, error = %publish_err, "failed to publish swarm failure");
                }
                Err(e)
            }
        }
    }

    /// Aggregate, persist the report, complete the session and announce it.
    async fn finish(
        &self,
        session: &SwarmSession,
        results: &HashMap<String, ReviewerResult>,
    ) -> CoordinationResult<UnifiedReport> {
        let report = self.aggregator.aggregate(session, results);

        self.store
            .store_report(&session.id, results, &report)
            .await?;
        self.sessions
            .update_status(&session.id, SwarmStatus::Complete, Some(Utc::now()))
            .await?;

        self.publish_event(
            MessageType::SwarmComplete,
            &format!("Swarm {} complete", session.id),
            &serde_json::json!({
                "session_id": session.id,
                "total_findings": report.total_findings,
                "reviewers_failed": report.reviewers_failed,
                "duplicates_removed": report.duplicates_removed,
            })
            .to_string(),
        )
        .await?;

        Ok(report)
    }

    async fn publish_event(
        &self,
        msg_type: MessageType,
        subject: &str,
        description: &str,
    ) -> CoordinationResult<()> {
        self.publisher
            .publish(
                msg_type,
                subject,
                description,
                DISPATCHER_INSTANCE,
                BROADCAST_INSTANCE,
                false,
            )
            .await?;
        Ok(())
    }
}

/// Run one reviewer to completion and record its outcome.
///
/// Captures executor failures as a failed result; storage or announcement
/// problems are logged so the other reviewer tasks keep going.
async fn run_reviewer<S: SwarmStore>(
    store: Arc<S>,
    publisher: Arc<dyn CoordinationPublisher>,
    executor: Arc<dyn ReviewExecutor>,
    session_id: String,
    target_path: String,
    reviewer: String,
) {
    let started = std::time::Instant::now();
    let result = match executor.review(&session_id, &target_path, &reviewer).await {
        Ok(run) => ReviewerResult {
            reviewer_type: reviewer.clone(),
            status: ReviewerStatus::Success,
            findings: run.findings,
            duration_seconds: started.elapsed().as_secs_f64(),
            files_reviewed: run.files_reviewed,
            error_message: None,
        },
        Err(e) => {
            warn!(session_id, reviewer, error = %e, "reviewer failed");
            ReviewerResult::failed(&reviewer, e.to_string(), started.elapsed().as_secs_f64())
        }
    };

    if let Err(e) = store.store_result(&session_id, &result).await {
        error!(session_id, reviewer, error = %e, "failed to store reviewer result");
        return;
    }

    let announcement = serde_json::json!({
        "session_id": session_id,
        "reviewer": reviewer,
        "status": result.status,
    })
    .to_string();
    if let Err(e) = publisher
        .publish(
            MessageType::SwarmReviewerComplete,
            &format!("{reviewer} review complete"),
            &announcement,
            DISPATCHER_INSTANCE,
            BROADCAST_INSTANCE,
            false,
        )
        .await
    {
        warn!(session_id, reviewer, error = %e, "failed to announce reviewer completion");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_budget() {
        let admission = SwarmAdmission::new(2);
        let first = admission.try_admit().unwrap();
        let second = admission.try_admit().unwrap();
        assert!(admission.try_admit().is_none());
        assert_eq!(admission.available(), 0);

        drop(first);
        assert!(admission.try_admit().is_some());
        drop(second);
    }
}
