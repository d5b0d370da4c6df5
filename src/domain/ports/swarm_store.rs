//! Swarm session store port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::domain::errors::CoordinationResult;
use crate::domain::models::{ReviewerResult, SwarmSession, SwarmStatus, UnifiedReport};

/// Shared state for a swarm session and its concurrent reviewer tasks.
///
/// Reviewer tasks hold only the session id; every mutation goes through
/// this store so partial failures never corrupt peers.
#[async_trait]
pub trait SwarmStore: Send + Sync {
    /// Persist a new session.
    async fn create_session(&self, session: &SwarmSession) -> CoordinationResult<()>;

    /// Fetch a session by id.
    async fn get_session(&self, session_id: &str) -> CoordinationResult<Option<SwarmSession>>;

    /// Update the session status.
    async fn update_status(
        &self,
        session_id: &str,
        status: SwarmStatus,
    ) -> CoordinationResult<()>;

    /// Record the session completion time.
    async fn mark_completed(
        &self,
        session_id: &str,
        completed_at: DateTime<Utc>,
    ) -> CoordinationResult<()>;

    /// Store one reviewer's result and add it to the completion set.
    async fn store_result(
        &self,
        session_id: &str,
        result: &ReviewerResult,
    ) -> CoordinationResult<()>;

    /// All reviewer results stored so far, keyed by reviewer type.
    async fn get_results(
        &self,
        session_id: &str,
    ) -> CoordinationResult<HashMap<String, ReviewerResult>>;

    /// Reviewer types that have reported.
    async fn completed_reviewers(&self, session_id: &str)
        -> CoordinationResult<HashSet<String>>;

    /// Store the final results snapshot and unified report on the session.
    async fn store_report(
        &self,
        session_id: &str,
        results: &HashMap<String, ReviewerResult>,
        report: &UnifiedReport,
    ) -> CoordinationResult<()>;

    /// Poll the completion set until it covers `expected` or `timeout`
    /// elapses. Returns `true` on coverage, `false` on timeout. An empty
    /// expected list returns `true` immediately.
    async fn wait_for_completion(
        &self,
        session_id: &str,
        expected: &[String],
        timeout: Duration,
        poll_interval: Duration,
    ) -> CoordinationResult<bool> {
        if expected.is_empty() {
            return Ok(true);
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let completed = self.completed_reviewers(session_id).await?;
            if expected.iter().all(|reviewer| completed.contains(reviewer)) {
                return Ok(true);
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(poll_interval.min(deadline - now)).await;
        }
    }
}
