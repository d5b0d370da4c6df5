//! Swarm session lifecycle management.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::domain::errors::CoordinationResult;
use crate::domain::models::{generate_session_id, SwarmConfig, SwarmSession, SwarmStatus};
use crate::domain::ports::SwarmStore;

/// Creates, fetches and transitions swarm sessions.
#[derive(Debug)]
pub struct SwarmSessionManager<S: SwarmStore> {
    store: Arc<S>,
    config: Arc<SwarmConfig>,
}

impl<S: SwarmStore> SwarmSessionManager<S> {
    /// Build a manager over a session store.
    pub const fn new(store: Arc<S>, config: Arc<SwarmConfig>) -> Self {
        Self { store, config }
    }

    /// Create a new session in `Pending` and persist it.
    ///
    /// An empty or missing reviewer list falls back to the configured
    /// defaults.
    pub async fn create_session(
        &self,
        target_path: &str,
        reviewer_types: Option<Vec<String>>,
    ) -> CoordinationResult<SwarmSession> {
        let reviewers = match reviewer_types {
            Some(reviewers) if !reviewers.is_empty() => reviewers,
            _ => self.config.default_reviewers.clone(),
        };

        let session = SwarmSession {
            id: generate_session_id(),
            target_path: target_path.to_string(),
            reviewers,
            status: SwarmStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            results: HashMap::new(),
            unified_report: None,
        };

        self.store.create_session(&session).await?;
        info!(
            session_id = %session.id,
            target_path,
            reviewers = ?session.reviewers,
            "created swarm session"
        );
        Ok(session)
    }

    /// Fetch a session by id.
    pub async fn get_session(&self, session_id: &str) -> CoordinationResult<Option<SwarmSession>> {
        self.store.get_session(session_id).await
    }

    /// Update session status, optionally recording a completion time.
    pub async fn update_status(
        &self,
        session_id: &str,
        status: SwarmStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> CoordinationResult<()> {
        self.store.update_status(session_id, status).await?;
        if let Some(completed_at) = completed_at {
            self.store.mark_completed(session_id, completed_at).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemorySwarmStore;

    fn manager() -> SwarmSessionManager<MemorySwarmStore> {
        SwarmSessionManager::new(
            Arc::new(MemorySwarmStore::new()),
            Arc::new(SwarmConfig::default()),
        )
    }

    #[tokio::test]
    async fn test_create_session_uses_defaults_when_empty() {
        let manager = manager();
        let session = manager
            .create_session("src/workers/", Some(vec![]))
            .await
            .unwrap();
        assert_eq!(session.reviewers, vec!["security", "performance", "style"]);
        assert_eq!(session.status, SwarmStatus::Pending);
        assert!(session.id.starts_with("swarm-"));
    }

    #[tokio::test]
    async fn test_create_session_keeps_explicit_reviewers() {
        let manager = manager();
        let session = manager
            .create_session("src/", Some(vec!["security".into()]))
            .await
            .unwrap();
        assert_eq!(session.reviewers, vec!["security"]);
    }

    #[tokio::test]
    async fn test_update_status_with_completion_time() {
        let manager = manager();
        let session = manager.create_session("src/", None).await.unwrap();
        let finished = Utc::now();

        manager
            .update_status(&session.id, SwarmStatus::Complete, Some(finished))
            .await
            .unwrap();

        let stored = manager.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SwarmStatus::Complete);
        assert_eq!(stored.completed_at, Some(finished));
    }
}
