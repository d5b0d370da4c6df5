//! In-memory swarm store for tests and local development.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::errors::{CoordinationError, CoordinationResult};
use crate::domain::models::{
    ReviewerResult, SwarmSession, SwarmStatus, UnifiedReport,
};
use crate::domain::ports::SwarmStore;

/// A `SwarmStore` backed by process memory.
///
/// Mirrors the Redis layout closely enough for dispatcher tests: sessions,
/// per-reviewer results, and the completion set all live under the session
/// id.
#[derive(Debug, Default)]
pub struct MemorySwarmStore {
    sessions: Arc<RwLock<HashMap<String, SwarmSession>>>,
    progress: Arc<RwLock<HashMap<String, HashSet<String>>>>,
}

impl MemorySwarmStore {
    /// A fresh, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn missing(session_id: &str) -> CoordinationError {
        CoordinationError::Swarm {
            session_id: session_id.to_string(),
            message: "session not found".to_string(),
        }
    }
}

#[async_trait]
impl SwarmStore for MemorySwarmStore {
    async fn create_session(&self, session: &SwarmSession) -> CoordinationResult<()> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        self.progress
            .write()
            .await
            .insert(session.id.clone(), HashSet::new());
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> CoordinationResult<Option<SwarmSession>> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn update_status(
        &self,
        session_id: &str,
        status: SwarmStatus,
    ) -> CoordinationResult<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| Self::missing(session_id))?;
        session.status = status;
        Ok(())
    }

    async fn mark_completed(
        &self,
        session_id: &str,
        completed_at: DateTime<Utc>,
    ) -> CoordinationResult<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| Self::missing(session_id))?;
        session.completed_at = Some(completed_at);
        Ok(())
    }

    async fn store_result(
        &self,
        session_id: &str,
        result: &ReviewerResult,
    ) -> CoordinationResult<()> {
        {
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get_mut(session_id)
                .ok_or_else(|| Self::missing(session_id))?;
            session
                .results
                .insert(result.reviewer_type.clone(), result.clone());
        }
        self.progress
            .write()
            .await
            .entry(session_id.to_string())
            .or_default()
            .insert(result.reviewer_type.clone());
        Ok(())
    }

    async fn get_results(
        &self,
        session_id: &str,
    ) -> CoordinationResult<HashMap<String, ReviewerResult>> {
        Ok(self
            .sessions
            .read()
            .await
            .get(session_id)
            .map(|session| session.results.clone())
            .unwrap_or_default())
    }

    async fn completed_reviewers(
        &self,
        session_id: &str,
    ) -> CoordinationResult<HashSet<String>> {
        Ok(self
            .progress
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn store_report(
        &self,
        session_id: &str,
        results: &HashMap<String, ReviewerResult>,
        report: &UnifiedReport,
    ) -> CoordinationResult<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| Self::missing(session_id))?;
        session.results = results.clone();
        session.unified_report = Some(report.clone());
        Ok(())
    }
}
