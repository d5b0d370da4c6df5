//! Review executor port.

use async_trait::async_trait;

use crate::domain::errors::CoordinationResult;
use crate::domain::models::ReviewFinding;

/// Output of one reviewer run.
#[derive(Debug, Clone, Default)]
pub struct ReviewRun {
    /// Findings the reviewer produced.
    pub findings: Vec<ReviewFinding>,
    /// Number of files the reviewer examined.
    pub files_reviewed: u32,
}

/// Runs a single specialized reviewer against a target path.
///
/// The actual review mechanics (LLM calls, parsers) live outside the core;
/// the dispatcher only needs the findings back.
#[async_trait]
pub trait ReviewExecutor: Send + Sync {
    /// Execute `reviewer_type` against `target_path` within a session.
    async fn review(
        &self,
        session_id: &str,
        target_path: &str,
        reviewer_type: &str,
    ) -> CoordinationResult<ReviewRun>;
}
