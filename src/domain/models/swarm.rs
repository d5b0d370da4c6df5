//! Swarm review domain models.
//!
//! A swarm session fans a review target out to several specialized
//! reviewers and folds their findings into one unified report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Severity of a review finding, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Must be fixed before merge.
    Critical,
    /// Should be fixed before merge.
    High,
    /// Worth fixing soon.
    Medium,
    /// Minor issue.
    Low,
    /// Informational only.
    Info,
}

impl Severity {
    /// Sort rank; lower is more severe.
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
            Self::Info => 4,
        }
    }

    /// Wire representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Info => "info",
        }
    }

    /// Parse the wire representation.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "critical" => Some(Self::Critical),
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            "info" => Some(Self::Info),
            _ => None,
        }
    }

    /// The more severe of two severities.
    pub fn max_severity(self, other: Self) -> Self {
        if self.rank() <= other.rank() {
            self
        } else {
            other
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a swarm session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwarmStatus {
    /// Session created, dispatch not started.
    Pending,
    /// Reviewer tasks are running.
    InProgress,
    /// Results are being collected and merged.
    Aggregating,
    /// Unified report stored.
    Complete,
    /// Terminal failure.
    Failed,
}

impl SwarmStatus {
    /// Wire representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Aggregating => "aggregating",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    /// Parse the wire representation.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "aggregating" => Some(Self::Aggregating),
            "complete" | "completed" => Some(Self::Complete),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Whether this is a terminal state.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Valid transitions from this status.
    pub const fn valid_transitions(&self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::InProgress, Self::Failed],
            Self::InProgress => &[Self::Aggregating, Self::Failed],
            Self::Aggregating => &[Self::Complete, Self::Failed],
            Self::Complete | Self::Failed => &[],
        }
    }

    /// Whether a transition to `new_status` is allowed.
    pub fn can_transition_to(&self, new_status: Self) -> bool {
        self.valid_transitions().contains(&new_status)
    }
}

impl std::fmt::Display for SwarmStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a single reviewer task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewerStatus {
    /// Reviewer completed and its findings entered the report.
    Success,
    /// Reviewer raised an error.
    Failed,
    /// Reviewer did not report before the dispatch deadline.
    Timeout,
}

impl ReviewerStatus {
    /// Whether findings from this reviewer enter the unified report.
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// One defect report produced by a reviewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewFinding {
    /// Finding identifier, unique within a swarm run.
    pub id: String,
    /// Producing reviewer type; a comma-joined set after merging.
    pub reviewer_type: String,
    /// Severity of the defect.
    pub severity: Severity,
    /// Hierarchical category, `/`-separated.
    pub category: String,
    /// Short title.
    pub title: String,
    /// Detailed description; merged duplicates concatenate with a rule.
    pub description: String,
    /// File the finding points at.
    pub file_path: String,
    /// First affected line, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_start: Option<u32>,
    /// Last affected line, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_end: Option<u32>,
    /// Offending code excerpt, if captured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,
    /// Suggested remediation, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    /// Reviewer confidence in [0, 1].
    pub confidence: f64,
}

impl ReviewFinding {
    /// Root category: the prefix before the first `/`.
    pub fn root_category(&self) -> &str {
        self.category.split('/').next().unwrap_or(&self.category)
    }
}

/// Result of one reviewer's run within a swarm session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewerResult {
    /// Reviewer type that produced this result.
    pub reviewer_type: String,
    /// Run outcome.
    pub status: ReviewerStatus,
    /// Findings; empty for failed or timed-out reviewers.
    #[serde(default)]
    pub findings: Vec<ReviewFinding>,
    /// Wall-clock duration of the run.
    pub duration_seconds: f64,
    /// Number of files the reviewer examined.
    pub files_reviewed: u32,
    /// Failure description for non-success results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ReviewerResult {
    /// A failed result carrying the error text.
    pub fn failed(reviewer_type: &str, error: String, duration_seconds: f64) -> Self {
        Self {
            reviewer_type: reviewer_type.to_string(),
            status: ReviewerStatus::Failed,
            findings: Vec::new(),
            duration_seconds,
            files_reviewed: 0,
            error_message: Some(error),
        }
    }

    /// A result for a reviewer that missed the dispatch deadline.
    pub fn timed_out(reviewer_type: &str, deadline_seconds: f64) -> Self {
        Self {
            reviewer_type: reviewer_type.to_string(),
            status: ReviewerStatus::Timeout,
            findings: Vec::new(),
            duration_seconds: deadline_seconds,
            files_reviewed: 0,
            error_message: Some(format!(
                "reviewer did not report within {deadline_seconds}s"
            )),
        }
    }
}

/// A parallel-review run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmSession {
    /// Unique id in `swarm-<8 hex>` format.
    pub id: String,
    /// Path the swarm reviews.
    pub target_path: String,
    /// Ordered reviewer types dispatched by this session.
    pub reviewers: Vec<String>,
    /// Current lifecycle status.
    pub status: SwarmStatus,
    /// Creation time.
    #[serde(with = "super::message::iso_seconds")]
    pub created_at: DateTime<Utc>,
    /// Completion time, set when the session reaches a terminal state.
    #[serde(
        default,
        with = "super::message::iso_seconds_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_at: Option<DateTime<Utc>>,
    /// Per-reviewer results keyed by reviewer type.
    #[serde(default)]
    pub results: HashMap<String, ReviewerResult>,
    /// Aggregated report, present once the session completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unified_report: Option<UnifiedReport>,
}

/// Generate a unique session id in `swarm-<8 hex>` format.
pub fn generate_session_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("swarm-{}", &hex[..8])
}

/// Aggregated output of a swarm session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedReport {
    /// Session this report belongs to.
    pub swarm_id: String,
    /// Path the swarm reviewed.
    pub target_path: String,
    /// Aggregation time.
    #[serde(with = "super::message::iso_seconds")]
    pub created_at: DateTime<Utc>,
    /// Reviewers whose findings entered the report.
    pub reviewers_completed: Vec<String>,
    /// Reviewers that failed or timed out.
    pub reviewers_failed: Vec<String>,
    /// Critical findings, most severe bucket.
    pub critical_findings: Vec<ReviewFinding>,
    /// High-severity findings.
    pub high_findings: Vec<ReviewFinding>,
    /// Medium-severity findings.
    pub medium_findings: Vec<ReviewFinding>,
    /// Low-severity findings.
    pub low_findings: Vec<ReviewFinding>,
    /// Informational findings.
    pub info_findings: Vec<ReviewFinding>,
    /// Unique finding count after deduplication.
    pub total_findings: usize,
    /// Unique findings attributed per reviewer (merged findings count for
    /// each reviewer in their joined set).
    pub findings_by_reviewer: HashMap<String, usize>,
    /// Unique findings per category.
    pub findings_by_category: HashMap<String, usize>,
    /// Pool size minus unique count.
    pub duplicates_removed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical.rank() < Severity::High.rank());
        assert!(Severity::High.rank() < Severity::Medium.rank());
        assert!(Severity::Medium.rank() < Severity::Low.rank());
        assert!(Severity::Low.rank() < Severity::Info.rank());
    }

    #[test]
    fn test_severity_max() {
        assert_eq!(
            Severity::Low.max_severity(Severity::High),
            Severity::High
        );
        assert_eq!(
            Severity::Critical.max_severity(Severity::Info),
            Severity::Critical
        );
        assert_eq!(Severity::Medium.max_severity(Severity::Medium), Severity::Medium);
    }

    #[test]
    fn test_severity_round_trip() {
        for severity in [
            Severity::Critical,
            Severity::High,
            Severity::Medium,
            Severity::Low,
            Severity::Info,
        ] {
            assert_eq!(Severity::from_str(severity.as_str()), Some(severity));
        }
        assert_eq!(Severity::from_str("catastrophic"), None);
    }

    #[test]
    fn test_status_transitions() {
        assert!(SwarmStatus::Pending.can_transition_to(SwarmStatus::InProgress));
        assert!(SwarmStatus::InProgress.can_transition_to(SwarmStatus::Aggregating));
        assert!(SwarmStatus::Aggregating.can_transition_to(SwarmStatus::Complete));
        assert!(SwarmStatus::Pending.can_transition_to(SwarmStatus::Failed));
        assert!(SwarmStatus::InProgress.can_transition_to(SwarmStatus::Failed));
        assert!(SwarmStatus::Aggregating.can_transition_to(SwarmStatus::Failed));

        assert!(!SwarmStatus::Pending.can_transition_to(SwarmStatus::Complete));
        assert!(!SwarmStatus::Complete.can_transition_to(SwarmStatus::Failed));
        assert!(!SwarmStatus::Failed.can_transition_to(SwarmStatus::Pending));
    }

    #[test]
    fn test_terminal_states() {
        assert!(SwarmStatus::Complete.is_terminal());
        assert!(SwarmStatus::Failed.is_terminal());
        assert!(!SwarmStatus::Aggregating.is_terminal());
    }

    #[test]
    fn test_session_id_format() {
        let id = generate_session_id();
        assert!(id.starts_with("swarm-"));
        assert_eq!(id.len(), 14);
        assert!(id[6..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_root_category() {
        let mut finding = sample_finding();
        finding.category = "security/injection/sql".into();
        assert_eq!(finding.root_category(), "security");

        finding.category = "style".into();
        assert_eq!(finding.root_category(), "style");
    }

    #[test]
    fn test_timed_out_result() {
        let result = ReviewerResult::timed_out("security", 300.0);
        assert_eq!(result.status, ReviewerStatus::Timeout);
        assert!(!result.status.is_success());
        assert!(result.error_message.unwrap().contains("300"));
    }

    #[test]
    fn test_reviewer_result_serde_round_trip() {
        let result = ReviewerResult {
            reviewer_type: "security".into(),
            status: ReviewerStatus::Success,
            findings: vec![sample_finding()],
            duration_seconds: 1.5,
            files_reviewed: 4,
            error_message: None,
        };
        let json = serde_json::to_string(&result).unwrap();
        let decoded: ReviewerResult = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, result);
    }

    fn sample_finding() -> ReviewFinding {
        ReviewFinding {
            id: "sec-001".into(),
            reviewer_type: "security".into(),
            severity: Severity::High,
            category: "security/injection".into(),
            title: "SQL injection in login handler".into(),
            description: "user input concatenated into query".into(),
            file_path: "src/auth.rs".into(),
            line_start: Some(42),
            line_end: Some(48),
            code_snippet: None,
            recommendation: Some("use bound parameters".into()),
            confidence: 0.9,
        }
    }
}
