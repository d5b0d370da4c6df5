//! Result aggregation for swarm review sessions.
//!
//! Pools findings from successful reviewers, merges duplicates, sorts by
//! severity and derives the summary statistics of the unified report.

use chrono::Utc;
use similar::TextDiff;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::models::{
    ReviewFinding, ReviewerResult, Severity, SwarmConfig, SwarmSession, UnifiedReport,
};

/// Merges per-reviewer results into one unified report.
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    config: Arc<SwarmConfig>,
}

impl ResultAggregator {
    /// Build an aggregator with the configured similarity threshold.
    pub const fn new(config: Arc<SwarmConfig>) -> Self {
        Self { config }
    }

    /// Aggregate all reviewer results for a session.
    ///
    /// Only successful reviewers contribute findings; everything else is
    /// reported in `reviewers_failed`.
    pub fn aggregate(
        &self,
        session: &SwarmSession,
        results: &HashMap<String, ReviewerResult>,
    ) -> UnifiedReport {
        let mut all_findings: Vec<ReviewFinding> = Vec::new();
        let mut reviewers_completed: Vec<String> = Vec::new();
        let mut reviewers_failed: Vec<String> = Vec::new();

        // Walk the session's reviewer order first so the report is
        // deterministic, then any stragglers not named by the session.
        let mut ordered: Vec<&String> = session.reviewers.iter().collect();
        let mut extra: Vec<&String> = results
            .keys()
            .filter(|reviewer| !session.reviewers.contains(reviewer))
            .collect();
        extra.sort();
        ordered.extend(extra);

        for reviewer in ordered {
            let Some(result) = results.get(reviewer) else {
                continue;
            };
            if result.status.is_success() {
                reviewers_completed.push(reviewer.clone());
                all_findings.extend(result.findings.iter().cloned());
            } else {
                reviewers_failed.push(reviewer.clone());
            }
        }

        let pool_size = all_findings.len();
        let mut unique = self.dedupe(all_findings);
        let duplicates_removed = pool_size - unique.len();

        unique.sort_by_key(|finding| finding.severity.rank());

        let bucket = |severity: Severity, findings: &[ReviewFinding]| {
            findings
                .iter()
                .filter(|finding| finding.severity == severity)
                .cloned()
                .collect::<Vec<_>>()
        };

        let mut findings_by_reviewer: HashMap<String, usize> = HashMap::new();
        let mut findings_by_category: HashMap<String, usize> = HashMap::new();
        for finding in &unique {
            for reviewer in finding.reviewer_type.split(", ") {
                *findings_by_reviewer.entry(reviewer.to_string()).or_insert(0) += 1;
            }
            *findings_by_category
                .entry(finding.category.clone())
                .or_insert(0) += 1;
        }

        UnifiedReport {
            swarm_id: session.id.clone(),
            target_path: session.target_path.clone(),
            created_at: Utc::now(),
            reviewers_completed,
            reviewers_failed,
            critical_findings: bucket(Severity::Critical, &unique),
            high_findings: bucket(Severity::High, &unique),
            medium_findings: bucket(Severity::Medium, &unique),
            low_findings: bucket(Severity::Low, &unique),
            info_findings: bucket(Severity::Info, &unique),
            total_findings: unique.len(),
            findings_by_reviewer,
            findings_by_category,
            duplicates_removed,
        }
    }

    /// Pairwise-sequential dedup against the running unique set: each
    /// incoming finding merges into the first match, else is appended.
    fn dedupe(&self, findings: Vec<ReviewFinding>) -> Vec<ReviewFinding> {
        let mut unique: Vec<ReviewFinding> = Vec::with_capacity(findings.len());

        for finding in findings {
            let matched = unique
                .iter()
                .position(|existing| self.is_duplicate(&finding, existing));
            match matched {
                Some(index) => {
                    let merged = merge_findings(unique[index].clone(), finding);
                    unique[index] = merged;
                }
                None => unique.push(finding),
            }
        }

        unique
    }

    /// Two findings are duplicates iff they hit the same file, their line
    /// ranges overlap, their root categories match and their titles are
    /// similar beyond the configured threshold.
    fn is_duplicate(&self, a: &ReviewFinding, b: &ReviewFinding) -> bool {
        if a.file_path != b.file_path {
            return false;
        }
        if !lines_overlap(a.line_start, a.line_end, b.line_start, b.line_end) {
            return false;
        }
        if !a.category.is_empty()
            && !b.category.is_empty()
            && a.root_category() != b.root_category()
        {
            return false;
        }
        text_similarity(&a.title, &b.title) >= self.config.duplicate_similarity_threshold
    }
}

/// Case-insensitive sequence-ratio similarity in [0, 1].
fn text_similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    f64::from(TextDiff::from_chars(a.as_str(), b.as_str()).ratio())
}

/// Whether two line ranges overlap. A missing end makes a single-line
/// range; a missing start means no line information, which never counts
/// as an overlap.
fn lines_overlap(
    start_a: Option<u32>,
    end_a: Option<u32>,
    start_b: Option<u32>,
    end_b: Option<u32>,
) -> bool {
    let (Some(start_a), Some(start_b)) = (start_a, start_b) else {
        return false;
    };
    let end_a = end_a.unwrap_or(start_a);
    let end_b = end_b.unwrap_or(start_b);
    !(end_a < start_b || end_b < start_a)
}

/// Merge two duplicate findings into one.
///
/// The higher-severity side is the base; reviewer types union, confidence
/// takes the max, the line range expands to cover both, and descriptions
/// concatenate with a divider.
fn merge_findings(a: ReviewFinding, b: ReviewFinding) -> ReviewFinding {
    let (base, other) = if a.severity.rank() <= b.severity.rank() {
        (a, b)
    } else {
        (b, a)
    };

    let mut reviewers: Vec<&str> = base
        .reviewer_type
        .split(", ")
        .chain(other.reviewer_type.split(", "))
        .collect();
    reviewers.sort_unstable();
    reviewers.dedup();

    let line_start = match (base.line_start, other.line_start) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, y) => x.or(y),
    };
    let line_end = match (base.line_end, other.line_end) {
        (None, None) => None,
        (x, y) => Some(x.unwrap_or(0).max(y.unwrap_or(0))),
    };

    ReviewFinding {
        id: base.id.clone(),
        reviewer_type: reviewers.join(", "),
        severity: base.severity,
        category: base.category.clone(),
        title: base.title.clone(),
        description: format!("{}\n\n---\n\n{}", base.description, other.description),
        file_path: base.file_path.clone(),
        line_start,
        line_end,
        code_snippet: base.code_snippet.clone(),
        recommendation: base.recommendation.clone(),
        confidence: base.confidence.max(other.confidence),
    }
}
