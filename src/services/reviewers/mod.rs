//! Specialized reviewer profiles.
//!
//! Each reviewer contributes a domain, a system prompt for LLM-backed
//! review and a manual checklist. The registry maps reviewer-type tags to
//! profiles; executors look their instructions up here.

mod performance;
mod security;
mod style;

pub use performance::PerformanceReviewer;
pub use security::SecurityReviewer;
pub use style::StyleReviewer;

use std::collections::HashMap;
use std::sync::Arc;

/// A specialized code reviewer profile.
pub trait SpecializedReviewer: Send + Sync {
    /// Unique type tag, e.g. `"security"`.
    fn reviewer_type(&self) -> &'static str;

    /// Domains this reviewer examines.
    fn focus_areas(&self) -> &'static [&'static str];

    /// Importance weight per focus area, in [0, 1].
    fn severity_weight(&self, focus_area: &str) -> f64;

    /// System prompt for LLM-based review.
    fn system_prompt(&self) -> &'static str;

    /// Actionable checklist for manual review.
    fn checklist(&self) -> &'static [&'static str];
}

/// Registry of reviewer profiles keyed by type tag.
#[derive(Default, Clone)]
pub struct ReviewerRegistry {
    reviewers: HashMap<&'static str, Arc<dyn SpecializedReviewer>>,
}

impl std::fmt::Debug for ReviewerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewerRegistry")
            .field("types", &self.list_types())
            .finish()
    }
}

impl ReviewerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a profile, replacing any existing one of the same type.
    pub fn register(&mut self, reviewer: Arc<dyn SpecializedReviewer>) {
        self.reviewers.insert(reviewer.reviewer_type(), reviewer);
    }

    /// Look a profile up by its type tag.
    pub fn get(&self, reviewer_type: &str) -> Option<Arc<dyn SpecializedReviewer>> {
        self.reviewers.get(reviewer_type).cloned()
    }

    /// All registered type tags, sorted.
    pub fn list_types(&self) -> Vec<&'static str> {
        let mut types: Vec<&'static str> = self.reviewers.keys().copied().collect();
        types.sort_unstable();
        types
    }
}

/// Registry pre-populated with the built-in reviewers.
pub fn default_registry() -> ReviewerRegistry {
    let mut registry = ReviewerRegistry::new();
    registry.register(Arc::new(SecurityReviewer));
    registry.register(Arc::new(PerformanceReviewer));
    registry.register(Arc::new(StyleReviewer));
    registry
}
