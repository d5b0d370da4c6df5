//! Devops activity projection models.
//!
//! Activities are ephemeral read models folded from the coordination
//! message stream; they are never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a single step within an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Step has not started.
    Pending,
    /// Step is executing.
    Running,
    /// Step finished successfully.
    Completed,
    /// Step finished with an error.
    Failed,
}

impl StepStatus {
    /// Parse the wire representation, defaulting unknown values to pending.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "running" => Self::Running,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }

    /// Whether the step has reached a terminal state.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Status of an overall activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    /// Activity is running.
    InProgress,
    /// Activity finished successfully.
    Completed,
    /// Activity finished with an error.
    Failed,
}

/// A single step within an activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityStep {
    /// Human-readable step name.
    pub name: String,
    /// Current step status.
    pub status: StepStatus,
    /// When the step left pending, if it has.
    #[serde(
        default,
        with = "super::message::iso_seconds_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub started_at: Option<DateTime<Utc>>,
    /// When the step reached a terminal state, if it has.
    #[serde(
        default,
        with = "super::message::iso_seconds_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_at: Option<DateTime<Utc>>,
    /// Error message if the step failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActivityStep {
    /// A fresh pending step.
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Pending,
            started_at: None,
            completed_at: None,
            error: None,
        }
    }
}

/// A devops operation reconstructed from the message stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// Activity identifier from the originating event.
    pub id: String,
    /// Description of the operation being performed.
    pub operation: String,
    /// Overall status.
    pub status: ActivityStatus,
    /// When the activity began.
    #[serde(with = "super::message::iso_seconds")]
    pub started_at: DateTime<Utc>,
    /// When the activity finished, if it has.
    #[serde(
        default,
        with = "super::message::iso_seconds_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_at: Option<DateTime<Utc>>,
    /// Steps in declaration order.
    pub steps: Vec<ActivityStep>,
}

/// Current and recent activities derived from the event stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityView {
    /// The newest in-progress activity, if any.
    pub current: Option<Activity>,
    /// Finished activities, newest first.
    pub recent: Vec<Activity>,
}

impl ActivityView {
    /// The view returned when the substrate is unavailable.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// JSON document carried in the description of devops messages.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityEventPayload {
    /// Activity the event belongs to.
    pub activity_id: String,
    /// Operation description, present on start events.
    #[serde(default)]
    pub operation: Option<String>,
    /// Declared step names, present on start events.
    #[serde(default)]
    pub steps: Option<Vec<String>>,
    /// Step name, present on step-update events.
    #[serde(default)]
    pub step: Option<String>,
    /// Step status string, present on step-update events.
    #[serde(default)]
    pub status: Option<String>,
    /// Error text, present on failure events.
    #[serde(default)]
    pub error: Option<String>,
}
