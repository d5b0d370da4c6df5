//! Devops activity projection.
//!
//! Folds the time-ordered devops message stream into activity state
//! machines. The fold is pure; the service wrapper queries the
//! coordination substrate and never fails its caller.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::models::{
    Activity, ActivityEventPayload, ActivityStatus, ActivityStep, ActivityView,
    CoordinationMessage, MessageQuery, MessageType, StepStatus,
};
use crate::services::coordination::CoordinationClient;

/// Fold devops messages into current and recent activities.
///
/// Messages are processed in ascending timestamp order. Step updates are
/// buffered per activity and applied after the main pass, keeping only the
/// latest status per step name. Older in-progress activities lose the
/// `current` slot to the newest one and surface under `recent`, so every
/// started activity appears exactly once in the output.
pub fn fold_activities(messages: &[CoordinationMessage], limit: usize) -> ActivityView {
    let mut ordered: Vec<&CoordinationMessage> = messages
        .iter()
        .filter(|message| message.msg_type.is_devops())
        .collect();
    ordered.sort_by_key(|message| message.timestamp);

    let mut activities: HashMap<String, Activity> = HashMap::new();
    let mut step_updates: HashMap<String, Vec<(String, StepStatus, DateTime<Utc>)>> =
        HashMap::new();

    for message in ordered {
        let payload: ActivityEventPayload =
            match serde_json::from_str(&message.payload.description) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(
                        message_id = %message.id,
                        error = %e,
                        "skipping devops message with malformed description"
                    );
                    continue;
                }
            };
        let activity_id = payload.activity_id.clone();

        match message.msg_type {
            MessageType::DevopsStarted => {
                activities.insert(
                    activity_id.clone(),
                    start_activity(activity_id.clone(), &payload, message.timestamp),
                );
                step_updates.insert(activity_id, Vec::new());
            }
            MessageType::DevopsStepUpdate => {
                if let (Some(step), Some(updates)) =
                    (payload.step, step_updates.get_mut(&activity_id))
                {
                    let status = StepStatus::from_str(payload.status.as_deref().unwrap_or("running"));
                    updates.push((step, status, message.timestamp));
                }
            }
            MessageType::DevopsComplete => {
                if let Some(activity) = activities.get_mut(&activity_id) {
                    complete_activity(activity, message.timestamp);
                }
            }
            MessageType::DevopsFailed => {
                if let Some(activity) = activities.get_mut(&activity_id) {
                    fail_activity(activity, message.timestamp, payload.error);
                }
            }
            _ => {}
        }
    }

    for (activity_id, updates) in step_updates {
        if let Some(activity) = activities.get_mut(&activity_id) {
            apply_step_updates(activity, &updates);
        }
    }

    let mut current: Option<Activity> = None;
    let mut recent: Vec<Activity> = Vec::new();
    for activity in activities.into_values() {
        if activity.status == ActivityStatus::InProgress {
            match current.take() {
                Some(existing) if existing.started_at >= activity.started_at => {
                    recent.push(activity);
                    current = Some(existing);
                }
                Some(existing) => {
                    recent.push(existing);
                    current = Some(activity);
                }
                None => current = Some(activity),
            }
        } else {
            recent.push(activity);
        }
    }

    recent.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    recent.truncate(limit);

    ActivityView { current, recent }
}

fn start_activity(
    activity_id: String,
    payload: &ActivityEventPayload,
    timestamp: DateTime<Utc>,
) -> Activity {
    let steps = payload
        .steps
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(ActivityStep::pending)
        .collect();

    Activity {
        id: activity_id,
        operation: payload
            .operation
            .clone()
            .unwrap_or_else(|| "Unknown operation".to_string()),
        status: ActivityStatus::InProgress,
        started_at: timestamp,
        completed_at: None,
        steps,
    }
}

/// Completion promotes every still-pending step to completed at the
/// completion timestamp.
fn complete_activity(activity: &mut Activity, timestamp: DateTime<Utc>) {
    for step in &mut activity.steps {
        if step.status == StepStatus::Pending {
            step.status = StepStatus::Completed;
            step.completed_at = Some(timestamp);
        }
    }
    activity.status = ActivityStatus::Completed;
    activity.completed_at = Some(timestamp);
}

/// Failure marks the currently running step failed with the error; other
/// steps are left unchanged.
fn fail_activity(activity: &mut Activity, timestamp: DateTime<Utc>, error: Option<String>) {
    for step in &mut activity.steps {
        if step.status == StepStatus::Running {
            step.status = StepStatus::Failed;
            step.completed_at = Some(timestamp);
            step.error = error.clone();
        }
    }
    activity.status = ActivityStatus::Failed;
    activity.completed_at = Some(timestamp);
}

fn apply_step_updates(
    activity: &mut Activity,
    updates: &[(String, StepStatus, DateTime<Utc>)],
) {
    let mut latest: HashMap<&str, (StepStatus, DateTime<Utc>)> = HashMap::new();
    for (name, status, timestamp) in updates {
        match latest.get(name.as_str()) {
            Some((_, seen)) if *seen >= *timestamp => {}
            _ => {
                latest.insert(name.as_str(), (*status, *timestamp));
            }
        }
    }

    for step in &mut activity.steps {
        if let Some((status, timestamp)) = latest.get(step.name.as_str()) {
            step.status = *status;
            step.completed_at = status.is_terminal().then_some(*timestamp);
            if step.started_at.is_none() && *status != StepStatus::Pending {
                step.started_at = Some(*timestamp);
            }
        }
    }
}

/// Read-only activity view over the coordination substrate.
#[derive(Debug, Clone)]
pub struct ActivityService {
    client: Arc<CoordinationClient>,
}

impl ActivityService {
    /// Build a service over a coordination client.
    pub const fn new(client: Arc<CoordinationClient>) -> Self {
        Self { client }
    }

    /// Current and recent devops activities.
    ///
    /// Queries a generous window of recent messages, filters the devops
    /// types and folds. Any substrate error yields an empty view, never a
    /// failure.
    pub async fn get_activity(&self, limit: usize) -> ActivityView {
        let query = MessageQuery {
            limit: limit.saturating_mul(10),
            ..MessageQuery::default()
        };

        match self.client.get_messages(&query).await {
            Ok(messages) => fold_activities(&messages, limit),
            Err(e) => {
                warn!(error = %e, "coordination unavailable, returning empty activity view");
                ActivityView::empty()
            }
        }
    }

    /// The newest in-progress activity, if any.
    pub async fn get_current_activity(&self) -> Option<Activity> {
        self.get_activity(1).await.current
    }

    /// Recently finished activities, newest first.
    pub async fn get_recent_activities(&self, limit: usize) -> Vec<Activity> {
        let view = self.get_activity(limit).await;
        debug!(count = view.recent.len(), "fetched recent activities");
        view.recent
    }
}
