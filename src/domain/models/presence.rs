//! Instance presence domain model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Presence entry for one registered instance.
///
/// Staleness is computed on read, never stored: an instance whose last
/// heartbeat is older than the configured timeout reads as inactive even
/// when the raw flag is still set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceInfo {
    /// The instance this entry describes.
    pub instance_id: String,
    /// Whether the instance is considered live.
    pub active: bool,
    /// Last heartbeat time.
    #[serde(with = "super::message::iso_seconds")]
    pub last_heartbeat: DateTime<Utc>,
    /// Session identifier attached at registration, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl PresenceInfo {
    /// Whether the last heartbeat is older than `timeout_minutes`.
    pub fn is_stale(&self, timeout_minutes: i64, now: DateTime<Utc>) -> bool {
        now - self.last_heartbeat > Duration::minutes(timeout_minutes)
    }

    /// Copy of this entry with the live flag recomputed against `now`.
    pub fn with_staleness(self, timeout_minutes: i64, now: DateTime<Utc>) -> Self {
        if self.is_stale(timeout_minutes, now) {
            Self {
                active: false,
                ..self
            }
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(minutes_ago: i64, now: DateTime<Utc>) -> PresenceInfo {
        PresenceInfo {
            instance_id: "c".into(),
            active: true,
            last_heartbeat: now - Duration::minutes(minutes_ago),
            session_id: None,
        }
    }

    #[test]
    fn test_fresh_heartbeat_is_not_stale() {
        let now = Utc::now();
        assert!(!entry(2, now).is_stale(5, now));
    }

    #[test]
    fn test_old_heartbeat_is_stale() {
        let now = Utc::now();
        assert!(entry(10, now).is_stale(5, now));
    }

    #[test]
    fn test_staleness_forces_inactive() {
        let now = Utc::now();
        let marked = entry(10, now).with_staleness(5, now);
        assert!(!marked.active);
    }

    #[test]
    fn test_fresh_entry_keeps_flag() {
        let now = Utc::now();
        let marked = entry(1, now).with_staleness(5, now);
        assert!(marked.active);
    }
}
