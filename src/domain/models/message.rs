//! Coordination message domain model.
//!
//! Messages are the events exchanged between instances over the
//! coordination substrate. They are stored as flat Redis hashes and
//! announced through pub/sub notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::errors::CoordinationResult;

/// Kind of a coordination message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Free-form coordination message
    General,
    /// Work is ready for review
    ReadyForReview,
    /// Progress or state report
    StatusUpdate,
    /// A shared interface changed
    InterfaceUpdate,
    /// Liveness signal
    Heartbeat,
    /// A review finished
    ReviewComplete,
    /// A devops operation started
    DevopsStarted,
    /// A devops operation step changed state
    DevopsStepUpdate,
    /// A devops operation finished successfully
    DevopsComplete,
    /// A devops operation failed
    DevopsFailed,
    /// A swarm review session started
    SwarmStarted,
    /// One swarm reviewer finished
    SwarmReviewerComplete,
    /// A swarm review session finished
    SwarmComplete,
    /// A swarm review session failed
    SwarmFailed,
}

impl MessageType {
    /// Wire representation used in hashes and notification JSON.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::ReadyForReview => "ready_for_review",
            Self::StatusUpdate => "status_update",
            Self::InterfaceUpdate => "interface_update",
            Self::Heartbeat => "heartbeat",
            Self::ReviewComplete => "review_complete",
            Self::DevopsStarted => "devops_started",
            Self::DevopsStepUpdate => "devops_step_update",
            Self::DevopsComplete => "devops_complete",
            Self::DevopsFailed => "devops_failed",
            Self::SwarmStarted => "swarm_started",
            Self::SwarmReviewerComplete => "swarm_reviewer_complete",
            Self::SwarmComplete => "swarm_complete",
            Self::SwarmFailed => "swarm_failed",
        }
    }

    /// Parse the wire representation. Returns `None` for unknown values.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "general" => Some(Self::General),
            "ready_for_review" => Some(Self::ReadyForReview),
            "status_update" => Some(Self::StatusUpdate),
            "interface_update" => Some(Self::InterfaceUpdate),
            "heartbeat" => Some(Self::Heartbeat),
            "review_complete" => Some(Self::ReviewComplete),
            "devops_started" => Some(Self::DevopsStarted),
            "devops_step_update" => Some(Self::DevopsStepUpdate),
            "devops_complete" => Some(Self::DevopsComplete),
            "devops_failed" => Some(Self::DevopsFailed),
            "swarm_started" => Some(Self::SwarmStarted),
            "swarm_reviewer_complete" => Some(Self::SwarmReviewerComplete),
            "swarm_complete" => Some(Self::SwarmComplete),
            "swarm_failed" => Some(Self::SwarmFailed),
            _ => None,
        }
    }

    /// Whether this type belongs to the devops activity stream.
    pub const fn is_devops(&self) -> bool {
        matches!(
            self,
            Self::DevopsStarted | Self::DevopsStepUpdate | Self::DevopsComplete | Self::DevopsFailed
        )
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Subject and body of a coordination message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    /// Brief subject line.
    pub subject: String,
    /// Detailed message content. Devops messages carry a JSON document here.
    pub description: String,
}

/// A coordination event exchanged between instances.
///
/// `acknowledged` is monotonic: once set it never reverts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinationMessage {
    /// Unique id in `msg-<8 hex>` format.
    pub id: String,
    /// Message kind.
    #[serde(rename = "type")]
    pub msg_type: MessageType,
    /// Sender instance id.
    #[serde(rename = "from")]
    pub from_instance: String,
    /// Recipient instance id, or `"all"` for broadcast.
    #[serde(rename = "to")]
    pub to_instance: String,
    /// Publish time, UTC, second precision.
    #[serde(with = "iso_seconds")]
    pub timestamp: DateTime<Utc>,
    /// Whether the recipient must acknowledge.
    pub requires_ack: bool,
    /// Whether the message has been acknowledged.
    pub acknowledged: bool,
    /// Instance that acknowledged, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_by: Option<String>,
    /// Acknowledgement time, if any.
    #[serde(default, with = "iso_seconds_opt", skip_serializing_if = "Option::is_none")]
    pub ack_timestamp: Option<DateTime<Utc>>,
    /// Free-form acknowledgement comment, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_comment: Option<String>,
    /// Subject and body.
    pub payload: MessagePayload,
}

/// The reserved broadcast recipient id.
pub const BROADCAST_INSTANCE: &str = "all";

/// Generate a unique message id in `msg-<8 hex>` format.
pub fn generate_message_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("msg-{}", &hex[..8])
}

/// A small event describing a just-published message.
///
/// Delivered over pub/sub to live subscribers and queued as JSON for
/// offline recipients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// Event tag; always `"message_published"` today.
    #[serde(default = "default_event_tag")]
    pub event: String,
    /// Id of the published message.
    pub message_id: String,
    /// Kind of the published message.
    #[serde(rename = "type")]
    pub msg_type: MessageType,
    /// Sender instance id.
    #[serde(rename = "from")]
    pub from_instance: String,
    /// Recipient instance id.
    #[serde(rename = "to")]
    pub to_instance: String,
    /// Whether the message requires acknowledgement.
    pub requires_ack: bool,
    /// Publish time, UTC, second precision.
    #[serde(with = "iso_seconds")]
    pub timestamp: DateTime<Utc>,
}

fn default_event_tag() -> String {
    "message_published".to_string()
}

impl NotificationEvent {
    /// Build the notification for a freshly published message.
    pub fn for_message(message: &CoordinationMessage) -> Self {
        Self {
            event: default_event_tag(),
            message_id: message.id.clone(),
            msg_type: message.msg_type,
            from_instance: message.from_instance.clone(),
            to_instance: message.to_instance.clone(),
            requires_ack: message.requires_ack,
            timestamp: message.timestamp,
        }
    }

    /// Encode to the on-wire JSON record.
    pub fn to_json(&self) -> CoordinationResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from the on-wire JSON record, rejecting unknown enum values.
    pub fn from_json(json: &str) -> CoordinationResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Filter criteria for querying coordination messages.
#[derive(Debug, Clone)]
pub struct MessageQuery {
    /// Restrict to messages addressed to this instance (inbox seed).
    pub to_instance: Option<String>,
    /// Restrict to messages sent by this instance.
    pub from_instance: Option<String>,
    /// Restrict to one message kind.
    pub msg_type: Option<MessageType>,
    /// Only unacknowledged `requires_ack` messages.
    pub pending_only: bool,
    /// Only messages at or after this time.
    pub since: Option<DateTime<Utc>>,
    /// Maximum number of results.
    pub limit: usize,
}

/// Default result limit for message queries.
pub const DEFAULT_QUERY_LIMIT: usize = 50;

impl Default for MessageQuery {
    fn default() -> Self {
        Self {
            to_instance: None,
            from_instance: None,
            msg_type: None,
            pending_only: false,
            since: None,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

/// Aggregate counters for the coordination system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationStats {
    /// Messages currently indexed in the timeline.
    pub total_messages: u64,
    /// Messages awaiting acknowledgement.
    pub pending_messages: u64,
    /// Per-type counters. Empty unless a counting index is configured.
    pub messages_by_type: HashMap<String, u64>,
    /// Number of live instances.
    pub active_instances: usize,
    /// Ids of the live instances.
    pub instance_names: Vec<String>,
}

/// Format a timestamp as second-precision ISO-8601 UTC with a `Z` suffix.
pub fn format_utc_seconds(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Parse an ISO-8601 UTC timestamp, accepting a trailing `Z` as `+00:00`.
pub fn parse_utc_seconds(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
}

/// Serde adapter for second-precision ISO-8601 UTC timestamps.
pub mod iso_seconds {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as `%Y-%m-%dT%H:%M:%SZ`.
    pub fn serialize<S: Serializer>(
        timestamp: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_utc_seconds(timestamp))
    }

    /// Deserialize from RFC 3339, accepting a trailing `Z`.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_utc_seconds(&raw).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for optional second-precision ISO-8601 UTC timestamps.
pub mod iso_seconds_opt {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize `Some` as `%Y-%m-%dT%H:%M:%SZ`, `None` as null.
    pub fn serialize<S: Serializer>(
        timestamp: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match timestamp {
            Some(ts) => serializer.serialize_str(&super::format_utc_seconds(ts)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional RFC 3339 timestamp.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| super::parse_utc_seconds(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_message_type_round_trip() {
        for msg_type in [
            MessageType::General,
            MessageType::ReadyForReview,
            MessageType::StatusUpdate,
            MessageType::InterfaceUpdate,
            MessageType::Heartbeat,
            MessageType::ReviewComplete,
            MessageType::DevopsStarted,
            MessageType::DevopsStepUpdate,
            MessageType::DevopsComplete,
            MessageType::DevopsFailed,
            MessageType::SwarmStarted,
            MessageType::SwarmReviewerComplete,
            MessageType::SwarmComplete,
            MessageType::SwarmFailed,
        ] {
            assert_eq!(MessageType::from_str(msg_type.as_str()), Some(msg_type));
        }
        assert_eq!(MessageType::from_str("nonsense"), None);
    }

    #[test]
    fn test_devops_types() {
        assert!(MessageType::DevopsStarted.is_devops());
        assert!(MessageType::DevopsFailed.is_devops());
        assert!(!MessageType::SwarmComplete.is_devops());
        assert!(!MessageType::General.is_devops());
    }

    #[test]
    fn test_generate_message_id_format() {
        let id = generate_message_id();
        assert!(id.starts_with("msg-"));
        assert_eq!(id.len(), 12);
        assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let ids: std::collections::HashSet<String> =
            (0..256).map(|_| generate_message_id()).collect();
        assert_eq!(ids.len(), 256);
    }

    #[test]
    fn test_notification_json_exact_keys() {
        let timestamp = Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 0).unwrap();
        let event = NotificationEvent {
            event: "message_published".into(),
            message_id: "msg-abc12345".into(),
            msg_type: MessageType::ReadyForReview,
            from_instance: "backend".into(),
            to_instance: "orchestrator".into(),
            requires_ack: true,
            timestamp,
        };

        let json: serde_json::Value =
            serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(json["event"], "message_published");
        assert_eq!(json["message_id"], "msg-abc12345");
        assert_eq!(json["type"], "ready_for_review");
        assert_eq!(json["from"], "backend");
        assert_eq!(json["to"], "orchestrator");
        assert_eq!(json["requires_ack"], true);
        assert_eq!(json["timestamp"], "2025-06-01T12:30:00Z");
    }

    #[test]
    fn test_notification_round_trip() {
        let timestamp = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 5).unwrap();
        let event = NotificationEvent {
            event: "message_published".into(),
            message_id: "msg-00ff00ff".into(),
            msg_type: MessageType::StatusUpdate,
            from_instance: "a".into(),
            to_instance: "b".into(),
            requires_ack: false,
            timestamp,
        };

        let decoded = NotificationEvent::from_json(&event.to_json().unwrap()).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_notification_rejects_invalid_type() {
        let json = r#"{"event":"message_published","message_id":"msg-1",
            "type":"bogus","from":"a","to":"b","requires_ack":false,
            "timestamp":"2025-06-01T08:00:05Z"}"#;
        assert!(NotificationEvent::from_json(json).is_err());
    }

    #[test]
    fn test_parse_accepts_trailing_z() {
        let parsed = parse_utc_seconds("2025-06-01T08:00:05Z").unwrap();
        let explicit = parse_utc_seconds("2025-06-01T08:00:05+00:00").unwrap();
        assert_eq!(parsed, explicit);
    }

    #[test]
    fn test_query_defaults() {
        let query = MessageQuery::default();
        assert_eq!(query.limit, DEFAULT_QUERY_LIMIT);
        assert!(!query.pending_only);
        assert!(query.to_instance.is_none());
    }
}
