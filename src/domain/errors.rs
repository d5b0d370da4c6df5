//! Error hierarchy for the coordination substrate.
//!
//! A single enum covers every failure class so errors can cross instance
//! boundaries as a `(kind, message, details)` triple.

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised by the coordination substrate and the swarm layer.
#[derive(Debug, Error)]
pub enum CoordinationError {
    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Backend ping or command failed at the transport level.
    #[error("redis connection failed: {0}")]
    Connection(String),

    /// A message with this id already exists.
    #[error("message id already exists: {message_id}")]
    DuplicatePublish {
        /// The id that collided.
        message_id: String,
    },

    /// Publishing a message failed after the duplicate check.
    #[error("failed to publish message {message_id}: {message}")]
    Publish {
        /// Id of the message being published.
        message_id: String,
        /// Underlying failure.
        message: String,
    },

    /// Acknowledging a message failed.
    #[error("failed to acknowledge message {message_id}: {message}")]
    Acknowledge {
        /// Id of the message being acknowledged.
        message_id: String,
        /// Underlying failure.
        message: String,
    },

    /// Presence registration, heartbeat, or read failed.
    #[error("presence operation failed for {instance_id}: {message}")]
    Presence {
        /// Instance the operation targeted.
        instance_id: String,
        /// Underlying failure.
        message: String,
    },

    /// Swarm session state or dispatch failure.
    #[error("swarm session {session_id}: {message}")]
    Swarm {
        /// Session id the failure is scoped to.
        session_id: String,
        /// Underlying failure.
        message: String,
    },

    /// Encoding or decoding of a wire record failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Generic coordination backend failure with operation context.
    #[error("coordination backend error: {0}")]
    Backend(String),
}

/// Convenience alias for coordination results.
pub type CoordinationResult<T> = Result<T, CoordinationError>;

impl CoordinationError {
    /// Stable kind tag for cross-language transport.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Connection(_) => "connection",
            Self::DuplicatePublish { .. } => "duplicate_publish",
            Self::Publish { .. } => "publish",
            Self::Acknowledge { .. } => "acknowledge",
            Self::Presence { .. } => "presence",
            Self::Swarm { .. } => "swarm",
            Self::Serialization(_) => "serialization",
            Self::Backend(_) => "coordination",
        }
    }

    /// Structured details carried alongside the message.
    pub fn details(&self) -> Map<String, Value> {
        let mut details = Map::new();
        match self {
            Self::DuplicatePublish { message_id }
            | Self::Publish { message_id, .. }
            | Self::Acknowledge { message_id, .. } => {
                details.insert("message_id".into(), Value::String(message_id.clone()));
            }
            Self::Presence { instance_id, .. } => {
                details.insert("instance_id".into(), Value::String(instance_id.clone()));
            }
            Self::Swarm { session_id, .. } => {
                details.insert("session_id".into(), Value::String(session_id.clone()));
            }
            _ => {}
        }
        details
    }

    /// JSON form suitable for transport to non-Rust consumers.
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "error": self.kind(),
            "message": self.to_string(),
            "details": Value::Object(self.details()),
        })
    }
}

impl From<redis::RedisError> for CoordinationError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_io_error() {
            Self::Connection(err.to_string())
        } else {
            Self::Backend(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CoordinationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_are_stable() {
        assert_eq!(
            CoordinationError::Configuration("x".into()).kind(),
            "configuration"
        );
        assert_eq!(
            CoordinationError::DuplicatePublish {
                message_id: "msg-deadbeef".into()
            }
            .kind(),
            "duplicate_publish"
        );
        assert_eq!(CoordinationError::Backend("x".into()).kind(), "coordination");
    }

    #[test]
    fn test_details_carry_context() {
        let err = CoordinationError::Publish {
            message_id: "msg-12345678".into(),
            message: "boom".into(),
        };
        let details = err.details();
        assert_eq!(
            details.get("message_id").and_then(Value::as_str),
            Some("msg-12345678")
        );
    }

    #[test]
    fn test_to_json_shape() {
        let err = CoordinationError::Swarm {
            session_id: "swarm-abc12345".into(),
            message: "aggregation failed".into(),
        };
        let json = err.to_json();
        assert_eq!(json["error"], "swarm");
        assert_eq!(json["details"]["session_id"], "swarm-abc12345");
        assert!(json["message"]
            .as_str()
            .unwrap()
            .contains("aggregation failed"));
    }
}
