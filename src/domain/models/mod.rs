//! Domain models
//!
//! Pure domain entities with business logic and validation rules.
//! These models are framework-agnostic and contain no infrastructure concerns.

pub mod activity;
pub mod config;
pub mod message;
pub mod presence;
pub mod swarm;

pub use activity::{
    Activity, ActivityEventPayload, ActivityStatus, ActivityStep, ActivityView, StepStatus,
};
pub use config::{Config, CoordinationConfig, LoggingConfig, SwarmConfig};
pub use message::{
    generate_message_id, CoordinationMessage, CoordinationStats, MessagePayload, MessageQuery,
    MessageType, NotificationEvent, BROADCAST_INSTANCE, DEFAULT_QUERY_LIMIT,
};
pub use presence::PresenceInfo;
pub use swarm::{
    generate_session_id, ReviewFinding, ReviewerResult, ReviewerStatus, Severity, SwarmSession,
    SwarmStatus, UnifiedReport,
};
