//! Synapse - Inter-Instance Coordination Substrate
//!
//! Redis-backed, durable, at-least-once coordination for multi-agent
//! development instances:
//! - Message publish/query/acknowledge with pub/sub notifications and a
//!   per-instance offline queue
//! - Instance presence with heartbeats and staleness-on-read
//! - Parallel reviewer swarms with fan-out/fan-in, partial-failure
//!   capture and deduplicated aggregation
//! - Activity views folded from the ordered coordination event stream

pub mod adapters;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export key types for convenience
pub use domain::errors::{CoordinationError, CoordinationResult};
pub use domain::models::{
    Activity, ActivityView, CoordinationMessage, CoordinationStats, MessageQuery, MessageType,
    NotificationEvent, PresenceInfo, ReviewFinding, ReviewerResult, Severity, SwarmSession,
    SwarmStatus, UnifiedReport,
};
pub use services::{
    coordination_client, ActivityService, CoordinationClient, PublishRequest, SwarmDispatcher,
};
