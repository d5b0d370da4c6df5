//! Coordination publisher port.

use async_trait::async_trait;

use crate::domain::errors::CoordinationResult;
use crate::domain::models::{CoordinationMessage, MessageType};

/// Publishes lifecycle events onto the coordination substrate.
///
/// The swarm dispatcher depends on this port rather than the full
/// coordination client so it can run against a recording double in tests.
#[async_trait]
pub trait CoordinationPublisher: Send + Sync {
    /// Publish one coordination message and return its stored form.
    async fn publish(
        &self,
        msg_type: MessageType,
        subject: &str,
        description: &str,
        from_instance: &str,
        to_instance: &str,
        requires_ack: bool,
    ) -> CoordinationResult<CoordinationMessage>;
}
