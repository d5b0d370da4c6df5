//! Notification handler port.

use async_trait::async_trait;

use crate::domain::models::NotificationEvent;

/// Receives decoded notifications from a subscription or an offline drain.
///
/// Handlers are awaited in series on the listener task; anything needing
/// parallelism must dispatch its own tasks. A recipient that is live and
/// also drains its queue at startup may see the same notification twice,
/// so handlers must be idempotent on `message_id`.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    /// Process one notification. Failures are the handler's concern; the
    /// listener keeps running regardless.
    async fn handle(&self, event: NotificationEvent);
}
