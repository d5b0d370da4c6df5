//! Notification fan-out and offline queueing.
//!
//! Live delivery happens over pub/sub as part of the publish pipeline;
//! this bus owns the subscriber side and the per-instance offline FIFO
//! queue that covers recipients who were not listening.

use futures::StreamExt;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapters::redis::keys::CoordinationKeys;
use crate::domain::errors::{CoordinationError, CoordinationResult};
use crate::domain::models::{CoordinationConfig, NotificationEvent};
use crate::domain::ports::NotificationHandler;

/// A running notification subscription.
///
/// Cancelling unsubscribes and releases the pub/sub connection; joining
/// surfaces a `Connection` error if the stream dropped unexpectedly.
#[derive(Debug)]
pub struct SubscriptionHandle {
    token: CancellationToken,
    task: JoinHandle<CoordinationResult<()>>,
}

impl SubscriptionHandle {
    /// Request cancellation and wait for the listener to unsubscribe.
    pub async fn cancel(self) -> CoordinationResult<()> {
        self.token.cancel();
        self.join().await
    }

    /// Wait for the listener to finish.
    pub async fn join(self) -> CoordinationResult<()> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(CoordinationError::Backend(format!(
                "subscription task panicked: {e}"
            ))),
        }
    }

    /// Whether the listener task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Pub/sub subscriptions plus the offline notification queue.
#[derive(Clone)]
pub struct NotificationBus {
    client: redis::Client,
    conn: ConnectionManager,
    keys: CoordinationKeys,
    config: Arc<CoordinationConfig>,
}

impl std::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationBus")
            .field("prefix", &self.keys.prefix())
            .finish_non_exhaustive()
    }
}

impl NotificationBus {
    /// Build a bus over a shared command connection and a client for
    /// dedicated pub/sub connections.
    pub fn new(
        client: redis::Client,
        conn: ConnectionManager,
        config: Arc<CoordinationConfig>,
    ) -> Self {
        let keys = CoordinationKeys::new(config.key_prefix.clone());
        Self {
            client,
            conn,
            keys,
            config,
        }
    }

    /// Queue a notification for an offline instance.
    ///
    /// Pushes to the left of the queue list and refreshes its TTL to the
    /// message TTL, in one transaction.
    pub async fn queue_notification(
        &self,
        instance_id: &str,
        notification: &NotificationEvent,
    ) -> CoordinationResult<()> {
        let queue_key = self.keys.notification_queue(instance_id);
        let payload = notification.to_json()?;
        let mut conn = self.conn.clone();

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.lpush(&queue_key, &payload).ignore();
        pipe.expire(&queue_key, self.config.message_ttl_seconds() as i64)
            .ignore();
        pipe.query_async::<()>(&mut conn).await?;

        debug!(
            instance_id,
            message_id = %notification.message_id,
            "queued notification for offline instance"
        );
        Ok(())
    }

    /// Pop up to `limit` queued notifications, emptying the queue.
    ///
    /// Read-then-delete runs in one transaction; entries that fail to
    /// decode are skipped with a warning.
    pub async fn pop_notifications(
        &self,
        instance_id: &str,
        limit: usize,
    ) -> CoordinationResult<Vec<NotificationEvent>> {
        let queue_key = self.keys.notification_queue(instance_id);
        let mut conn = self.conn.clone();

        let (raw, _deleted): (Vec<String>, i64) = redis::pipe()
            .atomic()
            .lrange(&queue_key, 0, limit as isize - 1)
            .del(&queue_key)
            .query_async(&mut conn)
            .await?;

        let mut notifications = Vec::with_capacity(raw.len());
        for entry in raw {
            match NotificationEvent::from_json(&entry) {
                Ok(notification) => notifications.push(notification),
                Err(e) => warn!(instance_id, error = %e, "failed to parse queued notification"),
            }
        }

        debug!(
            instance_id,
            count = notifications.len(),
            "popped offline notifications"
        );
        Ok(notifications)
    }

    /// Subscribe to notifications for an instance.
    ///
    /// Listens on the instance channel and, when `include_broadcast` is
    /// set, the broadcast channel. Each decoded event is handed to
    /// `handler` in series on the listener task. The returned handle
    /// cancels the subscription; connection loss resolves the handle with
    /// an error for the caller to handle (typically by resubscribing).
    pub async fn subscribe(
        &self,
        instance_id: &str,
        handler: Arc<dyn NotificationHandler>,
        include_broadcast: bool,
    ) -> CoordinationResult<SubscriptionHandle> {
        let mut channels = vec![self.keys.instance_channel(instance_id)];
        if include_broadcast {
            channels.push(self.keys.broadcast_channel());
        }

        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| CoordinationError::Connection(e.to_string()))?;
        for channel in &channels {
            pubsub
                .subscribe(channel)
                .await
                .map_err(|e| CoordinationError::Connection(e.to_string()))?;
        }
        info!(instance_id, ?channels, "subscribed to notification channels");

        let token = CancellationToken::new();
        let child = token.clone();
        let owner = instance_id.to_string();

        let task = tokio::spawn(async move {
            let outcome = {
                let mut stream = pubsub.on_message();
                loop {
                    tokio::select! {
                        () = child.cancelled() => {
                            info!(instance_id = %owner, "subscription cancelled");
                            break Ok(());
                        }
                        message = stream.next() => match message {
                            Some(message) => {
                                let payload: String = match message.get_payload() {
                                    Ok(payload) => payload,
                                    Err(e) => {
                                        warn!(error = %e, "unreadable pub/sub payload");
                                        continue;
                                    }
                                };
                                match NotificationEvent::from_json(&payload) {
                                    Ok(event) => handler.handle(event).await,
                                    Err(e) => {
                                        warn!(error = %e, "skipping undecodable notification")
                                    }
                                }
                            }
                            None => {
                                break Err(CoordinationError::Connection(
                                    "pub/sub stream closed".to_string(),
                                ));
                            }
                        }
                    }
                }
            };

            for channel in &channels {
                if let Err(e) = pubsub.unsubscribe(channel).await {
                    warn!(channel, error = %e, "unsubscribe failed");
                }
            }
            outcome
        });

        Ok(SubscriptionHandle { token, task })
    }
}
