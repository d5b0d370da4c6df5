//! Coordination client façade.
//!
//! Composes the store, presence tracker and notification bus into the
//! public surface instances use to exchange messages, and exposes the
//! process-wide singleton used by embedding applications.

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::adapters::redis::{
    CoordinationStore, NotificationBus, PresenceTracker, SubscriptionHandle,
};
use crate::domain::errors::{CoordinationError, CoordinationResult};
use crate::domain::models::{
    generate_message_id, CoordinationConfig, CoordinationMessage, CoordinationStats,
    MessagePayload, MessageQuery, MessageType, NotificationEvent, PresenceInfo,
    BROADCAST_INSTANCE,
};
use crate::domain::ports::{CoordinationPublisher, NotificationHandler};
use crate::infrastructure::config::ConfigLoader;

/// Parameters for publishing one coordination message.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    /// Message kind.
    pub msg_type: MessageType,
    /// Sender instance id.
    pub from_instance: String,
    /// Recipient instance id, or `"all"` for broadcast.
    pub to_instance: String,
    /// Brief subject line.
    pub subject: String,
    /// Detailed message content.
    pub description: String,
    /// Whether acknowledgement is required. Defaults to true.
    pub requires_ack: bool,
    /// Caller-supplied message id; generated when absent.
    pub message_id: Option<String>,
}

impl PublishRequest {
    /// A request with acknowledgement required and a generated id.
    pub fn new(
        msg_type: MessageType,
        from_instance: impl Into<String>,
        to_instance: impl Into<String>,
        subject: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            msg_type,
            from_instance: from_instance.into(),
            to_instance: to_instance.into(),
            subject: subject.into(),
            description: description.into(),
            requires_ack: true,
            message_id: None,
        }
    }

    /// Override the acknowledgement requirement.
    pub const fn requires_ack(mut self, requires_ack: bool) -> Self {
        self.requires_ack = requires_ack;
        self
    }

    /// Supply an explicit message id.
    pub fn message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }
}

/// Result of a backend health check.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthReport {
    /// Whether the backend answered the ping.
    pub connected: bool,
    /// `"healthy"` or `"unhealthy"`.
    pub status: String,
    /// Ping round-trip in milliseconds, when connected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    /// Configured key prefix, when connected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_prefix: Option<String>,
    /// Failure description, when unhealthy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Public façade over the coordination substrate.
pub struct CoordinationClient {
    conn: ConnectionManager,
    store: CoordinationStore,
    presence: PresenceTracker,
    bus: NotificationBus,
    config: Arc<CoordinationConfig>,
    instance_id: Option<String>,
    connected: AtomicBool,
    correlation_id: RwLock<Option<String>>,
}

impl std::fmt::Debug for CoordinationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinationClient")
            .field("instance_id", &self.instance_id)
            .field("prefix", &self.config.key_prefix)
            .finish_non_exhaustive()
    }
}

impl CoordinationClient {
    /// Connect to the configured Redis endpoint and build the client.
    pub async fn new(
        config: CoordinationConfig,
        instance_id: Option<String>,
    ) -> CoordinationResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())
            .map_err(|e| CoordinationError::Connection(e.to_string()))?;
        let conn = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| CoordinationError::Connection(e.to_string()))?;

        let config = Arc::new(config);
        debug!(prefix = %config.key_prefix, "coordination client initialized");

        Ok(Self {
            store: CoordinationStore::new(conn.clone(), config.clone()),
            presence: PresenceTracker::new(conn.clone(), config.clone()),
            bus: NotificationBus::new(client, conn.clone(), config.clone()),
            conn,
            config,
            instance_id,
            connected: AtomicBool::new(false),
            correlation_id: RwLock::new(None),
        })
    }

    /// Instance id this client was built for, if any.
    pub fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref()
    }

    /// Coordination configuration in use.
    pub fn config(&self) -> &CoordinationConfig {
        &self.config
    }

    /// Whether `connect` has verified the backend.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Set a correlation id attached to operation logs.
    pub fn set_correlation_id(&self, correlation_id: impl Into<String>) {
        if let Ok(mut slot) = self.correlation_id.write() {
            *slot = Some(correlation_id.into());
        }
    }

    /// Clear the correlation id.
    pub fn clear_correlation_id(&self) {
        if let Ok(mut slot) = self.correlation_id.write() {
            *slot = None;
        }
    }

    /// Current correlation id, if set.
    pub fn correlation_id(&self) -> Option<String> {
        self.correlation_id.read().ok().and_then(|slot| slot.clone())
    }

    /// Enter the client scope: ping-verify the backend and mark connected.
    pub async fn connect(&self) -> CoordinationResult<()> {
        let health = self.health_check().await;
        if !health.connected {
            return Err(CoordinationError::Connection(
                health
                    .error
                    .unwrap_or_else(|| "ping returned unexpected response".to_string()),
            ));
        }
        self.connected.store(true, Ordering::Relaxed);
        debug!("coordination client connected");
        Ok(())
    }

    /// Exit the client scope, clearing per-scope state.
    pub fn close(&self) {
        self.connected.store(false, Ordering::Relaxed);
        self.clear_correlation_id();
        debug!("coordination client closed");
    }

    /// Ping the backend and report connectivity with latency.
    pub async fn health_check(&self) -> HealthReport {
        let mut conn = self.conn.clone();
        let start = std::time::Instant::now();
        match redis::cmd("PING").query_async::<String>(&mut conn).await {
            Ok(pong) if pong == "PONG" => {
                let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
                debug!(latency_ms, "redis health check passed");
                HealthReport {
                    connected: true,
                    status: "healthy".to_string(),
                    latency_ms: Some((latency_ms * 100.0).round() / 100.0),
                    key_prefix: Some(self.config.key_prefix.clone()),
                    error: None,
                }
            }
            Ok(other) => HealthReport {
                connected: false,
                status: "unhealthy".to_string(),
                latency_ms: None,
                key_prefix: None,
                error: Some(format!("PING returned unexpected response: {other}")),
            },
            Err(e) => {
                warn!(error = %e, "redis health check failed");
                HealthReport {
                    connected: false,
                    status: "unhealthy".to_string(),
                    latency_ms: None,
                    key_prefix: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Publish a coordination message atomically and fan out notifications.
    ///
    /// After the pipeline commits, non-broadcast messages take the
    /// queue-if-offline side step; failures there are logged, never
    /// propagated, because publishing already succeeded.
    pub async fn publish_message(
        &self,
        request: PublishRequest,
    ) -> CoordinationResult<CoordinationMessage> {
        let message_id = request.message_id.unwrap_or_else(generate_message_id);
        let timestamp = Utc::now();

        let message = CoordinationMessage {
            id: message_id,
            msg_type: request.msg_type,
            from_instance: request.from_instance,
            to_instance: request.to_instance,
            timestamp,
            requires_ack: request.requires_ack,
            acknowledged: false,
            ack_by: None,
            ack_timestamp: None,
            ack_comment: None,
            payload: MessagePayload {
                subject: request.subject,
                description: request.description,
            },
        };
        let notification = NotificationEvent::for_message(&message);

        debug!(
            message_id = %message.id,
            correlation_id = ?self.correlation_id(),
            instance_id = ?self.instance_id,
            "publishing coordination message"
        );
        self.store.publish(&message, &notification).await?;

        if message.to_instance != BROADCAST_INSTANCE {
            self.queue_if_offline(&message.to_instance, &notification)
                .await;
        }

        Ok(message)
    }

    /// Queue the notification when the recipient is absent or stale.
    ///
    /// Best-effort: presence lookup or queueing failures are logged only.
    async fn queue_if_offline(&self, instance_id: &str, notification: &NotificationEvent) {
        let outcome = async {
            let presence = self.presence.get_presence(None).await?;
            let live = presence
                .get(instance_id)
                .is_some_and(|info| info.active);
            if !live {
                self.bus.queue_notification(instance_id, notification).await?;
                debug!(instance_id, "queued notification for offline instance");
            }
            Ok::<(), CoordinationError>(())
        }
        .await;

        if let Err(e) = outcome {
            warn!(
                instance_id,
                error = %e,
                "failed to check or queue offline notification"
            );
        }
    }

    /// Fetch one message by id. `None` when absent or expired.
    pub async fn get_message(
        &self,
        message_id: &str,
    ) -> CoordinationResult<Option<CoordinationMessage>> {
        self.store.get(message_id).await
    }

    /// Query messages with conjunctive filters, newest first.
    pub async fn get_messages(
        &self,
        query: &MessageQuery,
    ) -> CoordinationResult<Vec<CoordinationMessage>> {
        self.store.query(query).await
    }

    /// Acknowledge a message. Idempotent; `false` when the message is
    /// missing.
    pub async fn acknowledge_message(
        &self,
        message_id: &str,
        ack_by: &str,
        comment: Option<&str>,
    ) -> CoordinationResult<bool> {
        self.store.acknowledge(message_id, ack_by, comment).await
    }

    /// Register an instance as active.
    pub async fn register_instance(
        &self,
        instance_id: &str,
        session_id: Option<&str>,
    ) -> CoordinationResult<()> {
        self.presence.register(instance_id, session_id).await
    }

    /// Refresh an instance heartbeat.
    pub async fn heartbeat(&self, instance_id: &str) -> CoordinationResult<()> {
        self.presence.heartbeat(instance_id).await
    }

    /// Remove an instance from presence.
    pub async fn unregister_instance(&self, instance_id: &str) -> CoordinationResult<()> {
        self.presence.unregister(instance_id).await
    }

    /// Presence for all registered instances, staleness applied on read.
    pub async fn get_presence(
        &self,
        timeout_minutes: Option<i64>,
    ) -> CoordinationResult<std::collections::HashMap<String, PresenceInfo>> {
        self.presence.get_presence(timeout_minutes).await
    }

    /// Aggregate counters plus live-instance names.
    pub async fn get_stats(&self) -> CoordinationResult<CoordinationStats> {
        let (total_messages, pending_messages) = self.store.counts().await?;
        let presence = self.presence.get_presence(None).await?;
        let instance_names: Vec<String> = presence
            .values()
            .filter(|info| info.active)
            .map(|info| info.instance_id.clone())
            .collect();

        Ok(CoordinationStats {
            total_messages,
            pending_messages,
            // Per-type counts need an index the publish pipeline does not
            // maintain.
            messages_by_type: std::collections::HashMap::new(),
            active_instances: instance_names.len(),
            instance_names,
        })
    }

    /// Queue a notification for an offline instance.
    pub async fn queue_notification(
        &self,
        instance_id: &str,
        notification: &NotificationEvent,
    ) -> CoordinationResult<()> {
        self.bus.queue_notification(instance_id, notification).await
    }

    /// Pop queued notifications for an instance, emptying the queue.
    pub async fn pop_notifications(
        &self,
        instance_id: &str,
        limit: usize,
    ) -> CoordinationResult<Vec<NotificationEvent>> {
        self.bus.pop_notifications(instance_id, limit).await
    }

    /// Subscribe to live notifications for an instance.
    pub async fn subscribe_notifications(
        &self,
        instance_id: &str,
        handler: Arc<dyn NotificationHandler>,
        include_broadcast: bool,
    ) -> CoordinationResult<SubscriptionHandle> {
        self.bus.subscribe(instance_id, handler, include_broadcast).await
    }

    /// Drain the offline queue through `handler` before going live.
    ///
    /// Returns the number of notifications replayed.
    pub async fn replay_offline(
        &self,
        instance_id: &str,
        handler: &dyn NotificationHandler,
        limit: usize,
    ) -> CoordinationResult<usize> {
        let notifications = self.pop_notifications(instance_id, limit).await?;
        let count = notifications.len();
        for notification in notifications {
            handler.handle(notification).await;
        }
        if count > 0 {
            info!(instance_id, count, "replayed offline notifications");
        }
        Ok(count)
    }
}

#[async_trait]
impl CoordinationPublisher for CoordinationClient {
    async fn publish(
        &self,
        msg_type: MessageType,
        subject: &str,
        description: &str,
        from_instance: &str,
        to_instance: &str,
        requires_ack: bool,
    ) -> CoordinationResult<CoordinationMessage> {
        self.publish_message(
            PublishRequest::new(msg_type, from_instance, to_instance, subject, description)
                .requires_ack(requires_ack),
        )
        .await
    }
}

static CLIENT_SINGLETON: Mutex<Option<Arc<CoordinationClient>>> = Mutex::const_new(None);

/// Get the process-wide coordination client, creating it on first use.
///
/// `instance_id` and `config` only apply on the creating call; later
/// callers receive the existing client. With no config supplied the
/// environment-backed loader provides one.
pub async fn coordination_client(
    instance_id: Option<&str>,
    config: Option<CoordinationConfig>,
) -> CoordinationResult<Arc<CoordinationClient>> {
    let mut guard = CLIENT_SINGLETON.lock().await;
    if let Some(client) = guard.as_ref() {
        return Ok(client.clone());
    }

    let config = match config {
        Some(config) => config,
        None => ConfigLoader::load()
            .map_err(|e| CoordinationError::Configuration(e.to_string()))?
            .coordination,
    };

    let client = Arc::new(
        CoordinationClient::new(config, instance_id.map(String::from)).await?,
    );
    info!(
        instance_id = ?client.instance_id(),
        prefix = %client.config().key_prefix,
        "created coordination client singleton"
    );
    *guard = Some(client.clone());
    Ok(client)
}

/// Drop the process-wide client so the next call rebuilds it. For tests.
pub async fn reset_coordination_client() {
    let mut guard = CLIENT_SINGLETON.lock().await;
    if guard.take().is_some() {
        info!("reset coordination client singleton");
    }
}
