//! Redis-backed instance presence tracking.
//!
//! Presence lives in a single hash whose fields pack the instance id and
//! attribute name; staleness is computed on read, never stored.

use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::adapters::redis::keys::{presence_field, split_presence_field, CoordinationKeys};
use crate::domain::errors::{CoordinationError, CoordinationResult};
use crate::domain::models::message::{format_utc_seconds, parse_utc_seconds};
use crate::domain::models::{CoordinationConfig, PresenceInfo};

/// Register, heartbeat, unregister and read instance presence.
#[derive(Clone)]
pub struct PresenceTracker {
    conn: ConnectionManager,
    keys: CoordinationKeys,
    config: Arc<CoordinationConfig>,
}

impl std::fmt::Debug for PresenceTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceTracker")
            .field("prefix", &self.keys.prefix())
            .finish_non_exhaustive()
    }
}

impl PresenceTracker {
    /// Build a tracker over a shared connection.
    pub fn new(conn: ConnectionManager, config: Arc<CoordinationConfig>) -> Self {
        let keys = CoordinationKeys::new(config.key_prefix.clone());
        Self { conn, keys, config }
    }

    fn wrap(instance_id: &str) -> impl Fn(redis::RedisError) -> CoordinationError + '_ {
        move |e| CoordinationError::Presence {
            instance_id: instance_id.to_string(),
            message: e.to_string(),
        }
    }

    /// Register an instance as active, optionally attaching a session id.
    pub async fn register(
        &self,
        instance_id: &str,
        session_id: Option<&str>,
    ) -> CoordinationResult<()> {
        let now = format_utc_seconds(&Utc::now());
        let mut fields: Vec<(String, String)> = vec![
            (presence_field(instance_id, "active"), "1".to_string()),
            (presence_field(instance_id, "last_heartbeat"), now),
        ];
        if let Some(session_id) = session_id {
            fields.push((
                presence_field(instance_id, "session_id"),
                session_id.to_string(),
            ));
        }

        let mut conn = self.conn.clone();
        conn.hset_multiple::<_, _, _, ()>(self.keys.presence(), &fields)
            .await
            .map_err(Self::wrap(instance_id))?;

        info!(instance_id, "registered instance");
        Ok(())
    }

    /// Refresh only the heartbeat timestamp.
    pub async fn heartbeat(&self, instance_id: &str) -> CoordinationResult<()> {
        let mut conn = self.conn.clone();
        conn.hset::<_, _, _, ()>(
            self.keys.presence(),
            presence_field(instance_id, "last_heartbeat"),
            format_utc_seconds(&Utc::now()),
        )
        .await
        .map_err(Self::wrap(instance_id))?;

        debug!(instance_id, "heartbeat");
        Ok(())
    }

    /// Remove all presence fields for an instance.
    pub async fn unregister(&self, instance_id: &str) -> CoordinationResult<()> {
        let mut conn = self.conn.clone();
        let fields = vec![
            presence_field(instance_id, "active"),
            presence_field(instance_id, "last_heartbeat"),
            presence_field(instance_id, "session_id"),
        ];
        conn.hdel::<_, _, ()>(self.keys.presence(), fields)
        .await
        .map_err(Self::wrap(instance_id))?;

        info!(instance_id, "unregistered instance");
        Ok(())
    }

    /// Read presence for all registered instances.
    ///
    /// Entries whose heartbeat is older than the timeout read as inactive
    /// regardless of the stored flag.
    pub async fn get_presence(
        &self,
        timeout_minutes: Option<i64>,
    ) -> CoordinationResult<HashMap<String, PresenceInfo>> {
        let timeout = timeout_minutes.unwrap_or(self.config.presence_timeout_minutes);
        let mut conn = self.conn.clone();

        let raw: HashMap<String, String> = conn
            .hgetall(self.keys.presence())
            .await
            .map_err(Self::wrap("*"))?;

        let mut grouped: HashMap<String, HashMap<&str, String>> = HashMap::new();
        for (field, value) in &raw {
            if let Some((instance_id, attribute)) = split_presence_field(field) {
                grouped
                    .entry(instance_id.to_string())
                    .or_default()
                    .insert(attribute, value.clone());
            }
        }

        let now = Utc::now();
        let mut result = HashMap::new();
        for (instance_id, fields) in grouped {
            let last_heartbeat = fields
                .get("last_heartbeat")
                .and_then(|raw| parse_utc_seconds(raw).ok())
                .unwrap_or(now);

            let info = PresenceInfo {
                instance_id: instance_id.clone(),
                active: fields.get("active").map(String::as_str) == Some("1"),
                last_heartbeat,
                session_id: fields.get("session_id").cloned(),
            }
            .with_staleness(timeout, now);

            result.insert(instance_id, info);
        }

        Ok(result)
    }
}
