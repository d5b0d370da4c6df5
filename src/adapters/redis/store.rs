//! Redis-backed coordination store.
//!
//! Uniquely owns the on-Redis representation of messages: every index
//! mutation runs through a transaction pipeline here so all effects of a
//! publish or acknowledge become visible together.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::adapters::redis::codec;
use crate::adapters::redis::keys::CoordinationKeys;
use crate::domain::errors::{CoordinationError, CoordinationResult};
use crate::domain::models::{
    CoordinationMessage, MessageQuery, NotificationEvent,
};
use crate::domain::models::message::format_utc_seconds;

/// Atomic Redis operations for publish, acknowledge, lookup and query.
#[derive(Clone)]
pub struct CoordinationStore {
    conn: ConnectionManager,
    keys: CoordinationKeys,
    config: Arc<crate::domain::models::CoordinationConfig>,
}

impl std::fmt::Debug for CoordinationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinationStore")
            .field("prefix", &self.keys.prefix())
            .finish_non_exhaustive()
    }
}

impl CoordinationStore {
    /// Build a store over a shared connection.
    pub fn new(
        conn: ConnectionManager,
        config: Arc<crate::domain::models::CoordinationConfig>,
    ) -> Self {
        let keys = CoordinationKeys::new(config.key_prefix.clone());
        Self { conn, keys, config }
    }

    /// Key namer used by this store.
    pub const fn keys(&self) -> &CoordinationKeys {
        &self.keys
    }

    /// Publish a message atomically.
    ///
    /// The duplicate-id check runs before the transaction; inside it, in
    /// order: message hash + TTL, timeline insert + trim, inbox insert,
    /// pending insert when acknowledgement is required, then the
    /// notification to the instance and broadcast channels.
    pub async fn publish(
        &self,
        message: &CoordinationMessage,
        notification: &NotificationEvent,
    ) -> CoordinationResult<()> {
        let msg_key = self.keys.message(&message.id);
        let mut conn = self.conn.clone();

        let exists: bool = conn.exists(&msg_key).await.map_err(|e| {
            CoordinationError::Publish {
                message_id: message.id.clone(),
                message: e.to_string(),
            }
        })?;
        if exists {
            return Err(CoordinationError::DuplicatePublish {
                message_id: message.id.clone(),
            });
        }

        let notification_json = notification.to_json()?;
        let fields = codec::encode_message(message);
        let timeline_trim_stop = -(i64::try_from(self.config.timeline_max_size).unwrap_or(i64::MAX)) - 1;

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.hset_multiple(&msg_key, &fields).ignore();
        pipe.expire(&msg_key, self.config.message_ttl_seconds() as i64)
            .ignore();
        pipe.zadd(
            self.keys.timeline(),
            &message.id,
            message.timestamp.timestamp(),
        )
        .ignore();
        pipe.zremrangebyrank(self.keys.timeline(), 0, timeline_trim_stop as isize)
            .ignore();
        pipe.sadd(self.keys.inbox(&message.to_instance), &message.id)
            .ignore();
        if message.requires_ack {
            pipe.sadd(self.keys.pending(), &message.id).ignore();
        }
        pipe.publish(
            self.keys.instance_channel(&message.to_instance),
            &notification_json,
        )
        .ignore();
        pipe.publish(self.keys.broadcast_channel(), &notification_json)
            .ignore();

        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(|e| CoordinationError::Publish {
                message_id: message.id.clone(),
                message: e.to_string(),
            })?;

        info!(
            message_id = %message.id,
            msg_type = %message.msg_type,
            from = %message.from_instance,
            to = %message.to_instance,
            "published coordination message"
        );
        Ok(())
    }

    /// Fetch a message by id. `None` when absent or expired.
    pub async fn get(&self, message_id: &str) -> CoordinationResult<Option<CoordinationMessage>> {
        let mut conn = self.conn.clone();
        let hash: HashMap<String, String> = conn.hgetall(self.keys.message(message_id)).await?;
        if hash.is_empty() {
            return Ok(None);
        }
        codec::decode_message(&hash).map(Some)
    }

    /// Acknowledge a message. Idempotent: acknowledging an acknowledged
    /// message returns `true` without further writes; a missing message
    /// returns `false`.
    pub async fn acknowledge(
        &self,
        message_id: &str,
        ack_by: &str,
        comment: Option<&str>,
    ) -> CoordinationResult<bool> {
        let msg_key = self.keys.message(message_id);
        let mut conn = self.conn.clone();

        let wrap = |e: redis::RedisError| CoordinationError::Acknowledge {
            message_id: message_id.to_string(),
            message: e.to_string(),
        };

        let exists: bool = conn.exists(&msg_key).await.map_err(wrap)?;
        if !exists {
            warn!(message_id, "message not found for acknowledgement");
            return Ok(false);
        }

        let current: Option<String> = conn.hget(&msg_key, "acknowledged").await.map_err(wrap)?;
        if current.as_deref() == Some("1") {
            debug!(message_id, "message already acknowledged");
            return Ok(true);
        }

        let mut fields: Vec<(&str, String)> = vec![
            ("acknowledged", "1".to_string()),
            ("ack_by", ack_by.to_string()),
            ("ack_timestamp", format_utc_seconds(&chrono::Utc::now())),
        ];
        if let Some(comment) = comment {
            fields.push(("ack_comment", comment.to_string()));
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.hset_multiple(&msg_key, &fields).ignore();
        pipe.srem(self.keys.pending(), message_id).ignore();
        pipe.query_async::<()>(&mut conn).await.map_err(wrap)?;

        info!(message_id, ack_by, "acknowledged coordination message");
        Ok(true)
    }

    /// Query messages with conjunctive filters, newest first.
    ///
    /// Candidate ids come from the recipient inbox when `to_instance` is
    /// set, intersected with the pending set when `pending_only` is set;
    /// otherwise the timeline seeds the candidates (by score when `since`
    /// is set, by reverse rank otherwise). Ids whose hash has expired are
    /// skipped silently.
    pub async fn query(
        &self,
        query: &MessageQuery,
    ) -> CoordinationResult<Vec<CoordinationMessage>> {
        let mut conn = self.conn.clone();

        let mut candidates: Option<HashSet<String>> = None;

        if let Some(to_instance) = &query.to_instance {
            let inbox: HashSet<String> = conn.smembers(self.keys.inbox(to_instance)).await?;
            candidates = Some(inbox);
        }

        if query.pending_only {
            let pending: HashSet<String> = conn.smembers(self.keys.pending()).await?;
            candidates = Some(match candidates {
                Some(existing) => existing.intersection(&pending).cloned().collect(),
                None => pending,
            });
        }

        let ids: Vec<String> = match candidates {
            Some(set) => set.into_iter().collect(),
            None => {
                if let Some(since) = query.since {
                    conn.zrangebyscore(self.keys.timeline(), since.timestamp(), "+inf")
                        .await?
                } else {
                    // Fetch extra so post-hydration filters still fill the limit.
                    conn.zrevrange(self.keys.timeline(), 0, (query.limit * 2) as isize - 1)
                        .await?
                }
            }
        };

        let mut messages = Vec::new();
        for id in ids {
            let hash: HashMap<String, String> = conn.hgetall(self.keys.message(&id)).await?;
            if hash.is_empty() {
                continue; // expired while still indexed elsewhere
            }
            let message = match codec::decode_message(&hash) {
                Ok(message) => message,
                Err(e) => {
                    warn!(message_id = %id, error = %e, "skipping undecodable message");
                    continue;
                }
            };

            if let Some(from_instance) = &query.from_instance {
                if &message.from_instance != from_instance {
                    continue;
                }
            }
            if let Some(msg_type) = query.msg_type {
                if message.msg_type != msg_type {
                    continue;
                }
            }
            if let Some(since) = query.since {
                if message.timestamp < since {
                    continue;
                }
            }

            messages.push(message);
        }

        messages.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        messages.truncate(query.limit);
        Ok(messages)
    }

    /// Timeline and pending cardinalities, read in one non-transactional
    /// pipeline round-trip.
    pub async fn counts(&self) -> CoordinationResult<(u64, u64)> {
        let mut conn = self.conn.clone();
        let (total, pending): (u64, u64) = redis::pipe()
            .zcard(self.keys.timeline())
            .scard(self.keys.pending())
            .query_async(&mut conn)
            .await?;
        Ok((total, pending))
    }
}
