//! Deterministic naming of Redis keys and channels.
//!
//! Every key the substrate touches is derived here so the on-Redis layout
//! has a single source of truth.

/// Key and channel names for the coordination substrate.
#[derive(Debug, Clone)]
pub struct CoordinationKeys {
    prefix: String,
}

impl CoordinationKeys {
    /// Build a namer over `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The configured prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Hash holding one message: `<p>:msg:<id>`.
    pub fn message(&self, message_id: &str) -> String {
        format!("{}:msg:{}", self.prefix, message_id)
    }

    /// Global timeline sorted set: `<p>:timeline`.
    pub fn timeline(&self) -> String {
        format!("{}:timeline", self.prefix)
    }

    /// Per-instance inbox set: `<p>:inbox:<to>`.
    pub fn inbox(&self, instance_id: &str) -> String {
        format!("{}:inbox:{}", self.prefix, instance_id)
    }

    /// Pending-acknowledgement set: `<p>:pending`.
    pub fn pending(&self) -> String {
        format!("{}:pending", self.prefix)
    }

    /// Presence hash: `<p>:presence`.
    pub fn presence(&self) -> String {
        format!("{}:presence", self.prefix)
    }

    /// Instance pub/sub channel: `<p>:notify:<to>`.
    pub fn instance_channel(&self, instance_id: &str) -> String {
        format!("{}:notify:{}", self.prefix, instance_id)
    }

    /// Broadcast pub/sub channel: `<p>:notify:all`.
    pub fn broadcast_channel(&self) -> String {
        format!("{}:notify:all", self.prefix)
    }

    /// Offline notification queue list: `<p>:notifications:<to>`.
    pub fn notification_queue(&self, instance_id: &str) -> String {
        format!("{}:notifications:{}", self.prefix, instance_id)
    }
}

/// Key names for swarm session state.
#[derive(Debug, Clone)]
pub struct SwarmKeys {
    prefix: String,
}

impl SwarmKeys {
    /// Build a namer over `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Session hash: `<sp>:session:<sid>`.
    pub fn session(&self, session_id: &str) -> String {
        format!("{}:session:{}", self.prefix, session_id)
    }

    /// Per-reviewer results hash: `<sp>:results:<sid>`.
    pub fn results(&self, session_id: &str) -> String {
        format!("{}:results:{}", self.prefix, session_id)
    }

    /// Completion set of reviewer types: `<sp>:progress:<sid>`.
    pub fn progress(&self, session_id: &str) -> String {
        format!("{}:progress:{}", self.prefix, session_id)
    }
}

/// Pack an instance id and field name into a presence hash field.
pub fn presence_field(instance_id: &str, field: &str) -> String {
    format!("{instance_id}.{field}")
}

/// Split a presence hash field on its rightmost dot.
///
/// Splitting from the right lets instance ids themselves contain dots.
pub fn split_presence_field(field: &str) -> Option<(&str, &str)> {
    field.rsplit_once('.')
}
