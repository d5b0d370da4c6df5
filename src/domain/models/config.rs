//! Configuration models for the coordination substrate and swarm layer.

use serde::{Deserialize, Serialize};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Coordination substrate configuration.
    #[serde(default)]
    pub coordination: CoordinationConfig,

    /// Swarm dispatch configuration.
    #[serde(default)]
    pub swarm: SwarmConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Coordination substrate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CoordinationConfig {
    /// Redis endpoint URL.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Prefix under which all coordination keys live.
    #[serde(default = "default_coordination_prefix")]
    pub key_prefix: String,

    /// Days before published messages expire (minimum 1).
    #[serde(default = "default_message_ttl_days")]
    pub message_ttl_days: u32,

    /// Maximum number of entries retained in the timeline.
    #[serde(default = "default_timeline_max_size")]
    pub timeline_max_size: u64,

    /// Minutes after which a silent instance reads as inactive.
    #[serde(default = "default_presence_timeout_minutes")]
    pub presence_timeout_minutes: i64,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_coordination_prefix() -> String {
    "coord".to_string()
}

const fn default_message_ttl_days() -> u32 {
    7
}

const fn default_timeline_max_size() -> u64 {
    1000
}

const fn default_presence_timeout_minutes() -> i64 {
    5
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            key_prefix: default_coordination_prefix(),
            message_ttl_days: default_message_ttl_days(),
            timeline_max_size: default_timeline_max_size(),
            presence_timeout_minutes: default_presence_timeout_minutes(),
        }
    }
}

impl CoordinationConfig {
    /// Message TTL in seconds, applied to hashes and offline queues.
    pub const fn message_ttl_seconds(&self) -> u64 {
        self.message_ttl_days as u64 * 86_400
    }
}

/// Swarm dispatch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SwarmConfig {
    /// Seconds a dispatch waits for all reviewers to report.
    #[serde(default = "default_task_timeout_seconds")]
    pub task_timeout_seconds: u64,

    /// Seconds budgeted for the aggregation phase.
    #[serde(default = "default_aggregate_timeout_seconds")]
    pub aggregate_timeout_seconds: u64,

    /// Maximum simultaneous swarm sessions admitted.
    #[serde(default = "default_max_concurrent_swarms")]
    pub max_concurrent_swarms: usize,

    /// Reviewer types used when a dispatch names none.
    #[serde(default = "default_reviewers")]
    pub default_reviewers: Vec<String>,

    /// Prefix under which swarm session keys live.
    #[serde(default = "default_swarm_prefix")]
    pub key_prefix: String,

    /// Seconds before session state expires.
    #[serde(default = "default_result_ttl_seconds")]
    pub result_ttl_seconds: u64,

    /// Title similarity threshold for duplicate detection, in [0, 1].
    #[serde(default = "default_duplicate_similarity_threshold")]
    pub duplicate_similarity_threshold: f64,

    /// Path prefixes review targets may point into.
    #[serde(default = "default_allowed_path_prefixes")]
    pub allowed_path_prefixes: Vec<String>,

    /// Milliseconds between completion-set polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

const fn default_task_timeout_seconds() -> u64 {
    300
}

const fn default_aggregate_timeout_seconds() -> u64 {
    60
}

const fn default_max_concurrent_swarms() -> usize {
    5
}

fn default_reviewers() -> Vec<String> {
    vec![
        "security".to_string(),
        "performance".to_string(),
        "style".to_string(),
    ]
}

fn default_swarm_prefix() -> String {
    "swarm".to_string()
}

const fn default_result_ttl_seconds() -> u64 {
    86_400
}

const fn default_duplicate_similarity_threshold() -> f64 {
    0.8
}

fn default_allowed_path_prefixes() -> Vec<String> {
    vec![
        "src/".to_string(),
        "docker/".to_string(),
        "tests/".to_string(),
    ]
}

const fn default_poll_interval_ms() -> u64 {
    1000
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            task_timeout_seconds: default_task_timeout_seconds(),
            aggregate_timeout_seconds: default_aggregate_timeout_seconds(),
            max_concurrent_swarms: default_max_concurrent_swarms(),
            default_reviewers: default_reviewers(),
            key_prefix: default_swarm_prefix(),
            result_ttl_seconds: default_result_ttl_seconds(),
            duplicate_similarity_threshold: default_duplicate_similarity_threshold(),
            allowed_path_prefixes: default_allowed_path_prefixes(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl SwarmConfig {
    /// Whether `path` falls under one of the allowed prefixes.
    ///
    /// An empty prefix list allows everything.
    pub fn is_path_allowed(&self, path: &str) -> bool {
        self.allowed_path_prefixes.is_empty()
            || self
                .allowed_path_prefixes
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()))
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordination_defaults() {
        let config = CoordinationConfig::default();
        assert_eq!(config.key_prefix, "coord");
        assert_eq!(config.message_ttl_days, 7);
        assert_eq!(config.message_ttl_seconds(), 604_800);
        assert_eq!(config.timeline_max_size, 1000);
        assert_eq!(config.presence_timeout_minutes, 5);
    }

    #[test]
    fn test_swarm_defaults() {
        let config = SwarmConfig::default();
        assert_eq!(config.task_timeout_seconds, 300);
        assert_eq!(config.aggregate_timeout_seconds, 60);
        assert_eq!(config.max_concurrent_swarms, 5);
        assert_eq!(
            config.default_reviewers,
            vec!["security", "performance", "style"]
        );
        assert_eq!(config.key_prefix, "swarm");
        assert_eq!(config.result_ttl_seconds, 86_400);
        assert!((config.duplicate_similarity_threshold - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_path_allowlist() {
        let config = SwarmConfig::default();
        assert!(config.is_path_allowed("src/workers/swarm.rs"));
        assert!(config.is_path_allowed("tests/integration.rs"));
        assert!(!config.is_path_allowed("/etc/passwd"));
        assert!(!config.is_path_allowed("scripts/deploy.sh"));
    }

    #[test]
    fn test_empty_allowlist_allows_everything() {
        let config = SwarmConfig {
            allowed_path_prefixes: vec![],
            ..Default::default()
        };
        assert!(config.is_path_allowed("anything/at/all"));
    }
}
