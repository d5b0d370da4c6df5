use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid message_ttl_days: {0}. Must be at least 1")]
    InvalidMessageTtl(u32),

    #[error("Invalid timeline_max_size: {0}. Must be at least 1")]
    InvalidTimelineMaxSize(u64),

    #[error("Invalid presence_timeout_minutes: {0}. Must be positive")]
    InvalidPresenceTimeout(i64),

    #[error("Redis URL cannot be empty")]
    EmptyRedisUrl,

    #[error("Key prefix cannot be empty")]
    EmptyKeyPrefix,

    #[error("Invalid task_timeout_seconds: {0}. Must be positive")]
    InvalidTaskTimeout(u64),

    #[error("Invalid aggregate_timeout_seconds: {0}. Must be positive")]
    InvalidAggregateTimeout(u64),

    #[error("Invalid max_concurrent_swarms: {0}. Must be at least 1")]
    InvalidMaxConcurrentSwarms(usize),

    #[error("Invalid result_ttl_seconds: {0}. Must be positive")]
    InvalidResultTtl(u64),

    #[error("Invalid duplicate_similarity_threshold: {0}. Must be between 0.0 and 1.0")]
    InvalidSimilarityThreshold(f64),

    #[error("Invalid poll_interval_ms: {0}. Must be positive")]
    InvalidPollInterval(u64),

    #[error("default_reviewers cannot be empty")]
    EmptyDefaultReviewers,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .synapse/config.yaml (project config)
    /// 3. .synapse/local.yaml (project local overrides, optional)
    /// 4. Environment variables (`SYNAPSE_*` prefix, highest priority)
    ///
    /// Unknown keys are ignored; out-of-range numerics reject here.
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".synapse/config.yaml"))
            .merge(Yaml::file(".synapse/local.yaml"))
            .merge(Env::prefixed("SYNAPSE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let coordination = &config.coordination;
        if coordination.redis_url.is_empty() {
            return Err(ConfigError::EmptyRedisUrl);
        }
        if coordination.key_prefix.is_empty() {
            return Err(ConfigError::EmptyKeyPrefix);
        }
        if coordination.message_ttl_days < 1 {
            return Err(ConfigError::InvalidMessageTtl(coordination.message_ttl_days));
        }
        if coordination.timeline_max_size == 0 {
            return Err(ConfigError::InvalidTimelineMaxSize(
                coordination.timeline_max_size,
            ));
        }
        if coordination.presence_timeout_minutes <= 0 {
            return Err(ConfigError::InvalidPresenceTimeout(
                coordination.presence_timeout_minutes,
            ));
        }

        let swarm = &config.swarm;
        if swarm.key_prefix.is_empty() {
            return Err(ConfigError::EmptyKeyPrefix);
        }
        if swarm.task_timeout_seconds == 0 {
            return Err(ConfigError::InvalidTaskTimeout(swarm.task_timeout_seconds));
        }
        if swarm.aggregate_timeout_seconds == 0 {
            return Err(ConfigError::InvalidAggregateTimeout(
                swarm.aggregate_timeout_seconds,
            ));
        }
        if swarm.max_concurrent_swarms == 0 {
            return Err(ConfigError::InvalidMaxConcurrentSwarms(
                swarm.max_concurrent_swarms,
            ));
        }
        if swarm.result_ttl_seconds == 0 {
            return Err(ConfigError::InvalidResultTtl(swarm.result_ttl_seconds));
        }
        if !(0.0..=1.0).contains(&swarm.duplicate_similarity_threshold) {
            return Err(ConfigError::InvalidSimilarityThreshold(
                swarm.duplicate_similarity_threshold,
            ));
        }
        if swarm.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval(swarm.poll_interval_ms));
        }
        if swarm.default_reviewers.is_empty() {
            return Err(ConfigError::EmptyDefaultReviewers);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{CoordinationConfig, SwarmConfig};

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.coordination.key_prefix, "coord");
        assert_eq!(config.swarm.key_prefix, "swarm");
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
coordination:
  key_prefix: testcoord
  message_ttl_days: 3
  timeline_max_size: 50
swarm:
  task_timeout_seconds: 10
  default_reviewers:
    - security
logging:
  level: debug
  format: pretty
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");
        assert_eq!(config.coordination.key_prefix, "testcoord");
        assert_eq!(config.coordination.message_ttl_days, 3);
        assert_eq!(config.coordination.timeline_max_size, 50);
        assert_eq!(config.swarm.task_timeout_seconds, 10);
        assert_eq!(config.swarm.default_reviewers, vec!["security"]);
        assert_eq!(config.logging.level, "debug");

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_zero_ttl() {
        let config = Config {
            coordination: CoordinationConfig {
                message_ttl_days: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidMessageTtl(0)
        ));
    }

    #[test]
    fn test_validate_zero_timeline_size() {
        let config = Config {
            coordination: CoordinationConfig {
                timeline_max_size: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidTimelineMaxSize(0)
        ));
    }

    #[test]
    fn test_validate_threshold_out_of_range() {
        let config = Config {
            swarm: SwarmConfig {
                duplicate_similarity_threshold: 1.5,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidSimilarityThreshold(_)
        ));
    }

    #[test]
    fn test_validate_negative_presence_timeout() {
        let config = Config {
            coordination: CoordinationConfig {
                presence_timeout_minutes: -1,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidPresenceTimeout(-1)
        ));
    }

    #[test]
    fn test_validate_empty_reviewers() {
        let config = Config {
            swarm: SwarmConfig {
                default_reviewers: vec![],
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::EmptyDefaultReviewers
        ));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "shouting".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidLogLevel(_)
        ));
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidLogFormat(_)
        ));
    }

    #[test]
    fn test_env_override() {
        temp_env::with_vars(
            [
                ("SYNAPSE_COORDINATION__KEY_PREFIX", Some("envcoord")),
                ("SYNAPSE_COORDINATION__MESSAGE_TTL_DAYS", Some("2")),
                ("SYNAPSE_SWARM__MAX_CONCURRENT_SWARMS", Some("9")),
            ],
            || {
                let config = ConfigLoader::load().expect("env-backed load should succeed");
                assert_eq!(config.coordination.key_prefix, "envcoord");
                assert_eq!(config.coordination.message_ttl_days, 2);
                assert_eq!(config.swarm.max_concurrent_swarms, 9);
            },
        );
    }

    #[test]
    fn test_env_rejects_out_of_range() {
        temp_env::with_vars(
            [("SYNAPSE_COORDINATION__MESSAGE_TTL_DAYS", Some("0"))],
            || {
                assert!(ConfigLoader::load().is_err());
            },
        );
    }

    #[test]
    fn test_hierarchical_merging() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "coordination:\n  key_prefix: base\n  message_ttl_days: 3"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "coordination:\n  key_prefix: override").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.coordination.key_prefix, "override", "Override should win");
        assert_eq!(
            config.coordination.message_ttl_days, 3,
            "Base value should persist when not overridden"
        );
    }
}
