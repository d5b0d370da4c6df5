//! Redis-backed swarm session store.
//!
//! A session is one flat hash with JSON sub-fields for structured data;
//! per-reviewer results and the completion set live in satellite keys
//! sharing the session TTL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::adapters::redis::keys::SwarmKeys;
use crate::domain::errors::{CoordinationError, CoordinationResult};
use crate::domain::models::message::{format_utc_seconds, parse_utc_seconds};
use crate::domain::models::{
    ReviewerResult, SwarmConfig, SwarmSession, SwarmStatus, UnifiedReport,
};
use crate::domain::ports::SwarmStore;

const FIELD_ID: &str = "id";
const FIELD_TARGET_PATH: &str = "target_path";
const FIELD_REVIEWERS: &str = "reviewers";
const FIELD_STATUS: &str = "status";
const FIELD_CREATED_AT: &str = "created_at";
const FIELD_COMPLETED_AT: &str = "completed_at";
const FIELD_RESULTS: &str = "results";
const FIELD_UNIFIED_REPORT: &str = "unified_report";

/// Encode a session into hash fields.
pub fn encode_session(session: &SwarmSession) -> CoordinationResult<Vec<(&'static str, String)>> {
    let mut fields = vec![
        (FIELD_ID, session.id.clone()),
        (FIELD_TARGET_PATH, session.target_path.clone()),
        (FIELD_REVIEWERS, serde_json::to_string(&session.reviewers)?),
        (FIELD_STATUS, session.status.as_str().to_string()),
        (FIELD_CREATED_AT, format_utc_seconds(&session.created_at)),
        (FIELD_RESULTS, serde_json::to_string(&session.results)?),
    ];
    if let Some(completed_at) = &session.completed_at {
        fields.push((FIELD_COMPLETED_AT, format_utc_seconds(completed_at)));
    }
    if let Some(report) = &session.unified_report {
        fields.push((FIELD_UNIFIED_REPORT, serde_json::to_string(report)?));
    }
    Ok(fields)
}

/// Decode a session from its hash fields.
pub fn decode_session(hash: &HashMap<String, String>) -> CoordinationResult<SwarmSession> {
    let required = |field: &str| {
        hash.get(field).map(String::as_str).ok_or_else(|| {
            CoordinationError::Serialization(format!("session hash missing `{field}`"))
        })
    };

    let status_raw = required(FIELD_STATUS)?;
    let status = SwarmStatus::from_str(status_raw).ok_or_else(|| {
        CoordinationError::Serialization(format!("unknown swarm status `{status_raw}`"))
    })?;

    let created_raw = required(FIELD_CREATED_AT)?;
    let created_at = parse_utc_seconds(created_raw).map_err(|e| {
        CoordinationError::Serialization(format!("bad created_at `{created_raw}`: {e}"))
    })?;

    let completed_at = hash
        .get(FIELD_COMPLETED_AT)
        .map(|raw| {
            parse_utc_seconds(raw).map_err(|e| {
                CoordinationError::Serialization(format!("bad completed_at `{raw}`: {e}"))
            })
        })
        .transpose()?;

    let reviewers: Vec<String> = serde_json::from_str(required(FIELD_REVIEWERS)?)?;
    let results: HashMap<String, ReviewerResult> = hash
        .get(FIELD_RESULTS)
        .map(|raw| serde_json::from_str(raw))
        .transpose()?
        .unwrap_or_default();
    let unified_report: Option<UnifiedReport> = hash
        .get(FIELD_UNIFIED_REPORT)
        .map(|raw| serde_json::from_str(raw))
        .transpose()?;

    Ok(SwarmSession {
        id: required(FIELD_ID)?.to_string(),
        target_path: required(FIELD_TARGET_PATH)?.to_string(),
        reviewers,
        status,
        created_at,
        completed_at,
        results,
        unified_report,
    })
}

/// Redis implementation of the swarm session store.
#[derive(Clone)]
pub struct RedisSwarmStore {
    conn: ConnectionManager,
    keys: SwarmKeys,
    ttl_seconds: u64,
}

impl std::fmt::Debug for RedisSwarmStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSwarmStore")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish_non_exhaustive()
    }
}

impl RedisSwarmStore {
    /// Build a store over a shared connection.
    pub fn new(conn: ConnectionManager, config: &Arc<SwarmConfig>) -> Self {
        Self {
            conn,
            keys: SwarmKeys::new(config.key_prefix.clone()),
            ttl_seconds: config.result_ttl_seconds,
        }
    }

    fn wrap(session_id: &str) -> impl Fn(redis::RedisError) -> CoordinationError + '_ {
        move |e| CoordinationError::Swarm {
            session_id: session_id.to_string(),
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl SwarmStore for RedisSwarmStore {
    async fn create_session(&self, session: &SwarmSession) -> CoordinationResult<()> {
        let fields = encode_session(session)?;
        let mut conn = self.conn.clone();

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.hset_multiple(self.keys.session(&session.id), &fields)
            .ignore();
        pipe.expire(self.keys.session(&session.id), self.ttl_seconds as i64)
            .ignore();
        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(Self::wrap(&session.id))?;

        debug!(session_id = %session.id, "created swarm session");
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> CoordinationResult<Option<SwarmSession>> {
        let mut conn = self.conn.clone();
        let hash: HashMap<String, String> = conn
            .hgetall(self.keys.session(session_id))
            .await
            .map_err(Self::wrap(session_id))?;
        if hash.is_empty() {
            return Ok(None);
        }
        decode_session(&hash).map(Some)
    }

    async fn update_status(
        &self,
        session_id: &str,
        status: SwarmStatus,
    ) -> CoordinationResult<()> {
        let mut conn = self.conn.clone();
        conn.hset::<_, _, _, ()>(self.keys.session(session_id), FIELD_STATUS, status.as_str())
            .await
            .map_err(Self::wrap(session_id))?;
        debug!(session_id, status = %status, "updated swarm status");
        Ok(())
    }

    async fn mark_completed(
        &self,
        session_id: &str,
        completed_at: DateTime<Utc>,
    ) -> CoordinationResult<()> {
        let mut conn = self.conn.clone();
        conn.hset::<_, _, _, ()>(
            self.keys.session(session_id),
            FIELD_COMPLETED_AT,
            format_utc_seconds(&completed_at),
        )
        .await
        .map_err(Self::wrap(session_id))?;
        Ok(())
    }

    async fn store_result(
        &self,
        session_id: &str,
        result: &ReviewerResult,
    ) -> CoordinationResult<()> {
        let payload = serde_json::to_string(result)?;
        let results_key = self.keys.results(session_id);
        let progress_key = self.keys.progress(session_id);
        let mut conn = self.conn.clone();

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.hset(&results_key, &result.reviewer_type, &payload)
            .ignore();
        pipe.expire(&results_key, self.ttl_seconds as i64).ignore();
        pipe.sadd(&progress_key, &result.reviewer_type).ignore();
        pipe.expire(&progress_key, self.ttl_seconds as i64).ignore();
        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(Self::wrap(session_id))?;

        debug!(
            session_id,
            reviewer = %result.reviewer_type,
            status = ?result.status,
            "stored reviewer result"
        );
        Ok(())
    }

    async fn get_results(
        &self,
        session_id: &str,
    ) -> CoordinationResult<HashMap<String, ReviewerResult>> {
        let mut conn = self.conn.clone();
        let raw: HashMap<String, String> = conn
            .hgetall(self.keys.results(session_id))
            .await
            .map_err(Self::wrap(session_id))?;

        let mut results = HashMap::with_capacity(raw.len());
        for (reviewer, payload) in raw {
            match serde_json::from_str::<ReviewerResult>(&payload) {
                Ok(result) => {
                    results.insert(reviewer, result);
                }
                Err(e) => warn!(session_id, reviewer, error = %e, "skipping undecodable result"),
            }
        }
        Ok(results)
    }

    async fn completed_reviewers(
        &self,
        session_id: &str,
    ) -> CoordinationResult<HashSet<String>> {
        let mut conn = self.conn.clone();
        conn.smembers(self.keys.progress(session_id))
            .await
            .map_err(Self::wrap(session_id))
    }

    async fn store_report(
        &self,
        session_id: &str,
        results: &HashMap<String, ReviewerResult>,
        report: &UnifiedReport,
    ) -> CoordinationResult<()> {
        let fields: Vec<(&str, String)> = vec![
            (FIELD_RESULTS, serde_json::to_string(results)?),
            (FIELD_UNIFIED_REPORT, serde_json::to_string(report)?),
        ];
        let mut conn = self.conn.clone();
        conn.hset_multiple::<_, _, _, ()>(self.keys.session(session_id), &fields)
            .await
            .map_err(Self::wrap(session_id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ReviewerStatus, Severity};
    use chrono::TimeZone;

    fn sample_session() -> SwarmSession {
        SwarmSession {
            id: "swarm-a1b2c3d4".into(),
            target_path: "src/workers/".into(),
            reviewers: vec!["security".into(), "performance".into(), "style".into()],
            status: SwarmStatus::Pending,
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
            completed_at: None,
            results: HashMap::new(),
            unified_report: None,
        }
    }

    #[test]
    fn test_session_hash_round_trip() {
        let session = sample_session();
        let fields: HashMap<String, String> = encode_session(&session)
            .unwrap()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        assert_eq!(fields["id"], "swarm-a1b2c3d4");
        assert_eq!(fields["status"], "pending");
        assert_eq!(fields["created_at"], "2025-06-01T09:00:00Z");
        assert!(!fields.contains_key("completed_at"));

        let decoded = decode_session(&fields).unwrap();
        assert_eq!(decoded.id, session.id);
        assert_eq!(decoded.reviewers, session.reviewers);
        assert_eq!(decoded.status, SwarmStatus::Pending);
        assert!(decoded.completed_at.is_none());
        assert!(decoded.unified_report.is_none());
    }

    #[test]
    fn test_session_hash_round_trip_with_results() {
        let mut session = sample_session();
        session.status = SwarmStatus::Complete;
        session.completed_at = Some(Utc.with_ymd_and_hms(2025, 6, 1, 9, 5, 0).unwrap());
        session.results.insert(
            "security".into(),
            ReviewerResult {
                reviewer_type: "security".into(),
                status: ReviewerStatus::Success,
                findings: vec![],
                duration_seconds: 2.0,
                files_reviewed: 3,
                error_message: None,
            },
        );
        session.unified_report = Some(UnifiedReport {
            swarm_id: session.id.clone(),
            target_path: session.target_path.clone(),
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 9, 5, 0).unwrap(),
            reviewers_completed: vec!["security".into()],
            reviewers_failed: vec![],
            critical_findings: vec![],
            high_findings: vec![],
            medium_findings: vec![],
            low_findings: vec![],
            info_findings: vec![],
            total_findings: 0,
            findings_by_reviewer: HashMap::new(),
            findings_by_category: HashMap::new(),
            duplicates_removed: 0,
        });

        let fields: HashMap<String, String> = encode_session(&session)
            .unwrap()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let decoded = decode_session(&fields).unwrap();

        assert_eq!(decoded.status, SwarmStatus::Complete);
        assert_eq!(decoded.completed_at, session.completed_at);
        assert_eq!(decoded.results.len(), 1);
        assert_eq!(
            decoded.unified_report.unwrap().reviewers_completed,
            vec!["security"]
        );
    }

    #[test]
    fn test_decode_rejects_unknown_status() {
        let mut fields: HashMap<String, String> = encode_session(&sample_session())
            .unwrap()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        fields.insert("status".into(), "meandering".into());
        assert!(decode_session(&fields).is_err());
    }

    #[test]
    fn test_finding_severity_survives_json() {
        let finding = crate::domain::models::ReviewFinding {
            id: "f1".into(),
            reviewer_type: "security".into(),
            severity: Severity::Critical,
            category: "security/injection".into(),
            title: "t".into(),
            description: "d".into(),
            file_path: "src/a.rs".into(),
            line_start: Some(1),
            line_end: None,
            code_snippet: None,
            recommendation: None,
            confidence: 1.0,
        };
        let json = serde_json::to_string(&finding).unwrap();
        assert!(json.contains("\"critical\""));
    }
}
