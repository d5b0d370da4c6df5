//! Redis swarm store integration tests.
//!
//! Run with `cargo test -- --ignored` and a server at `REDIS_URL`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use synapse::adapters::redis::RedisSwarmStore;
use synapse::domain::models::{
    generate_session_id, ReviewerResult, ReviewerStatus, SwarmConfig, SwarmSession, SwarmStatus,
    UnifiedReport,
};
use synapse::domain::ports::SwarmStore;

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

fn test_config() -> Arc<SwarmConfig> {
    let unique = uuid::Uuid::new_v4().simple().to_string();
    Arc::new(SwarmConfig {
        key_prefix: format!("swarmtest-{}", &unique[..8]),
        ..SwarmConfig::default()
    })
}

async fn store_with(config: &Arc<SwarmConfig>) -> RedisSwarmStore {
    let client = redis::Client::open(redis_url()).expect("valid redis url");
    let conn = redis::aio::ConnectionManager::new(client)
        .await
        .expect("redis reachable");
    RedisSwarmStore::new(conn, config)
}

fn sample_session() -> SwarmSession {
    SwarmSession {
        id: generate_session_id(),
        target_path: "src/workers/".into(),
        reviewers: vec!["security".into(), "style".into()],
        status: SwarmStatus::Pending,
        created_at: Utc::now(),
        completed_at: None,
        results: HashMap::new(),
        unified_report: None,
    }
}

fn success_result(reviewer: &str) -> ReviewerResult {
    ReviewerResult {
        reviewer_type: reviewer.into(),
        status: ReviewerStatus::Success,
        findings: vec![],
        duration_seconds: 0.5,
        files_reviewed: 2,
        error_message: None,
    }
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_session_round_trip() {
    let config = test_config();
    let store = store_with(&config).await;
    let session = sample_session();

    store.create_session(&session).await.unwrap();
    let fetched = store.get_session(&session.id).await.unwrap().unwrap();
    assert_eq!(fetched.id, session.id);
    assert_eq!(fetched.reviewers, session.reviewers);
    assert_eq!(fetched.status, SwarmStatus::Pending);

    assert!(store.get_session("swarm-missing1").await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_status_and_completion_updates() {
    let config = test_config();
    let store = store_with(&config).await;
    let session = sample_session();
    store.create_session(&session).await.unwrap();

    store
        .update_status(&session.id, SwarmStatus::InProgress)
        .await
        .unwrap();
    let completed_at = Utc::now();
    store.mark_completed(&session.id, completed_at).await.unwrap();

    let fetched = store.get_session(&session.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, SwarmStatus::InProgress);
    assert_eq!(
        fetched.completed_at.map(|t| t.timestamp()),
        Some(completed_at.timestamp())
    );
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_results_populate_progress_set() {
    let config = test_config();
    let store = store_with(&config).await;
    let session = sample_session();
    store.create_session(&session).await.unwrap();

    store
        .store_result(&session.id, &success_result("security"))
        .await
        .unwrap();

    let completed = store.completed_reviewers(&session.id).await.unwrap();
    assert!(completed.contains("security"));
    assert!(!completed.contains("style"));

    let results = store.get_results(&session.id).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results["security"].status, ReviewerStatus::Success);
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_wait_for_completion_round_trip() {
    let config = test_config();
    let store = Arc::new(store_with(&config).await);
    let session = sample_session();
    store.create_session(&session).await.unwrap();

    let writer = store.clone();
    let session_id = session.id.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        writer
            .store_result(&session_id, &success_result("security"))
            .await
            .unwrap();
        writer
            .store_result(&session_id, &success_result("style"))
            .await
            .unwrap();
    });

    let done = store
        .wait_for_completion(
            &session.id,
            &session.reviewers,
            Duration::from_secs(2),
            Duration::from_millis(20),
        )
        .await
        .unwrap();
    assert!(done);
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_store_report_persists_snapshot() {
    let config = test_config();
    let store = store_with(&config).await;
    let session = sample_session();
    store.create_session(&session).await.unwrap();

    let mut results = HashMap::new();
    results.insert("security".to_string(), success_result("security"));
    let report = UnifiedReport {
        swarm_id: session.id.clone(),
        target_path: session.target_path.clone(),
        created_at: Utc::now(),
        reviewers_completed: vec!["security".into()],
        reviewers_failed: vec!["style".into()],
        critical_findings: vec![],
        high_findings: vec![],
        medium_findings: vec![],
        low_findings: vec![],
        info_findings: vec![],
        total_findings: 0,
        findings_by_reviewer: HashMap::new(),
        findings_by_category: HashMap::new(),
        duplicates_removed: 0,
    };

    store.store_report(&session.id, &results, &report).await.unwrap();

    let fetched = store.get_session(&session.id).await.unwrap().unwrap();
    assert_eq!(fetched.results.len(), 1);
    let stored_report = fetched.unified_report.unwrap();
    assert_eq!(stored_report.reviewers_failed, vec!["style"]);
}
