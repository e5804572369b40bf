//! Live round trips against running backing services.
//!
//! These tests need the service containers up and reachable with the
//! connection settings from the process environment.
//!
//! Run with: `cargo test -p conn-check --features live`

#![cfg(feature = "live")]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use common::config::EnvSnapshot;
use common::types::Status;
use conn_check::checks::{
    kafka, minio, mysql, opensearch, postgres, registry, valkey, CheckContext, ServiceCheck,
};
use conn_check::reachability::PollSettings;
use conn_check::runner::Runner;
use std::collections::HashMap;

/// Process environment with `flag` forced on.
fn live_context(flag: &str) -> CheckContext {
    let mut vars: HashMap<String, String> = std::env::vars().collect();
    vars.insert(flag.to_string(), "true".to_string());
    CheckContext::new(EnvSnapshot::from_vars(vars), PollSettings::default())
}

/// Run the check twice: the second run proves setup tolerates existing state.
async fn assert_passes_twice(check: Box<dyn ServiceCheck>, flag: &str) {
    let runner = Runner::new(Vec::new(), live_context(flag));

    for attempt in 1..=2 {
        let outcome = runner.run_one(check.as_ref()).await;
        assert_eq!(
            outcome.status,
            Status::Pass,
            "{} attempt {attempt} should pass, got: {}",
            check.service(),
            outcome.detail
        );
        assert!(!outcome.detail.trim().is_empty());
    }
}

#[tokio::test]
async fn test_postgres_round_trip() {
    assert_passes_twice(Box::new(postgres::PostgresCheck), postgres::ENV_FLAG).await;
}

#[tokio::test]
async fn test_mysql_round_trip() {
    assert_passes_twice(Box::new(mysql::MysqlCheck), mysql::ENV_FLAG).await;
}

#[tokio::test]
async fn test_valkey_round_trip() {
    assert_passes_twice(Box::new(valkey::ValkeyCheck), valkey::ENV_FLAG).await;
}

#[tokio::test]
async fn test_kafka_round_trip() {
    assert_passes_twice(Box::new(kafka::KafkaCheck), kafka::ENV_FLAG).await;
}

#[tokio::test]
async fn test_opensearch_round_trip() {
    assert_passes_twice(Box::new(opensearch::OpenSearchCheck), opensearch::ENV_FLAG).await;
}

#[tokio::test]
async fn test_minio_round_trip() {
    assert_passes_twice(Box::new(minio::MinioCheck), minio::ENV_FLAG).await;
}

#[tokio::test]
async fn test_full_run_with_process_env_has_no_failures() {
    let env = EnvSnapshot::from_env();
    let runner = Runner::new(registry(), CheckContext::new(env, PollSettings::default()));

    let mut out = Vec::new();
    let report = runner.run(&mut out).await.expect("write to buffer");

    assert_eq!(
        report.totals.failed,
        0,
        "{}",
        String::from_utf8_lossy(&out)
    );
}
