//! Per-service connectivity checks.
//!
//! Every check follows the same script: read its settings from the env
//! snapshot, call the gate, then run one read-after-write round trip against
//! the live service and clean up after itself. Failures are returned as
//! [`CheckError`] and turned into FAIL outcomes by the runner.

use crate::reachability::PollSettings;
use async_trait::async_trait;
use common::config::EnvSnapshot;
use common::error::CheckError;
use common::types::TestOutcome;
use std::future::Future;
use std::time::Duration;

pub mod kafka;
pub mod minio;
pub mod mysql;
pub mod opensearch;
pub mod postgres;
pub mod valkey;

/// Upper bound for any single client call (connect, query, request).
pub const OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared, read-only inputs for one run.
#[derive(Debug, Clone)]
pub struct CheckContext {
    pub env: EnvSnapshot,
    pub poll: PollSettings,
}

impl CheckContext {
    pub fn new(env: EnvSnapshot, poll: PollSettings) -> Self {
        Self { env, poll }
    }
}

/// A single backing-service check.
#[async_trait]
pub trait ServiceCheck: Send + Sync {
    /// Display name of the service, e.g. `PostgreSQL`.
    fn service(&self) -> &'static str;

    /// Label of the client library used, e.g. `rust-sqlx-pg`.
    fn client(&self) -> &'static str;

    /// Gate, then perform the round trip.
    ///
    /// Returns the gate's outcome verbatim when it blocks, PASS on success.
    async fn run(&self, ctx: &CheckContext) -> Result<TestOutcome, CheckError>;
}

/// All checks in reporting order.
pub fn registry() -> Vec<Box<dyn ServiceCheck>> {
    vec![
        Box::new(postgres::PostgresCheck),
        Box::new(mysql::MysqlCheck),
        Box::new(valkey::ValkeyCheck),
        Box::new(kafka::KafkaCheck),
        Box::new(opensearch::OpenSearchCheck),
        Box::new(minio::MinioCheck),
    ]
}

/// Run a client call under [`OPERATION_TIMEOUT`].
pub(crate) async fn bounded<T, F>(operation: &str, fut: F) -> Result<T, CheckError>
where
    F: Future<Output = Result<T, CheckError>>,
{
    tokio::time::timeout(OPERATION_TIMEOUT, fut)
        .await
        .map_err(|_| CheckError::Timeout {
            operation: operation.to_string(),
            seconds: OPERATION_TIMEOUT.as_secs(),
        })?
}

/// Flatten a sqlx error, naming the step that failed.
pub(crate) fn database_error(operation: &str, e: &sqlx::Error) -> CheckError {
    CheckError::Database(format!("{operation} failed: {e}"))
}

/// Compare a value read back from a service with what was written.
pub(crate) fn ensure_payload(expected: &str, actual: Option<&str>) -> Result<(), CheckError> {
    match actual {
        Some(actual) if actual == expected => Ok(()),
        other => Err(CheckError::PayloadMismatch {
            expected: expected.to_string(),
            actual: other.unwrap_or("<missing>").to_string(),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_order() {
        let services: Vec<&str> = registry().iter().map(|c| c.service()).collect();
        assert_eq!(
            services,
            vec!["PostgreSQL", "MySQL", "Valkey", "Kafka", "OpenSearch", "MinIO"]
        );
    }

    #[test]
    fn test_client_labels_are_unique() {
        let checks = registry();
        let mut clients: Vec<&str> = checks.iter().map(|c| c.client()).collect();
        clients.sort_unstable();
        clients.dedup();
        assert_eq!(clients.len(), checks.len());
    }

    #[tokio::test]
    async fn test_bounded_passes_through_result() {
        let value = bounded("noop", async { Ok::<_, CheckError>(7) }).await.unwrap();
        assert_eq!(value, 7);

        let err = bounded("fails", async {
            Err::<(), _>(CheckError::Internal("boom".to_string()))
        })
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Internal error: boom");
    }

    #[test]
    fn test_ensure_payload() {
        assert!(ensure_payload("abc", Some("abc")).is_ok());

        let err = ensure_payload("abc", Some("abd")).unwrap_err();
        assert_eq!(err.to_string(), "payload mismatch: got abd, want abc");

        let err = ensure_payload("abc", None).unwrap_err();
        assert!(err.to_string().contains("<missing>"));
    }
}
