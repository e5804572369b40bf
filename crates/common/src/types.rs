//! Result vocabulary shared by the gate, the service checks and the runner.

use serde::Serialize;
use std::fmt;

/// Placeholder used when a caller hands over an empty detail.
const EMPTY_DETAIL: &str = "no detail provided";

/// Outcome status of a single service check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Pass,
    Fail,
    Skip,
}

impl Status {
    /// Upper-case label used in the console report.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Fail => "FAIL",
            Status::Skip => "SKIP",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one service check invocation.
///
/// `duration_ms` is zero until the runner attaches the measured time via
/// [`TestOutcome::with_duration`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestOutcome {
    pub service: String,
    pub client: String,
    pub status: Status,
    pub detail: String,
    pub duration_ms: u64,
}

impl TestOutcome {
    /// Build an outcome. An empty detail is replaced so the report never shows a blank reason.
    #[must_use]
    pub fn new(
        service: impl Into<String>,
        client: impl Into<String>,
        status: Status,
        detail: impl Into<String>,
    ) -> Self {
        let detail = detail.into();
        let detail = if detail.trim().is_empty() {
            EMPTY_DETAIL.to_string()
        } else {
            detail
        };

        Self {
            service: service.into(),
            client: client.into(),
            status,
            detail,
            duration_ms: 0,
        }
    }

    #[must_use]
    pub fn pass(service: impl Into<String>, client: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(service, client, Status::Pass, detail)
    }

    #[must_use]
    pub fn fail(service: impl Into<String>, client: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(service, client, Status::Fail, detail)
    }

    #[must_use]
    pub fn skip(service: impl Into<String>, client: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(service, client, Status::Skip, detail)
    }

    /// Attach the measured duration.
    #[must_use]
    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        assert_eq!(Status::Pass.to_string(), "PASS");
        assert_eq!(Status::Fail.to_string(), "FAIL");
        assert_eq!(Status::Skip.to_string(), "SKIP");
    }

    #[test]
    fn test_status_serializes_upper_case() {
        let json = serde_json::to_string(&Status::Skip).unwrap_or_default();
        assert_eq!(json, "\"SKIP\"");
    }

    #[test]
    fn test_empty_detail_is_replaced() {
        let outcome = TestOutcome::pass("Valkey", "rust-redis", "   ");
        assert_eq!(outcome.detail, EMPTY_DETAIL);
        assert_eq!(outcome.status, Status::Pass);
    }

    #[test]
    fn test_duration_defaults_to_zero_until_attached() {
        let outcome = TestOutcome::fail("MySQL", "rust-sqlx-mysql", "boom");
        assert_eq!(outcome.duration_ms, 0);

        let outcome = outcome.with_duration(42);
        assert_eq!(outcome.duration_ms, 42);
        assert_eq!(outcome.detail, "boom");
    }
}
