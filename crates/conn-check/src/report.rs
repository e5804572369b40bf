//! Console report: one line per check plus a summary line.
//!
//! ```text
//! [PASS] PostgreSQL   via rust-sqlx-pg       (12 ms) -> Inserted and read back row ...
//! 1 passed, 5 skipped, 0 failed
//! ```

use common::types::{Status, TestOutcome};
use std::process::ExitCode;

/// Column width for the service name.
pub const SERVICE_WIDTH: usize = 12;

/// Column width for the client label.
pub const CLIENT_WIDTH: usize = 18;

const COLOR_RESET: &str = "\x1b[0m";
const COLOR_GREEN: &str = "\x1b[32m";
const COLOR_RED: &str = "\x1b[31m";
const COLOR_YELLOW: &str = "\x1b[33m";

fn color_for(status: Status) -> &'static str {
    match status {
        Status::Pass => COLOR_GREEN,
        Status::Fail => COLOR_RED,
        Status::Skip => COLOR_YELLOW,
    }
}

/// Render one outcome line, optionally wrapped in the status colour.
pub fn format_outcome(outcome: &TestOutcome, color: bool) -> String {
    let line = format!(
        "[{}] {:<service_width$} via {:<client_width$} ({} ms) -> {}",
        outcome.status,
        outcome.service,
        outcome.client,
        outcome.duration_ms,
        outcome.detail,
        service_width = SERVICE_WIDTH,
        client_width = CLIENT_WIDTH,
    );

    if color {
        format!("{}{line}{COLOR_RESET}", color_for(outcome.status))
    } else {
        line
    }
}

/// Aggregate counts for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub passed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Totals {
    pub fn record(&mut self, status: Status) {
        match status {
            Status::Pass => self.passed += 1,
            Status::Skip => self.skipped += 1,
            Status::Fail => self.failed += 1,
        }
    }

    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a TestOutcome>) -> Self {
        let mut totals = Self::default();
        for outcome in outcomes {
            totals.record(outcome.status);
        }
        totals
    }

    /// Summary line, e.g. `2 passed, 3 skipped, 1 failed`.
    pub fn summary(&self) -> String {
        format!(
            "{} passed, {} skipped, {} failed",
            self.passed, self.skipped, self.failed
        )
    }

    /// Numeric exit status: 1 if anything failed. Skips never count.
    pub fn exit_status(&self) -> u8 {
        u8::from(self.failed > 0)
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }
}
