//! Sequential runner.
//!
//! Runs every registered check in order, times it, converts errors and panics
//! into FAIL outcomes, writes one report line per check as it completes, and
//! finishes with the summary. A failing check never stops the run.

use crate::checks::{CheckContext, ServiceCheck};
use crate::report::{format_outcome, Totals};
use common::types::TestOutcome;
use futures::FutureExt;
use std::any::Any;
use std::io::{self, Write};
use std::panic::AssertUnwindSafe;
use std::process::ExitCode;
use tokio::time::Instant;
use tracing::{error, info};

/// Header printed before the first check.
pub const BANNER: &str = "Running Rust connectivity checks...";

/// Result of a full run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcomes: Vec<TestOutcome>,
    pub totals: Totals,
}

impl RunReport {
    pub fn exit_code(&self) -> ExitCode {
        self.totals.exit_code()
    }
}

pub struct Runner {
    checks: Vec<Box<dyn ServiceCheck>>,
    ctx: CheckContext,
    color: bool,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl Runner {
    pub fn new(checks: Vec<Box<dyn ServiceCheck>>, ctx: CheckContext) -> Self {
        Self {
            checks,
            ctx,
            color: false,
        }
    }

    /// Wrap report lines in ANSI colours.
    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Run a single check and attach its duration.
    pub async fn run_one(&self, check: &dyn ServiceCheck) -> TestOutcome {
        let start = Instant::now();
        info!(
            target: "conn_check.runner",
            service = check.service(),
            client = check.client(),
            "Running check"
        );

        let outcome = match AssertUnwindSafe(check.run(&self.ctx)).catch_unwind().await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!(
                    target: "conn_check.runner",
                    service = check.service(),
                    error = %e,
                    "Check failed"
                );
                TestOutcome::fail(check.service(), check.client(), e.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(
                    target: "conn_check.runner",
                    service = check.service(),
                    panic = %message,
                    "Check panicked"
                );
                TestOutcome::fail(check.service(), check.client(), format!("panicked: {message}"))
            }
        };

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        outcome.with_duration(duration_ms)
    }

    /// Run every check in order, writing the report to `out`.
    pub async fn run<W: Write>(&self, out: &mut W) -> io::Result<RunReport> {
        writeln!(out, "{BANNER}")?;
        writeln!(out)?;

        let mut outcomes = Vec::with_capacity(self.checks.len());
        let mut totals = Totals::default();

        for check in &self.checks {
            let outcome = self.run_one(check.as_ref()).await;
            writeln!(out, "{}", format_outcome(&outcome, self.color))?;
            out.flush()?;

            totals.record(outcome.status);
            outcomes.push(outcome);
        }

        writeln!(out)?;
        writeln!(out, "{}", totals.summary())?;

        info!(
            target: "conn_check.runner",
            passed = totals.passed,
            skipped = totals.skipped,
            failed = totals.failed,
            "Run complete"
        );

        Ok(RunReport { outcomes, totals })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(payload.as_ref()), "owned message");

        let payload: Box<dyn Any + Send> = Box::new(42_u32);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
