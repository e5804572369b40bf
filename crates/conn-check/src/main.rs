//! Connectivity check binary.
//!
//! Runs every registered service check against the current environment,
//! prints the report to stdout and exits non-zero if any check failed.

use anyhow::Context;
use common::config::EnvSnapshot;
use conn_check::checks::{registry, CheckContext};
use conn_check::reachability::PollSettings;
use conn_check::runner::Runner;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout carries only the report.
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "conn_check=warn".into()),
        )
        .with(json_logs.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    match run().await {
        Ok(code) => code,
        Err(e) => {
            error!(target: "conn_check.runner", error = %e, "Connectivity run aborted");
            eprintln!("conn-check: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    let env = EnvSnapshot::from_env();
    info!(target: "conn_check.runner", env = ?env, "Environment captured");

    let color = env.get("NO_COLOR").is_none();
    let runner = Runner::new(registry(), CheckContext::new(env, PollSettings::default()))
        .with_color(color);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let report = runner
        .run(&mut out)
        .await
        .context("Failed to write report to stdout")?;

    Ok(report.exit_code())
}
