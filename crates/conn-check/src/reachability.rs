//! TCP reachability polling.
//!
//! Service containers can take several seconds to start listening. The poller
//! retries short connection attempts until an overall budget runs out, so a
//! service that is already up answers on the first attempt and a slow one is
//! still picked up without blocking the run indefinitely.
//!
//! Each attempt is a single future racing the connect against the attempt cap.
//! Whichever finishes first resolves the attempt; dropping the connect future
//! closes its socket before the next attempt starts, so at most one socket is
//! ever outstanding.

use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, trace};

/// Default overall budget for one `wait_for_port` call.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(2000);

/// Wall-clock cap for a single connection attempt.
pub const DEFAULT_ATTEMPT_CAP: Duration = Duration::from_millis(100);

/// Idle timeout applied to the socket of a single attempt.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_millis(500);

/// Pause between failed attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(200);

/// Timing knobs for [`wait_for_port`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Overall budget across all attempts.
    pub timeout: Duration,
    /// Hard cap on one attempt, after which the attempt is abandoned.
    pub attempt_cap: Duration,
    /// Socket-level idle timeout for one attempt.
    pub idle_timeout: Duration,
    /// Sleep between attempts, clamped to the remaining budget.
    pub retry_interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_POLL_TIMEOUT,
            attempt_cap: DEFAULT_ATTEMPT_CAP,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

impl PollSettings {
    /// Settings with a custom overall budget and default per-attempt timings.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Effective limit for one attempt: whichever of the cap and the idle timeout fires first.
    fn attempt_limit(&self) -> Duration {
        self.attempt_cap.min(self.idle_timeout)
    }
}

/// Outcome of a single connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Connected,
    Refused,
    TimedOut,
}

/// Try one connection. Name resolution counts against the attempt limit.
/// Whole milliseconds for log fields, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

async fn attempt(host: &str, port: u16, limit: Duration) -> Attempt {
    match timeout(limit, TcpStream::connect((host, port))).await {
        Ok(Ok(stream)) => {
            drop(stream);
            Attempt::Connected
        }
        Ok(Err(e)) => {
            trace!(
                target: "conn_check.reachability",
                host,
                port,
                error = %e,
                "Connection attempt failed"
            );
            Attempt::Refused
        }
        Err(_) => Attempt::TimedOut,
    }
}

/// Return `true` if `host:port` accepts a TCP connection within `settings.timeout`.
///
/// Never errors: resolution failures, refusals and timeouts all count as
/// "not reachable yet" and are retried until the budget is spent.
pub async fn wait_for_port(host: &str, port: u16, settings: &PollSettings) -> bool {
    let start = Instant::now();
    let deadline = start + settings.timeout;
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;

        let remaining = deadline.saturating_duration_since(Instant::now());
        let limit = settings.attempt_limit().min(remaining.max(Duration::from_millis(1)));

        match attempt(host, port, limit).await {
            Attempt::Connected => {
                debug!(
                    target: "conn_check.reachability",
                    host,
                    port,
                    attempts,
                    elapsed_ms = millis(start.elapsed()),
                    "Port reachable"
                );
                return true;
            }
            outcome => {
                trace!(
                    target: "conn_check.reachability",
                    host,
                    port,
                    attempts,
                    outcome = ?outcome,
                    "Port not reachable yet"
                );
            }
        }

        let now = Instant::now();
        if now >= deadline {
            debug!(
                target: "conn_check.reachability",
                host,
                port,
                attempts,
                budget_ms = millis(settings.timeout),
                "Port unreachable within budget"
            );
            return false;
        }

        // Cap the pause at the remaining budget
        sleep(settings.retry_interval.min(deadline.saturating_duration_since(now))).await;
    }
}
