//! Pre-flight gate shared by every service check.
//!
//! A check calls [`gate_check`] before opening a real client. The gate either
//! blocks the check with a SKIP (disabled by flag) or FAIL (port unreachable)
//! outcome, or returns `None` and leaves the final outcome to the check. It
//! never produces PASS.

use crate::reachability::{wait_for_port, PollSettings};
use common::config::EnvSnapshot;
use common::types::TestOutcome;
use tracing::{debug, info, warn};

/// Inputs to the gate for one check invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    pub service: String,
    pub client: String,
    /// Name of the enable flag, e.g. `ENABLE_POSTGRES`.
    pub env_flag: String,
    /// Value used when the flag is unset or empty.
    pub default_enabled: bool,
    pub host: String,
    /// Port to dial. `None` skips the reachability check.
    pub port: Option<u16>,
}

impl GateConfig {
    pub fn new(
        service: &str,
        client: &str,
        env_flag: &str,
        default_enabled: bool,
        host: &str,
        port: Option<u16>,
    ) -> Self {
        Self {
            service: service.to_string(),
            client: client.to_string(),
            env_flag: env_flag.to_string(),
            default_enabled,
            host: host.to_string(),
            port,
        }
    }
}

/// Evaluate the gate.
///
/// A disabled check returns before any socket is opened.
pub async fn gate_check(
    gate: &GateConfig,
    env: &EnvSnapshot,
    poll: &PollSettings,
) -> Option<TestOutcome> {
    if !env.flag(&gate.env_flag, gate.default_enabled) {
        info!(
            target: "conn_check.gate",
            service = %gate.service,
            flag = %gate.env_flag,
            "Service disabled by flag"
        );
        return Some(TestOutcome::skip(
            &gate.service,
            &gate.client,
            format!("{}=false -> skipped", gate.env_flag),
        ));
    }

    if let Some(port) = gate.port {
        if !wait_for_port(&gate.host, port, poll).await {
            warn!(
                target: "conn_check.gate",
                service = %gate.service,
                host = %gate.host,
                port,
                "Service port unreachable"
            );
            return Some(TestOutcome::fail(
                &gate.service,
                &gate.client,
                format!("{}:{} unreachable", gate.host, port),
            ));
        }
    }

    debug!(
        target: "conn_check.gate",
        service = %gate.service,
        "Gate passed"
    );
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::types::Status;
    use std::collections::HashMap;
    use std::time::Duration;

    fn env(pairs: &[(&str, &str)]) -> EnvSnapshot {
        EnvSnapshot::from_vars(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<HashMap<_, _>>(),
        )
    }

    fn gate(default_enabled: bool, port: Option<u16>) -> GateConfig {
        GateConfig::new("Valkey", "rust-redis", "ENABLE_X", default_enabled, "127.0.0.1", port)
    }

    #[tokio::test]
    async fn test_disabled_flag_skips() {
        let outcome = gate_check(
            &gate(true, Some(1)),
            &env(&[("ENABLE_X", "false")]),
            &PollSettings::default(),
        )
        .await
        .expect("disabled gate should short-circuit");

        assert_eq!(outcome.status, Status::Skip);
        assert_eq!(outcome.detail, "ENABLE_X=false -> skipped");
        assert_eq!(outcome.service, "Valkey");
        assert_eq!(outcome.client, "rust-redis");
    }

    #[tokio::test]
    async fn test_default_disabled_skips_when_unset() {
        let outcome = gate_check(&gate(false, None), &env(&[]), &PollSettings::default()).await;
        assert_eq!(outcome.map(|o| o.status), Some(Status::Skip));
    }

    #[tokio::test]
    async fn test_enabled_without_port_proceeds() {
        let outcome = gate_check(
            &gate(false, None),
            &env(&[("ENABLE_X", "yes")]),
            &PollSettings::default(),
        )
        .await;
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn test_enabled_unreachable_fails() {
        let port = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let outcome = gate_check(
            &gate(true, Some(port)),
            &env(&[]),
            &PollSettings::with_timeout(Duration::from_millis(300)),
        )
        .await
        .expect("unreachable port should fail the gate");

        assert_eq!(outcome.status, Status::Fail);
        assert_eq!(outcome.detail, format!("127.0.0.1:{port} unreachable"));
    }
}
