//! Valkey check: SET with expiry, GET, DEL.
//!
//! Accepts the `REDIS_*` variables as fallbacks so the same environment works
//! for a Redis container.

use super::{bounded, ensure_payload, CheckContext, ServiceCheck};
use crate::gate::{gate_check, GateConfig};
use async_trait::async_trait;
use common::config::EnvSnapshot;
use common::error::CheckError;
use common::types::TestOutcome;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use tracing::{debug, instrument};
use uuid::Uuid;

pub const SERVICE: &str = "Valkey";
pub const CLIENT: &str = "rust-redis";
pub const ENV_FLAG: &str = "ENABLE_VALKEY";

/// Expiry on the health key, in case the DEL never runs.
const KEY_TTL_SECONDS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValkeyConfig {
    pub host: String,
    pub port: u16,
}

impl ValkeyConfig {
    pub fn from_env(env: &EnvSnapshot) -> Self {
        Self {
            host: env.first_of(&["VALKEY_HOST", "REDIS_HOST"], "valkey"),
            port: env.port_of(&["VALKEY_PORT", "REDIS_PORT"], 6379),
        }
    }

    fn url(&self) -> String {
        format!("redis://{}:{}", self.host, self.port)
    }
}

pub struct ValkeyCheck;

#[async_trait]
impl ServiceCheck for ValkeyCheck {
    fn service(&self) -> &'static str {
        SERVICE
    }

    fn client(&self) -> &'static str {
        CLIENT
    }

    #[instrument(skip_all, fields(service = SERVICE))]
    async fn run(&self, ctx: &CheckContext) -> Result<TestOutcome, CheckError> {
        let config = ValkeyConfig::from_env(&ctx.env);
        let gate = GateConfig::new(SERVICE, CLIENT, ENV_FLAG, false, &config.host, Some(config.port));
        if let Some(outcome) = gate_check(&gate, &ctx.env, &ctx.poll).await {
            return Ok(outcome);
        }

        let client = Client::open(config.url())
            .map_err(|e| CheckError::Redis(format!("Failed to open Redis client: {e}")))?;

        // The connection closes when dropped at the end of this scope
        let mut conn = bounded("connect", async {
            client
                .get_multiplexed_async_connection()
                .await
                .map_err(|e| CheckError::Redis(format!("Failed to connect to Redis: {e}")))
        })
        .await?;

        let key = bounded("round trip", round_trip(&mut conn)).await?;
        Ok(TestOutcome::pass(
            SERVICE,
            CLIENT,
            format!("SET/GET succeeded for {key}"),
        ))
    }
}

async fn round_trip(conn: &mut MultiplexedConnection) -> Result<String, CheckError> {
    let payload = Uuid::new_v4().to_string();
    let key = format!("health:{payload}");

    conn.set_ex::<_, _, ()>(&key, &payload, KEY_TTL_SECONDS)
        .await
        .map_err(|e| CheckError::Redis(format!("SET failed: {e}")))?;

    let stored: Option<String> = conn
        .get(&key)
        .await
        .map_err(|e| CheckError::Redis(format!("GET failed: {e}")))?;

    conn.del::<_, ()>(&key)
        .await
        .map_err(|e| CheckError::Redis(format!("DEL failed: {e}")))?;

    debug!(target: "conn_check.checks.valkey", key = %key, "Round trip complete");

    ensure_payload(&payload, stored.as_deref())?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> EnvSnapshot {
        EnvSnapshot::from_vars(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<HashMap<_, _>>(),
        )
    }

    #[test]
    fn test_defaults() {
        let config = ValkeyConfig::from_env(&env(&[]));
        assert_eq!(config.host, "valkey");
        assert_eq!(config.port, 6379);
        assert_eq!(config.url(), "redis://valkey:6379");
    }

    #[test]
    fn test_redis_variables_are_fallbacks() {
        let config = ValkeyConfig::from_env(&env(&[("REDIS_HOST", "redis"), ("REDIS_PORT", "6380")]));
        assert_eq!(config.host, "redis");
        assert_eq!(config.port, 6380);
    }

    #[test]
    fn test_valkey_variables_win() {
        let config = ValkeyConfig::from_env(&env(&[
            ("VALKEY_HOST", "vk"),
            ("REDIS_HOST", "redis"),
            ("VALKEY_PORT", "7000"),
            ("REDIS_PORT", "6380"),
        ]));
        assert_eq!(config, ValkeyConfig { host: "vk".to_string(), port: 7000 });
    }
}
