//! PostgreSQL check: insert a row, read it back, delete it.

use super::{bounded, database_error, ensure_payload, CheckContext, ServiceCheck};
use crate::gate::{gate_check, GateConfig};
use async_trait::async_trait;
use common::config::EnvSnapshot;
use common::error::CheckError;
use common::secret::{ExposeSecret, SecretString};
use common::types::TestOutcome;
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

pub const SERVICE: &str = "PostgreSQL";
pub const CLIENT: &str = "rust-sqlx-pg";
pub const ENV_FLAG: &str = "ENABLE_POSTGRES";

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS health_check_events (
    id UUID PRIMARY KEY,
    source TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)";

/// Connection settings, read from `POSTGRES_*` variables.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: SecretString,
    pub database: String,
}

impl PostgresConfig {
    pub fn from_env(env: &EnvSnapshot) -> Self {
        Self {
            host: env.string("POSTGRES_HOST", "postgres"),
            port: env.port("POSTGRES_PORT", 5432),
            user: env.string("POSTGRES_USER", "postgres"),
            password: env.secret("POSTGRES_PASSWORD", "postgres"),
            database: env.string("POSTGRES_DB", "devcontainer_db"),
        }
    }

    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(self.password.expose_secret())
            .database(&self.database)
    }
}

pub struct PostgresCheck;

#[async_trait]
impl ServiceCheck for PostgresCheck {
    fn service(&self) -> &'static str {
        SERVICE
    }

    fn client(&self) -> &'static str {
        CLIENT
    }

    #[instrument(skip_all, fields(service = SERVICE))]
    async fn run(&self, ctx: &CheckContext) -> Result<TestOutcome, CheckError> {
        let config = PostgresConfig::from_env(&ctx.env);
        let gate = GateConfig::new(SERVICE, CLIENT, ENV_FLAG, true, &config.host, Some(config.port));
        if let Some(outcome) = gate_check(&gate, &ctx.env, &ctx.poll).await {
            return Ok(outcome);
        }

        let options = config.connect_options();
        let mut conn = bounded("connect", async {
            PgConnection::connect_with(&options)
                .await
                .map_err(|e| database_error("connect", &e))
        })
        .await?;

        let result = bounded("round trip", round_trip(&mut conn)).await;

        if let Err(e) = conn.close().await {
            warn!(
                target: "conn_check.checks.postgres",
                error = %e,
                "Failed to close connection cleanly"
            );
        }

        let event_id = result?;
        Ok(TestOutcome::pass(
            SERVICE,
            CLIENT,
            format!("Inserted and read back row {event_id}"),
        ))
    }
}

async fn round_trip(conn: &mut PgConnection) -> Result<Uuid, CheckError> {
    sqlx::query(CREATE_TABLE)
        .execute(&mut *conn)
        .await
        .map_err(|e| database_error("create table", &e))?;

    let event_id = Uuid::new_v4();
    sqlx::query("INSERT INTO health_check_events (id, source) VALUES ($1, $2)")
        .bind(event_id)
        .bind(CLIENT)
        .execute(&mut *conn)
        .await
        .map_err(|e| database_error("insert", &e))?;

    let source: Option<String> =
        sqlx::query_scalar("SELECT source FROM health_check_events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| database_error("select", &e))?;

    sqlx::query("DELETE FROM health_check_events WHERE id = $1")
        .bind(event_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| database_error("delete", &e))?;

    debug!(
        target: "conn_check.checks.postgres",
        %event_id,
        "Round trip complete"
    );

    ensure_payload(CLIENT, source.as_deref())?;
    Ok(event_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_defaults() {
        let config = PostgresConfig::from_env(&EnvSnapshot::default());
        assert_eq!(config.host, "postgres");
        assert_eq!(config.port, 5432);
        assert_eq!(config.user, "postgres");
        assert_eq!(config.password.expose_secret(), "postgres");
        assert_eq!(config.database, "devcontainer_db");
    }

    #[test]
    fn test_config_overrides_and_redaction() {
        let env = EnvSnapshot::from_vars(HashMap::from([
            ("POSTGRES_HOST".to_string(), "localhost".to_string()),
            ("POSTGRES_PORT".to_string(), "15432".to_string()),
            ("POSTGRES_PASSWORD".to_string(), "pg-secret".to_string()),
        ]));
        let config = PostgresConfig::from_env(&env);

        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 15432);
        assert!(!format!("{config:?}").contains("pg-secret"));
    }
}
