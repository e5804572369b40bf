//! MySQL check: insert a row, read it back, delete it.

use super::{bounded, database_error, ensure_payload, CheckContext, ServiceCheck};
use crate::gate::{gate_check, GateConfig};
use async_trait::async_trait;
use common::config::EnvSnapshot;
use common::error::CheckError;
use common::secret::{ExposeSecret, SecretString};
use common::types::TestOutcome;
use sqlx::mysql::MySqlConnectOptions;
use sqlx::{Connection, MySqlConnection};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

pub const SERVICE: &str = "MySQL";
pub const CLIENT: &str = "rust-sqlx-mysql";
pub const ENV_FLAG: &str = "ENABLE_MYSQL";

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS health_check_events (
    id CHAR(36) PRIMARY KEY,
    source VARCHAR(64) NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

/// Connection settings, read from `MYSQL_*` variables.
#[derive(Debug, Clone)]
pub struct MysqlConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: SecretString,
    pub database: String,
}

impl MysqlConfig {
    pub fn from_env(env: &EnvSnapshot) -> Self {
        Self {
            host: env.string("MYSQL_HOST", "mysql"),
            port: env.port("MYSQL_PORT", 3306),
            user: env.string("MYSQL_USER", "mysql"),
            password: env.secret("MYSQL_PASSWORD", "mysql"),
            database: env.string("MYSQL_DATABASE", "devcontainer_db"),
        }
    }

    fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(self.password.expose_secret())
            .database(&self.database)
    }
}

pub struct MysqlCheck;

#[async_trait]
impl ServiceCheck for MysqlCheck {
    fn service(&self) -> &'static str {
        SERVICE
    }

    fn client(&self) -> &'static str {
        CLIENT
    }

    #[instrument(skip_all, fields(service = SERVICE))]
    async fn run(&self, ctx: &CheckContext) -> Result<TestOutcome, CheckError> {
        let config = MysqlConfig::from_env(&ctx.env);
        let gate = GateConfig::new(SERVICE, CLIENT, ENV_FLAG, false, &config.host, Some(config.port));
        if let Some(outcome) = gate_check(&gate, &ctx.env, &ctx.poll).await {
            return Ok(outcome);
        }

        let options = config.connect_options();
        let mut conn = bounded("connect", async {
            MySqlConnection::connect_with(&options)
                .await
                .map_err(|e| database_error("connect", &e))
        })
        .await?;

        let result = bounded("round trip", round_trip(&mut conn)).await;

        if let Err(e) = conn.close().await {
            warn!(
                target: "conn_check.checks.mysql",
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

async fn round_trip(conn: &mut MySqlConnection) -> Result<String, CheckError> {
    sqlx::query(CREATE_TABLE)
        .execute(&mut *conn)
        .await
        .map_err(|e| database_error("create table", &e))?;

    let event_id = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO health_check_events (id, source) VALUES (?, ?)")
        .bind(&event_id)
        .bind(CLIENT)
        .execute(&mut *conn)
        .await
        .map_err(|e| database_error("insert", &e))?;

    let source: Option<String> =
        sqlx::query_scalar("SELECT source FROM health_check_events WHERE id = ?")
            .bind(&event_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| database_error("select", &e))?;

    sqlx::query("DELETE FROM health_check_events WHERE id = ?")
        .bind(&event_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| database_error("delete", &e))?;

    debug!(
        target: "conn_check.checks.mysql",
        event_id = %event_id,
        "Round trip complete"
    );

    ensure_payload(CLIENT, source.as_deref())?;
    Ok(event_id)
}
