//! Kafka check: ensure the health topic, produce one record, fetch it back.
//!
//! # Broker ordering
//!
//! `KAFKA_BROKERS` is a comma-separated `host:port` list. The internal
//! container-network broker `kafka:29092` always goes first, then the
//! non-loopback entries, then everything else, deduplicated by `host:port`.
//! The gate checks the first broker; the client is handed the whole list.
//! This ordering is specific to the dev-container network layout and is not
//! meant as a general broker-selection policy.

use super::{bounded, ensure_payload, CheckContext, ServiceCheck};
use crate::gate::{gate_check, GateConfig};
use async_trait::async_trait;
use chrono::Utc;
use common::config::EnvSnapshot;
use common::error::CheckError;
use common::types::TestOutcome;
use rskafka::client::error::{Error as KafkaError, ProtocolError};
use rskafka::client::partition::{Compression, UnknownTopicHandling};
use rskafka::client::ClientBuilder;
use rskafka::record::Record;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, instrument};
use uuid::Uuid;

pub const SERVICE: &str = "Kafka";
pub const CLIENT: &str = "rust-rskafka";
pub const ENV_FLAG: &str = "ENABLE_KAFKA";

const DEFAULT_HOST: &str = "kafka";
const DEFAULT_PORT: u16 = 29092;
const DEFAULT_BROKERS: &str = "kafka:29092";
/// Default topics are `health-check-<uuid>`, one per run.
const DEFAULT_TOPIC_PREFIX: &str = "health-check";
const LOOPBACK_HOSTS: [&str; 2] = ["localhost", "127.0.0.1"];

/// Broker-side timeout for topic creation.
const CREATE_TOPIC_TIMEOUT_MS: i32 = 5_000;

/// Max wait for the fetch that reads the record back.
const FETCH_MAX_WAIT_MS: i32 = 1_000;

/// One bootstrap broker address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Broker {
    pub host: String,
    pub port: u16,
}

impl Broker {
    fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
        }
    }

    fn internal() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }

    fn is_loopback(&self) -> bool {
        LOOPBACK_HOSTS.contains(&self.host.as_str())
    }

    /// Parse `host:port`. A missing host becomes `kafka`, a missing or invalid port `29092`.
    fn parse(entry: &str) -> Self {
        let (host, port) = entry.split_once(':').unwrap_or((entry, ""));
        let host = if host.is_empty() { DEFAULT_HOST } else { host };
        let port = port.parse().unwrap_or(DEFAULT_PORT);
        Self::new(host, port)
    }
}

impl fmt::Display for Broker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

fn push_unique(list: &mut Vec<Broker>, broker: &Broker) {
    if !list.contains(broker) {
        list.push(broker.clone());
    }
}

/// Order the configured brokers: internal first, then non-loopback, then the rest.
pub fn prioritize_brokers(raw: &str) -> Vec<Broker> {
    let mut unique = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        push_unique(&mut unique, &Broker::parse(entry));
    }

    let mut prioritized = vec![Broker::internal()];
    for broker in unique.iter().filter(|b| !b.is_loopback()) {
        push_unique(&mut prioritized, broker);
    }
    for broker in &unique {
        push_unique(&mut prioritized, broker);
    }

    prioritized
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaConfig {
    pub brokers: Vec<Broker>,
    pub topic: String,
}

impl KafkaConfig {
    pub fn from_env(env: &EnvSnapshot) -> Self {
        Self {
            brokers: prioritize_brokers(&env.string("KAFKA_BROKERS", DEFAULT_BROKERS)),
            topic: env.get("KAFKA_HEALTH_TOPIC").map_or_else(
                || format!("{DEFAULT_TOPIC_PREFIX}-{}", Uuid::new_v4()),
                str::to_string,
            ),
        }
    }

    /// Broker the gate dials.
    fn primary(&self) -> Broker {
        self.brokers.first().cloned().unwrap_or_else(Broker::internal)
    }
}

pub struct KafkaCheck;

#[async_trait]
impl ServiceCheck for KafkaCheck {
    fn service(&self) -> &'static str {
        SERVICE
    }

    fn client(&self) -> &'static str {
        CLIENT
    }

    #[instrument(skip_all, fields(service = SERVICE))]
    async fn run(&self, ctx: &CheckContext) -> Result<TestOutcome, CheckError> {
        let config = KafkaConfig::from_env(&ctx.env);
        let primary = config.primary();
        let gate = GateConfig::new(SERVICE, CLIENT, ENV_FLAG, false, &primary.host, Some(primary.port));
        if let Some(outcome) = gate_check(&gate, &ctx.env, &ctx.poll).await {
            return Ok(outcome);
        }

        let offset = bounded("round trip", round_trip(&config)).await?;
        Ok(TestOutcome::pass(
            SERVICE,
            CLIENT,
            format!("Produced and consumed record at offset {offset} on {}", config.topic),
        ))
    }
}

fn is_topic_already_exists(e: &KafkaError) -> bool {
    matches!(
        e,
        KafkaError::ServerError {
            protocol_error: ProtocolError::TopicAlreadyExists,
            ..
        }
    )
}

fn kafka_error(operation: &str, e: &KafkaError) -> CheckError {
    CheckError::Kafka(format!("{operation} failed: {e}"))
}

async fn round_trip(config: &KafkaConfig) -> Result<i64, CheckError> {
    let bootstrap: Vec<String> = config.brokers.iter().map(ToString::to_string).collect();

    // The client and its broker connections are dropped when this function returns
    let client = ClientBuilder::new(bootstrap)
        .build()
        .await
        .map_err(|e| kafka_error("connect", &e))?;

    let controller = client
        .controller_client()
        .map_err(|e| kafka_error("controller lookup", &e))?;

    match controller
        .create_topic(config.topic.as_str(), 1, 1, CREATE_TOPIC_TIMEOUT_MS)
        .await
    {
        Ok(()) => debug!(target: "conn_check.checks.kafka", topic = %config.topic, "Created topic"),
        Err(e) if is_topic_already_exists(&e) => {
            debug!(target: "conn_check.checks.kafka", topic = %config.topic, "Topic already exists");
        }
        Err(e) => return Err(kafka_error("create topic", &e)),
    }

    let partition = client
        .partition_client(config.topic.as_str(), 0, UnknownTopicHandling::Retry)
        .await
        .map_err(|e| kafka_error("partition lookup", &e))?;

    let payload = Uuid::new_v4().to_string();
    let record = Record {
        key: Some(b"health".to_vec()),
        value: Some(payload.clone().into_bytes()),
        headers: BTreeMap::new(),
        timestamp: Utc::now(),
    };

    let offsets = partition
        .produce(vec![record], Compression::NoCompression)
        .await
        .map_err(|e| kafka_error("produce", &e))?;
    let offset = offsets
        .first()
        .copied()
        .ok_or_else(|| CheckError::Kafka("produce returned no offset".to_string()))?;

    let (records, _high_watermark) = partition
        .fetch_records(offset, 1..1_000_000, FETCH_MAX_WAIT_MS)
        .await
        .map_err(|e| kafka_error("fetch", &e))?;

    let consumed = records
        .into_iter()
        .find(|r| r.offset == offset)
        .and_then(|r| r.record.value)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned());

    debug!(
        target: "conn_check.checks.kafka",
        topic = %config.topic,
        offset,
        "Round trip complete"
    );

    ensure_payload(&payload, consumed.as_deref())?;
    Ok(offset)
}
