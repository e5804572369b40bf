//! OpenSearch check: ensure index, index a document, get it back, delete it.

use super::{bounded, ensure_payload, CheckContext, ServiceCheck};
use crate::gate::{gate_check, GateConfig};
use async_trait::async_trait;
use common::config::EnvSnapshot;
use common::error::CheckError;
use common::types::TestOutcome;
use opensearch::http::response::Response;
use opensearch::http::transport::Transport;
use opensearch::indices::IndicesCreateParts;
use opensearch::params::Refresh;
use opensearch::{DeleteParts, GetParts, IndexParts, OpenSearch};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};
use uuid::Uuid;

pub const SERVICE: &str = "OpenSearch";
pub const CLIENT: &str = "rust-opensearch";
pub const ENV_FLAG: &str = "ENABLE_OPENSEARCH";

/// Error type OpenSearch returns when the index is already there.
const INDEX_EXISTS_ERROR: &str = "resource_already_exists_exception";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSearchConfig {
    pub host: String,
    pub port: u16,
    pub index: String,
}

impl OpenSearchConfig {
    pub fn from_env(env: &EnvSnapshot) -> Self {
        Self {
            host: env.string("OPENSEARCH_HOST", "opensearch"),
            port: env.port("OPENSEARCH_PORT", 9200),
            index: env.string("OPENSEARCH_HEALTH_INDEX", "health-checks"),
        }
    }

    fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize)]
struct HealthDoc {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GetResponse {
    #[serde(rename = "_source")]
    source: Option<HealthDoc>,
}

pub struct OpenSearchCheck;

#[async_trait]
impl ServiceCheck for OpenSearchCheck {
    fn service(&self) -> &'static str {
        SERVICE
    }

    fn client(&self) -> &'static str {
        CLIENT
    }

    #[instrument(skip_all, fields(service = SERVICE))]
    async fn run(&self, ctx: &CheckContext) -> Result<TestOutcome, CheckError> {
        let config = OpenSearchConfig::from_env(&ctx.env);
        let gate = GateConfig::new(SERVICE, CLIENT, ENV_FLAG, false, &config.host, Some(config.port));
        if let Some(outcome) = gate_check(&gate, &ctx.env, &ctx.poll).await {
            return Ok(outcome);
        }

        let transport = Transport::single_node(&config.base_url()).map_err(|e| {
            CheckError::Configuration(format!("Invalid OpenSearch address {}: {e}", config.base_url()))
        })?;
        let client = OpenSearch::new(transport);

        let doc_id = bounded("round trip", round_trip(&client, &config)).await?;
        Ok(TestOutcome::pass(
            SERVICE,
            CLIENT,
            format!("Indexed and fetched doc {doc_id} in {}", config.index),
        ))
    }
}

fn transport_error(operation: &str, e: &opensearch::Error) -> CheckError {
    CheckError::Transport(format!("{operation} failed: {e}"))
}

async fn unexpected_status(operation: &str, response: Response) -> CheckError {
    let status = response.status_code().as_u16();
    let body = response.text().await.unwrap_or_default();
    CheckError::UnexpectedStatus {
        operation: operation.to_string(),
        status,
        body,
    }
}

async fn ensure_index(client: &OpenSearch, index: &str) -> Result<(), CheckError> {
    let response = client
        .indices()
        .create(IndicesCreateParts::Index(index))
        .body(json!({
            "settings": { "number_of_shards": 1 },
            "mappings": { "properties": { "message": { "type": "keyword" } } }
        }))
        .send()
        .await
        .map_err(|e| transport_error("create index", &e))?;

    let status = response.status_code().as_u16();
    if response.status_code().is_success() {
        debug!(target: "conn_check.checks.opensearch", index, "Created index");
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    if status == 400 && body.contains(INDEX_EXISTS_ERROR) {
        debug!(target: "conn_check.checks.opensearch", index, "Index already exists");
        return Ok(());
    }

    Err(CheckError::UnexpectedStatus {
        operation: "create index".to_string(),
        status,
        body,
    })
}

async fn round_trip(client: &OpenSearch, config: &OpenSearchConfig) -> Result<String, CheckError> {
    ensure_index(client, &config.index).await?;

    let doc_id = Uuid::new_v4().to_string();
    let message = format!("{CLIENT}-{doc_id}");

    let response = client
        .index(IndexParts::IndexId(&config.index, &doc_id))
        .body(json!({ "message": message }))
        .refresh(Refresh::True)
        .send()
        .await
        .map_err(|e| transport_error("index document", &e))?;
    if !response.status_code().is_success() {
        return Err(unexpected_status("index document", response).await);
    }

    let response = client
        .get(GetParts::IndexId(&config.index, &doc_id))
        .send()
        .await
        .map_err(|e| transport_error("get document", &e))?;
    if !response.status_code().is_success() {
        return Err(unexpected_status("get document", response).await);
    }
    let fetched: GetResponse = response
        .json()
        .await
        .map_err(|e| CheckError::Serialization(format!("get document body: {e}")))?;

    let response = client
        .delete(DeleteParts::IndexId(&config.index, &doc_id))
        .send()
        .await
        .map_err(|e| transport_error("delete document", &e))?;
    if !response.status_code().is_success() {
        return Err(unexpected_status("delete document", response).await);
    }

    ensure_payload(&message, fetched.source.as_ref().map(|doc| doc.message.as_str()))?;
    Ok(doc_id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::reachability::PollSettings;
    use common::types::Status;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DOC_PATH: &str = r"^/health-checks/_doc/[0-9a-f-]+$";

    fn context(server: &MockServer) -> CheckContext {
        let env = EnvSnapshot::from_vars(HashMap::from([
            (ENV_FLAG.to_string(), "true".to_string()),
            ("OPENSEARCH_HOST".to_string(), "127.0.0.1".to_string()),
            ("OPENSEARCH_PORT".to_string(), server.address().port().to_string()),
        ]));
        CheckContext::new(env, PollSettings::default())
    }

    async fn mount_create_index(server: &MockServer, template: ResponseTemplate) {
        Mock::given(method("PUT"))
            .and(path("/health-checks"))
            .respond_with(template)
            .mount(server)
            .await;
    }

    /// Document store stand-in: PUT remembers the source, GET returns it.
    async fn mount_documents(server: &MockServer) {
        let stored = Arc::new(Mutex::new(Value::Null));

        let on_put = Arc::clone(&stored);
        Mock::given(method("PUT"))
            .and(path_regex(DOC_PATH))
            .respond_with(move |request: &wiremock::Request| {
                *on_put.lock().unwrap() = serde_json::from_slice(&request.body).unwrap();
                ResponseTemplate::new(201).set_body_json(json!({ "result": "created" }))
            })
            .mount(server)
            .await;

        let on_get = Arc::clone(&stored);
        Mock::given(method("GET"))
            .and(path_regex(DOC_PATH))
            .respond_with(move |_: &wiremock::Request| {
                ResponseTemplate::new(200).set_body_json(json!({
                    "_index": "health-checks",
                    "found": true,
                    "_source": on_get.lock().unwrap().clone()
                }))
            })
            .mount(server)
            .await;

        Mock::given(method("DELETE"))
            .and(path_regex(DOC_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "deleted" })))
            .mount(server)
            .await;
    }

    #[test]
    fn test_defaults() {
        let config = OpenSearchConfig::from_env(&EnvSnapshot::default());
        assert_eq!(config.base_url(), "http://opensearch:9200");
        assert_eq!(config.index, "health-checks");
    }

    #[test]
    fn test_get_response_parsing() {
        let body = r#"{"_index":"health-checks","_id":"1","found":true,"_source":{"message":"hello"}}"#;
        let parsed: GetResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.source.map(|d| d.message), Some("hello".to_string()));

        let missing = r#"{"_index":"health-checks","_id":"1","found":false}"#;
        let parsed: GetResponse = serde_json::from_str(missing).unwrap();
        assert!(parsed.source.is_none());
    }

    #[tokio::test]
    async fn test_round_trip_creates_index() {
        let server = MockServer::start().await;
        mount_create_index(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({ "acknowledged": true })),
        )
        .await;
        mount_documents(&server).await;

        let outcome = OpenSearchCheck.run(&context(&server)).await.unwrap();

        assert_eq!(outcome.status, Status::Pass);
        assert!(outcome.detail.ends_with("in health-checks"));
    }

    #[tokio::test]
    async fn test_existing_index_is_reused() {
        let server = MockServer::start().await;
        mount_create_index(
            &server,
            ResponseTemplate::new(400).set_body_json(json!({
                "error": { "type": "resource_already_exists_exception", "index": "health-checks" },
                "status": 400
            })),
        )
        .await;
        mount_documents(&server).await;

        let outcome = OpenSearchCheck.run(&context(&server)).await.unwrap();

        assert_eq!(outcome.status, Status::Pass);
    }

    #[tokio::test]
    async fn test_other_bad_request_on_create_fails() {
        let server = MockServer::start().await;
        mount_create_index(
            &server,
            ResponseTemplate::new(400).set_body_json(json!({
                "error": { "type": "illegal_argument_exception" },
                "status": 400
            })),
        )
        .await;

        let err = OpenSearchCheck.run(&context(&server)).await.unwrap_err();

        match err {
            CheckError::UnexpectedStatus { operation, status, body } => {
                assert_eq!(operation, "create index");
                assert_eq!(status, 400);
                assert!(body.contains("illegal_argument_exception"));
            }
            other => panic!("expected UnexpectedStatus, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_document_read_back_with_other_message_fails() {
        let server = MockServer::start().await;
        mount_create_index(&server, ResponseTemplate::new(200)).await;
        Mock::given(method("PUT"))
            .and(path_regex(DOC_PATH))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(DOC_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "found": true,
                "_source": { "message": "tampered" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path_regex(DOC_PATH))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let err = OpenSearchCheck.run(&context(&server)).await.unwrap_err();

        match err {
            CheckError::PayloadMismatch { actual, .. } => assert_eq!(actual, "tampered"),
            other => panic!("expected PayloadMismatch, got {other:?}"),
        }
    }
}
