//! MinIO check over the S3 API: ensure bucket, put an object, get it back, delete it.
//!
//! Requests use path-style addressing (`/<bucket>/<key>`).

use super::{bounded, ensure_payload, CheckContext, ServiceCheck};
use crate::gate::{gate_check, GateConfig};
use async_trait::async_trait;
use common::config::EnvSnapshot;
use common::error::CheckError;
use common::secret::{ExposeSecret, SecretString};
use common::types::TestOutcome;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::region::Region;
use s3::request::ResponseData;
use s3::BucketConfiguration;
use tracing::{debug, instrument};
use uuid::Uuid;

pub const SERVICE: &str = "MinIO";
pub const CLIENT: &str = "rust-s3";
pub const ENV_FLAG: &str = "ENABLE_MINIO";

/// S3 error code returned when we already own the bucket we try to create.
const BUCKET_OWNED_ERROR: &str = "BucketAlreadyOwnedByYou";

#[derive(Debug, Clone)]
pub struct MinioConfig {
    pub host: String,
    pub port: u16,
    pub access_key: String,
    pub secret_key: SecretString,
    pub bucket: String,
    pub region: String,
}

impl MinioConfig {
    pub fn from_env(env: &EnvSnapshot) -> Self {
        Self {
            host: env.string("MINIO_HOST", "minio"),
            port: env.port("MINIO_PORT", 9000),
            access_key: env.string("MINIO_ACCESS_KEY", "minio"),
            secret_key: env.secret("MINIO_SECRET_KEY", "minio12345"),
            bucket: env.string("MINIO_HEALTH_BUCKET", "health-checks"),
            region: env.string("MINIO_REGION", "us-east-1"),
        }
    }

    fn region(&self) -> Region {
        Region::Custom {
            region: self.region.clone(),
            endpoint: format!("http://{}:{}", self.host, self.port),
        }
    }

    fn credentials(&self) -> Result<Credentials, CheckError> {
        Credentials::new(
            Some(self.access_key.as_str()),
            Some(self.secret_key.expose_secret()),
            None,
            None,
            None,
        )
        .map_err(|e| CheckError::Configuration(format!("Invalid MinIO credentials: {e}")))
    }
}

/// Status and body of one S3 call.
///
/// Depending on client features a non-2xx answer arrives either as a normal
/// response or as `S3Error::HttpFailWithBody`; both end up here.
#[derive(Debug)]
struct S3Reply {
    status: u16,
    body: String,
}

impl S3Reply {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn from_error(operation: &str, error: S3Error) -> Result<Self, CheckError> {
        match error {
            S3Error::HttpFailWithBody(status, body) => Ok(Self { status, body }),
            other => Err(CheckError::Transport(format!("{operation} failed: {other}"))),
        }
    }

    fn from_result(operation: &str, result: Result<ResponseData, S3Error>) -> Result<Self, CheckError> {
        match result {
            Ok(data) => Ok(Self {
                status: data.status_code(),
                body: String::from_utf8_lossy(data.bytes()).into_owned(),
            }),
            Err(e) => Self::from_error(operation, e),
        }
    }

    fn into_error(self, operation: &str) -> CheckError {
        CheckError::UnexpectedStatus {
            operation: operation.to_string(),
            status: self.status,
            body: self.body,
        }
    }
}

pub struct MinioCheck;

#[async_trait]
impl ServiceCheck for MinioCheck {
    fn service(&self) -> &'static str {
        SERVICE
    }

    fn client(&self) -> &'static str {
        CLIENT
    }

    #[instrument(skip_all, fields(service = SERVICE))]
    async fn run(&self, ctx: &CheckContext) -> Result<TestOutcome, CheckError> {
        let config = MinioConfig::from_env(&ctx.env);
        let gate = GateConfig::new(SERVICE, CLIENT, ENV_FLAG, true, &config.host, Some(config.port));
        if let Some(outcome) = gate_check(&gate, &ctx.env, &ctx.poll).await {
            return Ok(outcome);
        }

        let credentials = config.credentials()?;
        let bucket = Bucket::new(&config.bucket, config.region(), credentials.clone())
            .map_err(|e| CheckError::Configuration(format!("Invalid bucket settings: {e}")))?
            .with_path_style();

        bounded("create bucket", ensure_bucket(&config, credentials)).await?;
        let object = bounded("round trip", round_trip(&bucket)).await?;
        Ok(TestOutcome::pass(
            SERVICE,
            CLIENT,
            format!("Uploaded and read {object} in bucket {}", config.bucket),
        ))
    }
}

async fn ensure_bucket(config: &MinioConfig, credentials: Credentials) -> Result<(), CheckError> {
    let created = Bucket::create_with_path_style(
        &config.bucket,
        config.region(),
        credentials,
        BucketConfiguration::default(),
    )
    .await;

    let reply = match created {
        Ok(response) => S3Reply {
            status: response.response_code,
            body: response.response_text,
        },
        Err(e) => S3Reply::from_error("create bucket", e)?,
    };

    if reply.is_success() {
        debug!(target: "conn_check.checks.minio", bucket = %config.bucket, "Created bucket");
        return Ok(());
    }
    if reply.body.contains(BUCKET_OWNED_ERROR) {
        debug!(target: "conn_check.checks.minio", bucket = %config.bucket, "Bucket already exists");
        return Ok(());
    }

    Err(reply.into_error("create bucket"))
}

async fn round_trip(bucket: &Bucket) -> Result<String, CheckError> {
    let object = format!("health/{}.txt", Uuid::new_v4());
    let key = format!("/{object}");
    let payload = format!("{CLIENT}-{}", Uuid::new_v4());

    let reply = S3Reply::from_result("put object", bucket.put_object(&key, payload.as_bytes()).await)?;
    if !reply.is_success() {
        return Err(reply.into_error("put object"));
    }

    let fetched = S3Reply::from_result("get object", bucket.get_object(&key).await)?;
    if !fetched.is_success() {
        return Err(fetched.into_error("get object"));
    }

    let reply = S3Reply::from_result("delete object", bucket.delete_object(&key).await)?;
    if !reply.is_success() {
        return Err(reply.into_error("delete object"));
    }

    debug!(target: "conn_check.checks.minio", object = %object, "Round trip complete");

    ensure_payload(&payload, Some(fetched.body.as_str()))?;
    Ok(object)
}
