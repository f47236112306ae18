//! S3-backed content store

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use tracing::{debug, info};

use pitrix_import_types::{ContentStore, ImportResult};

use crate::error::BlobError;

/// Content type advertised for bundle payloads
pub const PAYLOAD_CONTENT_TYPE: &str = "application/gzip";

/// Connection settings for an S3-compatible object store
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Custom endpoint (MinIO and friends); `None` for AWS
    pub endpoint: Option<String>,
    pub region: String,
    pub bucket: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub force_path_style: bool,
}

impl S3Config {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            endpoint: None,
            region: "us-east-1".to_string(),
            bucket: bucket.into(),
            access_key_id: None,
            secret_access_key: None,
            force_path_style: true,
        }
    }

    fn validate(&self) -> Result<(), BlobError> {
        if self.bucket.trim().is_empty() {
            return Err(BlobError::InvalidConfiguration(
                "S3 bucket must not be empty".to_string(),
            ));
        }
        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err(BlobError::InvalidConfiguration(
                "S3 access key id and secret access key must be given together".to_string(),
            ));
        }
        Ok(())
    }

    /// Endpoint URL with a scheme, defaulting to plain http for bare host:port
    fn endpoint_url(&self) -> Option<String> {
        self.endpoint.as_ref().map(|endpoint| {
            if endpoint.starts_with("http") {
                endpoint.clone()
            } else {
                format!("http://{}", endpoint)
            }
        })
    }
}

pub struct S3ContentStore {
    client: S3Client,
    bucket: String,
}

impl S3ContentStore {
    /// Connect and make sure the bucket exists
    pub async fn connect(config: &S3Config) -> Result<Self, BlobError> {
        let store = Self {
            client: create_s3_client(config).await?,
            bucket: config.bucket.clone(),
        };
        store.ensure_bucket().await?;
        Ok(store)
    }

    pub fn from_client(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub async fn ensure_bucket(&self) -> Result<(), BlobError> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {
                debug!("Bucket {} already exists", self.bucket);
                return Ok(());
            }
            Err(err) => {
                debug!("Bucket {} does not exist: {}", self.bucket, err);
            }
        }

        self.client
            .create_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| BlobError::Bucket {
                bucket: self.bucket.clone(),
                message: format!("{:?}", e),
            })?;

        info!("Created bucket {}", self.bucket);
        Ok(())
    }
}

#[async_trait]
impl ContentStore for S3ContentStore {
    async fn upload(&self, key: &str, file_name: &str, body: Bytes) -> ImportResult<()> {
        let size = body.len();
        debug!("PUT {}/{} ({} bytes)", self.bucket, key, size);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(PAYLOAD_CONTENT_TYPE)
            .content_disposition(format!("attachment; filename=\"{}\"", file_name))
            .send()
            .await
            .map_err(|e| BlobError::UploadFailed(format!("{}: {}", key, e)))?;

        Ok(())
    }
}

async fn create_s3_client(config: &S3Config) -> Result<S3Client, BlobError> {
    config.validate()?;

    let region = aws_sdk_s3::config::Region::new(config.region.clone());
    let mut loader =
        aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);

    if let (Some(access_key), Some(secret_key)) =
        (&config.access_key_id, &config.secret_access_key)
    {
        loader = loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
            access_key.clone(),
            secret_key.clone(),
            None,
            None,
            "pitrix-import",
        ));
    }

    if let Some(endpoint_url) = config.endpoint_url() {
        loader = loader.endpoint_url(endpoint_url);
    }

    let shared = loader.load().await;
    let s3_config = aws_sdk_s3::config::Builder::from(&shared)
        .force_path_style(config.force_path_style)
        .build();

    Ok(S3Client::from_conf(s3_config))
}
