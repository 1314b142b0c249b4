use crate::backend::{Backend, BackendType, ObjectInfo};
use crate::retry::{retry_with_backoff, RetryConfig};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{
    Client,
    config::{Credentials, Builder as S3ConfigBuilder},
    config::http::HttpResponse,
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    primitives::ByteStream,
    types::{BucketLocationConstraint, CreateBucketConfiguration, Object},
};
use futures::stream::{self, BoxStream, StreamExt};
use minio_backup_core::{BackupSettings, Error, Result};
use std::path::Path;
use tracing::debug;

/// Region for which S3 rejects an explicit location constraint.
const DEFAULT_REGION: &str = "us-east-1";

const TRANSIENT_STATUS: [u16; 5] = [429, 500, 502, 503, 504];
const TRANSIENT_CODES: [&str; 5] = [
    "SlowDown",
    "InternalError",
    "RequestTimeout",
    "ServiceUnavailable",
    "ThrottlingException",
];

#[derive(Debug, Clone)]
pub struct MinIOConfig {
    /// `host:port`, or a full `http(s)://` URL.
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
    pub use_ssl: bool,
    pub path_style: bool,
    pub retry: RetryConfig,
}

impl Default for MinIOConfig {
    fn default() -> Self {
        Self {
            endpoint: "localhost:9000".to_string(),
            access_key: "".to_string(),
            secret_key: "".to_string(),
            bucket: "".to_string(),
            region: DEFAULT_REGION.to_string(),
            use_ssl: true,
            path_style: true, // MinIO typically uses path-style
            retry: RetryConfig::quick(),
        }
    }
}

impl From<&BackupSettings> for MinIOConfig {
    fn from(settings: &BackupSettings) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            access_key: settings.access_key_id.clone(),
            secret_key: settings.secret_access_key.clone(),
            bucket: settings.bucket_name.clone(),
            region: settings.location.clone(),
            use_ssl: settings.use_ssl,
            ..Default::default()
        }
    }
}

impl MinIOConfig {
    pub fn endpoint_url(&self) -> String {
        if self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://") {
            self.endpoint.clone()
        } else {
            let scheme = if self.use_ssl { "https" } else { "http" };
            format!("{}://{}", scheme, self.endpoint)
        }
    }
}

pub struct MinIOBackend {
    client: Client,
    config: MinIOConfig,
}

enum ListCursor {
    Start,
    Continue(String),
    Done,
}

impl MinIOBackend {
    pub fn new(config: MinIOConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "minio-backup",
        );

        let s3_config = S3ConfigBuilder::new()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .endpoint_url(config.endpoint_url())
            .force_path_style(config.path_style)
            .build();

        Self {
            client: Client::from_conf(s3_config),
            config,
        }
    }

    async fn list_page(&self, prefix: &str, token: Option<String>) -> Result<(Vec<Result<ObjectInfo>>, ListCursor)> {
        let client = &self.client;
        let bucket = self.config.bucket.as_str();

        let page = retry_with_backoff(&self.config.retry, "list_objects_v2", move || {
            let token = token.clone();
            async move {
                client
                    .list_objects_v2()
                    .bucket(bucket)
                    .prefix(prefix)
                    .set_continuation_token(token)
                    .send()
                    .await
                    .map_err(|e| store_error("Failed to list objects", e))
            }
        })
        .await?;

        let entries = page.contents().iter().map(object_info).collect();
        let cursor = match page.next_continuation_token() {
            Some(next) if page.is_truncated().unwrap_or(false) => ListCursor::Continue(next.to_string()),
            _ => ListCursor::Done,
        };

        Ok((entries, cursor))
    }
}

/// Timeouts, dropped connections, throttling and 5xx responses.
fn is_transient<E: ProvideErrorMetadata>(error: &SdkError<E, HttpResponse>) -> bool {
    match error {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => true,
        SdkError::ResponseError(_) | SdkError::ServiceError(_) => {
            error
                .raw_response()
                .is_some_and(|raw| TRANSIENT_STATUS.contains(&raw.status().as_u16()))
                || error.code().is_some_and(|code| TRANSIENT_CODES.contains(&code))
        }
        _ => false,
    }
}

fn store_error<E>(context: impl std::fmt::Display, error: SdkError<E, HttpResponse>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let message = format!("{}: {}", context, DisplayErrorContext(&error));
    if is_transient(&error) {
        Error::Unavailable(message)
    } else {
        Error::Store(message)
    }
}

fn object_info(object: &Object) -> Result<ObjectInfo> {
    let key = object
        .key()
        .ok_or_else(|| Error::Store("Listed object has no key".to_string()))?;

    let size = object.size().and_then(|s| u64::try_from(s).ok()).unwrap_or(0);
    let modified = object
        .last_modified()
        .and_then(|t| chrono::DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
        .unwrap_or_default();

    Ok(ObjectInfo {
        key: key.to_string(),
        size,
        modified,
    })
}

#[async_trait]
impl Backend for MinIOBackend {
    fn bucket(&self) -> &str {
        &self.config.bucket
    }

    async fn make_bucket(&self, region: &str) -> Result<()> {
        let mut request = self.client.create_bucket().bucket(&self.config.bucket);

        if !region.is_empty() && region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }

        request
            .send()
            .await
            .map_err(|e| store_error(format_args!("Failed to create bucket {}", self.config.bucket), e))?;

        debug!(bucket = %self.config.bucket, region, "Created bucket");
        Ok(())
    }

    async fn bucket_exists(&self) -> Result<bool> {
        match self.client.head_bucket().bucket(&self.config.bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.as_service_error().map(|s| s.is_not_found()).unwrap_or(false) {
                    Ok(false)
                } else {
                    Err(store_error(format_args!("Bucket {} not accessible", self.config.bucket), e))
                }
            }
        }
    }

    fn list<'a>(&'a self, prefix: &'a str) -> BoxStream<'a, Result<ObjectInfo>> {
        stream::unfold(ListCursor::Start, move |cursor| async move {
            let token = match cursor {
                ListCursor::Start => None,
                ListCursor::Continue(token) => Some(token),
                ListCursor::Done => return None,
            };

            match self.list_page(prefix, token).await {
                Ok((entries, next)) => Some((entries, next)),
                // The continuation token is lost with the failed page.
                Err(e) => Some((vec![Err(e)], ListCursor::Done)),
            }
        })
        .flat_map(stream::iter)
        .boxed()
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let client = &self.client;
        let bucket = self.config.bucket.as_str();

        retry_with_backoff(&self.config.retry, "delete_object", move || async move {
            client
                .delete_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| store_error(format_args!("Failed to delete object {}", key), e))
        })
        .await?;

        debug!(key, "Deleted object");
        Ok(())
    }

    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Result<u64> {
        let size = tokio::fs::metadata(path).await?.len();
        let client = &self.client;
        let bucket = self.config.bucket.as_str();

        retry_with_backoff(&self.config.retry, "put_object", move || async move {
            let body = ByteStream::from_path(path)
                .await
                .map_err(|e| Error::Store(format!("Failed to read {}: {}", path.display(), e)))?;

            client
                .put_object()
                .bucket(bucket)
                .key(key)
                .content_type(content_type)
                .body(body)
                .send()
                .await
                .map_err(|e| store_error(format_args!("Failed to upload {}", key), e))
        })
        .await?;

        debug!(key, bytes = size, "Uploaded object");
        Ok(size)
    }

    fn backend_type(&self) -> BackendType {
        BackendType::S3 // MinIO is S3-compatible
    }
}
