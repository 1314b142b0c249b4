use async_trait::async_trait;
use futures::stream::BoxStream;
use minio_backup_core::{BackupSettings, Result};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    Local,
    S3,
}

/// The object store operations a backup run needs, scoped to one bucket.
#[async_trait]
pub trait Backend: Send + Sync {
    fn bucket(&self) -> &str;

    /// Create the bucket. Fails if it already exists, even when we own it;
    /// callers check [`Backend::bucket_exists`] to tell the two apart.
    async fn make_bucket(&self, region: &str) -> Result<()>;

    async fn bucket_exists(&self) -> Result<bool>;

    /// Objects whose key starts with `prefix`, in the store's listing order
    /// (lexical by key). A failure to produce one entry is yielded in place
    /// and does not necessarily end the stream.
    fn list<'a>(&'a self, prefix: &'a str) -> BoxStream<'a, Result<ObjectInfo>>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Upload a local file, returning the number of bytes written.
    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Result<u64>;

    fn backend_type(&self) -> BackendType;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    pub modified: chrono::DateTime<chrono::Utc>,
}

/// Builds the backend for a run once its settings have been validated.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, settings: &BackupSettings) -> Result<Box<dyn Backend>>;
}
