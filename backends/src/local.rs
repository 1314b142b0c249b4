use crate::backend::{Backend, BackendType, ObjectInfo};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use minio_backup_core::{Error, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

/// A bucket that is a plain directory under `base_path`.
///
/// Object keys map to paths below the bucket directory, a `/` in a key
/// being a sub-directory.
/// Selected with a `file://` endpoint; handy for trying a configuration
/// against a local disk before pointing it at a real store.
pub struct LocalBackend {
    base_path: PathBuf,
    bucket: String,
}

impl LocalBackend {
    pub fn new<P: AsRef<Path>>(base_path: P, bucket: impl Into<String>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            bucket: bucket.into(),
        }
    }

    fn bucket_path(&self) -> PathBuf {
        self.base_path.join(&self.bucket)
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.bucket_path().join(key)
    }

    async fn scan(&self, prefix: &str) -> Vec<Result<ObjectInfo>> {
        let bucket_path = self.bucket_path();
        let prefix = prefix.to_string();

        match tokio::task::spawn_blocking(move || scan_bucket(&bucket_path, &prefix)).await {
            Ok(items) => items,
            Err(e) => vec![Err(Error::Store(format!("Listing task failed: {}", e)))],
        }
    }
}

/// Every file below the bucket directory, keyed by its `/`-separated path
/// relative to the bucket. Unreadable entries come first, then objects in
/// key order like an S3 listing.
fn scan_bucket(bucket_path: &Path, prefix: &str) -> Vec<Result<ObjectInfo>> {
    if let Err(e) = std::fs::metadata(bucket_path) {
        return vec![Err(Error::Store(format!(
            "Failed to list {}: {}",
            bucket_path.display(),
            e
        )))];
    }

    let mut objects = Vec::new();
    let mut errors = Vec::new();

    for entry in WalkDir::new(bucket_path).min_depth(1).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                errors.push(Error::Store(format!("Failed to read entry: {}", e)));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(bucket_path) else {
            continue;
        };
        let key = object_key(relative);
        if !key.starts_with(prefix) {
            continue;
        }

        match entry.metadata() {
            Ok(metadata) => {
                let modified = metadata
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_default();
                objects.push(ObjectInfo {
                    key,
                    size: metadata.len(),
                    modified,
                });
            }
            Err(e) => errors.push(Error::Store(format!("Failed to stat {}: {}", key, e))),
        }
    }

    objects.sort_by(|a, b| a.key.cmp(&b.key));

    errors
        .into_iter()
        .map(Err)
        .chain(objects.into_iter().map(Ok))
        .collect()
}

fn object_key(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl Backend for LocalBackend {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn make_bucket(&self, _region: &str) -> Result<()> {
        fs::create_dir_all(&self.base_path).await?;
        fs::create_dir(self.bucket_path()).await.map_err(|e| {
            Error::Store(format!("Failed to create bucket {}: {}", self.bucket, e))
        })
    }

    async fn bucket_exists(&self) -> Result<bool> {
        match fs::metadata(self.bucket_path()).await {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::Store(format!("Bucket {} not accessible: {}", self.bucket, e))),
        }
    }

    fn list<'a>(&'a self, prefix: &'a str) -> BoxStream<'a, Result<ObjectInfo>> {
        stream::once(self.scan(prefix))
            .flat_map(stream::iter)
            .boxed()
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.object_path(key)).await {
            Ok(()) => Ok(()),
            // Deleting a missing key succeeds on S3 as well.
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Store(format!("Failed to delete object {}: {}", key, e))),
        }
    }

    async fn put_file(&self, key: &str, path: &Path, _content_type: &str) -> Result<u64> {
        let destination = self.object_path(key);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(path, &destination)
            .await
            .map_err(|e| Error::Store(format!("Failed to upload {}: {}", key, e)))
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Local
    }
}
