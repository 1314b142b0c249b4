use crate::backend::{Backend, Connector};
use crate::local::LocalBackend;
use crate::minio::{MinIOBackend, MinIOConfig};
use async_trait::async_trait;
use minio_backup_core::{BackupSettings, Error, Result};
use tracing::debug;

const LOCAL_SCHEME: &str = "file://";

/// Picks the backend from the endpoint: `file://<dir>` keeps buckets as
/// directories under `<dir>`, anything else is an S3-compatible server.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultConnector;

#[async_trait]
impl Connector for DefaultConnector {
    async fn connect(&self, settings: &BackupSettings) -> Result<Box<dyn Backend>> {
        if let Some(root) = settings.endpoint.strip_prefix(LOCAL_SCHEME) {
            if root.is_empty() {
                return Err(Error::Other(format!(
                    "Endpoint {} has no directory",
                    settings.endpoint
                )));
            }
            debug!(root, bucket = %settings.bucket_name, "Using local directory store");
            return Ok(Box::new(LocalBackend::new(root, settings.bucket_name.clone())));
        }

        let config = MinIOConfig::from(settings);
        debug!(endpoint = %config.endpoint_url(), bucket = %config.bucket, "Using S3 store");
        Ok(Box::new(MinIOBackend::new(config)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendType;

    fn settings(endpoint: &str) -> BackupSettings {
        BackupSettings {
            endpoint: endpoint.to_string(),
            access_key_id: "key".to_string(),
            secret_access_key: "secret".to_string(),
            bucket_name: "backups".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_file_endpoint_selects_local_backend() {
        let backend = DefaultConnector.connect(&settings("file:///srv/store")).await.unwrap();
        assert_eq!(backend.backend_type(), BackendType::Local);
        assert_eq!(backend.bucket(), "backups");
    }

    #[tokio::test]
    async fn test_host_endpoint_selects_s3_backend() {
        let backend = DefaultConnector.connect(&settings("play.min.io:9000")).await.unwrap();
        assert_eq!(backend.backend_type(), BackendType::S3);
    }

    #[tokio::test]
    async fn test_empty_file_endpoint_rejected() {
        assert!(DefaultConnector.connect(&settings("file://")).await.is_err());
    }
}
