pub mod backend;
pub mod connector;
pub mod local;
pub mod minio;
pub mod retry;

pub use backend::{Backend, BackendType, Connector, ObjectInfo};
pub use connector::DefaultConnector;
pub use local::LocalBackend;
pub use minio::{MinIOBackend, MinIOConfig};
pub use retry::{RetryConfig, retry_with_backoff, Retryable};
