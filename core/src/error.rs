use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Validation(String),

    #[error("Configuration error in {path}: {message}")]
    Config { path: String, message: String },

    #[error("Store error: {0}")]
    Store(String),

    /// A store failure worth retrying: timeouts, throttling, 5xx.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Notification error: {0}")]
    Notify(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
