use async_trait::async_trait;
use minio_backup_core::Result;

/// A composed summary mail, ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub from: String,
    /// One address, or several separated by commas.
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<()>;
}
