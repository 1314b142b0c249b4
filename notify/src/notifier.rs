use crate::mailer::{Mailer, Notification};
use minio_backup_core::{MailSettings, MessageKind, ResultLog};
use tracing::{debug, warn};

const LINE_BREAK: &str = "<br />";

/// Decides whether a run's log is worth a mail and sends it.
///
/// Sending is best effort: a relay failure is logged and otherwise ignored,
/// it never changes how the run ends.
pub struct Notifier {
    settings: MailSettings,
    mailer: Box<dyn Mailer>,
    hostname: String,
}

impl Notifier {
    pub fn new(settings: MailSettings, mailer: Box<dyn Mailer>) -> Self {
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        Self {
            settings,
            mailer,
            hostname,
        }
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    fn wants(&self, log: &ResultLog) -> bool {
        (self.settings.notify_success && log.contains(MessageKind::Success))
            || (self.settings.notify_error && log.contains(MessageKind::Error))
    }

    /// The mail this log would produce, or `None` when nothing should be sent.
    pub fn compose(&self, log: &ResultLog) -> Option<Notification> {
        if !self.settings.is_configured() || log.is_empty() || !self.wants(log) {
            return None;
        }

        Some(Notification {
            from: self.settings.smtp_from_email.clone(),
            to: self.settings.notify_email.clone(),
            subject: format!("[{}]: Backup status", self.hostname),
            html_body: render_body(log),
        })
    }

    /// Returns whether a mail went out.
    pub async fn maybe_send(&self, log: &ResultLog) -> bool {
        let Some(notification) = self.compose(log) else {
            debug!("No notification to send");
            return false;
        };

        match self.mailer.send(&notification).await {
            Ok(()) => {
                debug!(to = %notification.to, "Notification sent");
                true
            }
            Err(e) => {
                warn!("Failed to send notification: {}", e);
                false
            }
        }
    }
}

/// One rendered line per message, in log order.
pub fn render_body(log: &ResultLog) -> String {
    log.all()
        .iter()
        .map(|m| m.render())
        .collect::<Vec<_>>()
        .join(LINE_BREAK)
}
