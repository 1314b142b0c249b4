use crate::mailer::{Mailer, Notification};
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use minio_backup_core::{Error, MailSettings, Result};
use tracing::debug;

/// Port where the relay expects TLS from the first byte instead of STARTTLS.
const SMTPS_PORT: u16 = 465;

/// Sends notifications through the configured SMTP relay.
///
/// Uses implicit TLS on port 465 and STARTTLS when offered on any other
/// port. Certificate and hostname checks are skipped while
/// `smtp_insecure_skip_verify` is set, which is the default.
pub struct SmtpMailer {
    settings: MailSettings,
}

impl SmtpMailer {
    pub fn new(settings: MailSettings) -> Self {
        Self { settings }
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let host = self.settings.smtp_hostname.as_str();
        let insecure = self.settings.smtp_insecure_skip_verify;

        let tls_parameters = TlsParameters::builder(host.to_string())
            .dangerous_accept_invalid_certs(insecure)
            .dangerous_accept_invalid_hostnames(insecure)
            .build()
            .map_err(|e| Error::Notify(format!("Invalid TLS setup for {}: {}", host, e)))?;

        let tls = if self.settings.smtp_port == SMTPS_PORT {
            Tls::Wrapper(tls_parameters)
        } else {
            Tls::Opportunistic(tls_parameters)
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(self.settings.smtp_port)
            .tls(tls);

        if !self.settings.smtp_username.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.settings.smtp_username.clone(),
                self.settings.smtp_password.clone(),
            ));
        }

        Ok(builder.build())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address
        .trim()
        .parse()
        .map_err(|e| Error::Notify(format!("Invalid address {}: {}", address, e)))
}

pub(crate) fn build_message(notification: &Notification) -> Result<Message> {
    let mut builder = Message::builder()
        .from(parse_mailbox(&notification.from)?)
        .subject(notification.subject.clone())
        .header(ContentType::TEXT_HTML);

    for recipient in notification.to.split(',').filter(|r| !r.trim().is_empty()) {
        builder = builder.to(parse_mailbox(recipient)?);
    }

    builder
        .body(notification.html_body.clone())
        .map_err(|e| Error::Notify(format!("Failed to build message: {}", e)))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, notification: &Notification) -> Result<()> {
        let message = build_message(notification)?;
        let transport = self.transport()?;

        debug!(
            host = %self.settings.smtp_hostname,
            port = self.settings.smtp_port,
            to = %notification.to,
            "Sending notification"
        );

        transport.send(message).await.map_err(|e| {
            Error::Notify(format!(
                "Failed to send mail via {}:{}: {}",
                self.settings.smtp_hostname, self.settings.smtp_port, e
            ))
        })?;

        Ok(())
    }
}
