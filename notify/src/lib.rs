pub mod mailer;
pub mod notifier;
pub mod smtp;

pub use mailer::{Mailer, Notification};
pub use notifier::{render_body, Notifier};
pub use smtp::SmtpMailer;
