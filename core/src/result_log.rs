use chrono::{DateTime, Local};
use std::fmt;
use tracing::{error, info};

const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Error,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Info => "info",
            MessageKind::Success => "success",
            MessageKind::Error => "error",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ResultMessage {
    pub kind: MessageKind,
    pub text: String,
    pub timestamp: DateTime<Local>,
}

impl ResultMessage {
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            timestamp: Local::now(),
        }
    }

    /// `2024/03/01 02:00:00 SUCCESS: Successfully uploaded ...`
    pub fn render(&self) -> String {
        format!(
            "{} {}: {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.kind.as_str().to_uppercase(),
            self.text
        )
    }
}

/// Everything notable that happened during one run, in order.
///
/// Each record is also echoed to the operational log as it happens, so the
/// console output and the summary mail read the same.
#[derive(Debug, Default, Clone)]
pub struct ResultLog {
    messages: Vec<ResultMessage>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: MessageKind, text: impl Into<String>) -> &ResultMessage {
        let message = ResultMessage::new(kind, text);
        match kind {
            MessageKind::Error => error!("{}", message.text),
            MessageKind::Info | MessageKind::Success => info!("{}", message.text),
        }
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.record(MessageKind::Info, text);
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.record(MessageKind::Success, text);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.record(MessageKind::Error, text);
    }

    pub fn all(&self) -> &[ResultMessage] {
        &self.messages
    }

    pub fn contains(&self, kind: MessageKind) -> bool {
        self.messages.iter().any(|m| m.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }
}
