use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_LOCATION: &str = "us-east-1";
pub const DEFAULT_MAX_BACKUPS: i64 = 5;
pub const DEFAULT_BACKUP_PREFIX: &str = "backup-";
pub const DEFAULT_SMTP_PORT: u16 = 25;

/// Everything one backup run needs, resolved from defaults, the config file
/// and the command line. Built once by [`SettingsBuilder`] and never mutated.
#[derive(Clone, PartialEq, Eq)]
pub struct BackupSettings {
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    pub use_ssl: bool,
    pub location: String,
    pub max_backups: i64,
    pub backup_prefix: String,
    pub backup_folder: PathBuf,
    pub mail: MailSettings,
}

/// Mail relay and notification preferences.
///
/// Empty strings mean "unset"; the notifier skips sending when the relay
/// host, the sender or the recipient is missing.
#[derive(Clone, PartialEq, Eq)]
pub struct MailSettings {
    pub smtp_hostname: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub smtp_from_email: String,
    /// Accept any certificate from the relay. On by default to match how the
    /// tool has always talked to internal relays with self-signed certs.
    pub smtp_insecure_skip_verify: bool,
    pub notify_success: bool,
    pub notify_error: bool,
    pub notify_email: String,
}

impl MailSettings {
    pub fn is_configured(&self) -> bool {
        !self.smtp_hostname.trim().is_empty()
            && !self.smtp_from_email.trim().is_empty()
            && !self.notify_email.trim().is_empty()
    }
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            smtp_hostname: String::new(),
            smtp_port: DEFAULT_SMTP_PORT,
            smtp_username: String::new(),
            smtp_password: String::new(),
            smtp_from_email: String::new(),
            smtp_insecure_skip_verify: true,
            notify_success: false,
            notify_error: false,
            notify_email: String::new(),
        }
    }
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            bucket_name: String::new(),
            use_ssl: true,
            location: DEFAULT_LOCATION.to_string(),
            max_backups: DEFAULT_MAX_BACKUPS,
            backup_prefix: DEFAULT_BACKUP_PREFIX.to_string(),
            backup_folder: PathBuf::new(),
            mail: MailSettings::default(),
        }
    }
}

fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() { "" } else { "<redacted>" }
}

impl fmt::Debug for BackupSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackupSettings")
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &redacted(&self.secret_access_key))
            .field("bucket_name", &self.bucket_name)
            .field("use_ssl", &self.use_ssl)
            .field("location", &self.location)
            .field("max_backups", &self.max_backups)
            .field("backup_prefix", &self.backup_prefix)
            .field("backup_folder", &self.backup_folder)
            .field("mail", &self.mail)
            .finish()
    }
}

impl fmt::Debug for MailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailSettings")
            .field("smtp_hostname", &self.smtp_hostname)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &redacted(&self.smtp_password))
            .field("smtp_from_email", &self.smtp_from_email)
            .field("smtp_insecure_skip_verify", &self.smtp_insecure_skip_verify)
            .field("notify_success", &self.notify_success)
            .field("notify_error", &self.notify_error)
            .field("notify_email", &self.notify_email)
            .finish()
    }
}

/// One source of settings. Every field is optional so a layer only
/// overrides what it actually specifies.
///
/// The config file deserializes straight into this type; its keys are the
/// kebab-case flag names (`access-key-id`, `max-backups`, ...). Keys it does
/// not know are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SettingsLayer {
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub bucket_name: Option<String>,
    pub ssl: Option<bool>,
    pub location: Option<String>,
    pub max_backups: Option<i64>,
    pub backup_prefix: Option<String>,
    pub backup_folder: Option<PathBuf>,
    pub smtp_hostname: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from_email: Option<String>,
    pub smtp_insecure_skip_verify: Option<bool>,
    pub notify_success: Option<bool>,
    pub notify_error: Option<bool>,
    pub notify_email: Option<String>,
}

impl SettingsLayer {
    pub fn from_json_str(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config_error = |message: String| Error::Config {
            path: path.display().to_string(),
            message,
        };

        let contents = std::fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        Self::from_json_str(&contents).map_err(|e| config_error(e.to_string()))
    }
}

/// Folds layers over the built-in defaults, later layers winning.
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    settings: BackupSettings,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layer(mut self, layer: SettingsLayer) -> Self {
        let settings = &mut self.settings;
        let mail = &mut settings.mail;

        override_with(&mut settings.endpoint, layer.endpoint);
        override_with(&mut settings.access_key_id, layer.access_key_id);
        override_with(&mut settings.secret_access_key, layer.secret_access_key);
        override_with(&mut settings.bucket_name, layer.bucket_name);
        override_with(&mut settings.use_ssl, layer.ssl);
        override_with(&mut settings.location, layer.location);
        override_with(&mut settings.max_backups, layer.max_backups);
        override_with(&mut settings.backup_prefix, layer.backup_prefix);
        override_with(&mut settings.backup_folder, layer.backup_folder);

        override_with(&mut mail.smtp_hostname, layer.smtp_hostname);
        override_with(&mut mail.smtp_port, layer.smtp_port);
        override_with(&mut mail.smtp_username, layer.smtp_username);
        override_with(&mut mail.smtp_password, layer.smtp_password);
        override_with(&mut mail.smtp_from_email, layer.smtp_from_email);
        override_with(&mut mail.smtp_insecure_skip_verify, layer.smtp_insecure_skip_verify);
        override_with(&mut mail.notify_success, layer.notify_success);
        override_with(&mut mail.notify_error, layer.notify_error);
        override_with(&mut mail.notify_email, layer.notify_email);

        self
    }

    pub fn maybe_layer(self, layer: Option<SettingsLayer>) -> Self {
        match layer {
            Some(layer) => self.layer(layer),
            None => self,
        }
    }

    pub fn build(self) -> BackupSettings {
        self.settings
    }
}

fn override_with<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = SettingsBuilder::new().build();

        assert!(settings.use_ssl);
        assert_eq!(settings.location, "us-east-1");
        assert_eq!(settings.max_backups, 5);
        assert_eq!(settings.backup_prefix, "backup-");
        assert_eq!(settings.mail.smtp_port, 25);
        assert!(!settings.mail.notify_success);
        assert!(!settings.mail.notify_error);
        assert!(settings.mail.smtp_insecure_skip_verify);
    }

    #[test]
    fn test_later_layers_win() {
        let file = SettingsLayer::from_json_str(
            r#"{
                "endpoint": "minio.internal:9000",
                "bucket-name": "from-file",
                "max-backups": 10,
                "ssl": false
            }"#,
        )
        .unwrap();

        let flags = SettingsLayer {
            bucket_name: Some("from-flags".to_string()),
            max_backups: Some(0),
            ..Default::default()
        };

        let settings = SettingsBuilder::new().layer(file).layer(flags).build();

        assert_eq!(settings.endpoint, "minio.internal:9000");
        assert_eq!(settings.bucket_name, "from-flags");
        assert_eq!(settings.max_backups, 0);
        assert!(!settings.use_ssl);
        assert_eq!(settings.backup_prefix, "backup-");
    }

    #[test]
    fn test_missing_layer_keeps_defaults() {
        let settings = SettingsBuilder::new().maybe_layer(None).build();
        assert_eq!(settings, BackupSettings::default());
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let layer = SettingsLayer::from_json_str(r#"{"max-backup": 3, "bucket-name": "nightly"}"#).unwrap();
        assert_eq!(layer.bucket_name.as_deref(), Some("nightly"));
        assert_eq!(layer.max_backups, None);
    }

    #[test]
    fn test_config_file_error_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("minio-backup-config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = SettingsLayer::from_json_file(&path).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("minio-backup-config.json"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut settings = BackupSettings::default();
        settings.secret_access_key = "hunter2".to_string();
        settings.mail.smtp_password = "letmein".to_string();

        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("letmein"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_mail_configured_requires_host_sender_recipient() {
        let mut mail = MailSettings::default();
        assert!(!mail.is_configured());

        mail.smtp_hostname = "smtp.example.com".to_string();
        mail.smtp_from_email = "backup@example.com".to_string();
        assert!(!mail.is_configured());

        mail.notify_email = "ops@example.com".to_string();
        assert!(mail.is_configured());
    }
}
