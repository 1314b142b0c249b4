use anyhow::{anyhow, Context, Result};
use clap::Args;
use minio_backup_core::{BackupSettings, SettingsBuilder, SettingsLayer};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CONFIG_FILE_NAME: &str = "minio-backup-config.json";

/// Every backup setting as a flag. Unset flags fall through to the config
/// file and then to the defaults.
#[derive(Args, Debug, Default)]
pub struct SettingsArgs {
    #[arg(long, env = "MINIO_BACKUP_ENDPOINT", help = "The object store endpoint (host:port or URL)")]
    endpoint: Option<String>,

    #[arg(long, env = "MINIO_BACKUP_ACCESS_KEY_ID", help = "The access key id")]
    access_key_id: Option<String>,

    #[arg(long, env = "MINIO_BACKUP_SECRET_ACCESS_KEY", hide_env_values = true, help = "The secret access key")]
    secret_access_key: Option<String>,

    #[arg(long, env = "MINIO_BACKUP_BUCKET_NAME", help = "The bucket name")]
    bucket_name: Option<String>,

    #[arg(long, env = "MINIO_BACKUP_SSL", value_name = "BOOL", num_args = 0..=1, default_missing_value = "true", help = "Whether to use SSL [default: true]")]
    ssl: Option<bool>,

    #[arg(long, env = "MINIO_BACKUP_LOCATION", help = "The bucket location [default: us-east-1]")]
    location: Option<String>,

    #[arg(long, env = "MINIO_BACKUP_MAX_BACKUPS", allow_negative_numbers = true, help = "Maximum number of backups to keep, 0 keeps all [default: 5]")]
    max_backups: Option<i64>,

    #[arg(long, env = "MINIO_BACKUP_BACKUP_PREFIX", help = "Backup name prefix [default: backup-]")]
    backup_prefix: Option<String>,

    #[arg(long, env = "MINIO_BACKUP_BACKUP_FOLDER", help = "The folder to back up")]
    backup_folder: Option<PathBuf>,

    #[arg(long, env = "MINIO_BACKUP_SMTP_HOSTNAME", help = "The SMTP relay hostname")]
    smtp_hostname: Option<String>,

    #[arg(long, env = "MINIO_BACKUP_SMTP_PORT", help = "The SMTP relay port [default: 25]")]
    smtp_port: Option<u16>,

    #[arg(long, env = "MINIO_BACKUP_SMTP_USERNAME", help = "The SMTP username")]
    smtp_username: Option<String>,

    #[arg(long, env = "MINIO_BACKUP_SMTP_PASSWORD", hide_env_values = true, help = "The SMTP password")]
    smtp_password: Option<String>,

    #[arg(long, env = "MINIO_BACKUP_SMTP_FROM_EMAIL", help = "The FROM address for notifications")]
    smtp_from_email: Option<String>,

    #[arg(long, env = "MINIO_BACKUP_SMTP_INSECURE_SKIP_VERIFY", value_name = "BOOL", num_args = 0..=1, default_missing_value = "true", help = "Accept any TLS certificate from the relay [default: true]")]
    smtp_insecure_skip_verify: Option<bool>,

    #[arg(long, env = "MINIO_BACKUP_NOTIFY_SUCCESS", value_name = "BOOL", num_args = 0..=1, default_missing_value = "true", help = "Mail when the run has success messages")]
    notify_success: Option<bool>,

    #[arg(long, env = "MINIO_BACKUP_NOTIFY_ERROR", value_name = "BOOL", num_args = 0..=1, default_missing_value = "true", help = "Mail when the run has error messages")]
    notify_error: Option<bool>,

    #[arg(long, env = "MINIO_BACKUP_NOTIFY_EMAIL", help = "Where to send notifications")]
    notify_email: Option<String>,
}

impl SettingsArgs {
    pub fn into_layer(self) -> SettingsLayer {
        SettingsLayer {
            endpoint: self.endpoint,
            access_key_id: self.access_key_id,
            secret_access_key: self.secret_access_key,
            bucket_name: self.bucket_name,
            ssl: self.ssl,
            location: self.location,
            max_backups: self.max_backups,
            backup_prefix: self.backup_prefix,
            backup_folder: self.backup_folder,
            smtp_hostname: self.smtp_hostname,
            smtp_port: self.smtp_port,
            smtp_username: self.smtp_username,
            smtp_password: self.smtp_password,
            smtp_from_email: self.smtp_from_email,
            smtp_insecure_skip_verify: self.smtp_insecure_skip_verify,
            notify_success: self.notify_success,
            notify_error: self.notify_error,
            notify_email: self.notify_email,
        }
    }
}

/// Where to look for a config file when none is given explicitly:
/// `~/.minio-backup-config.json`, then next to the executable.
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(dirs) = directories::BaseDirs::new() {
        paths.push(dirs.home_dir().join(format!(".{}", CONFIG_FILE_NAME)));
    }

    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        paths.push(exe_dir.join(CONFIG_FILE_NAME));
    }

    paths
}

/// Reads the config file layer. An explicit path must exist; otherwise the
/// first existing default path wins and having none is fine.
pub fn load_config_layer(explicit: Option<&Path>, defaults: &[PathBuf]) -> Result<Option<SettingsLayer>> {
    let path = match explicit {
        Some(path) => {
            if !path.is_file() {
                return Err(anyhow!("Config file not found: {}", path.display()));
            }
            path.to_path_buf()
        }
        None => match defaults.iter().find(|p| p.is_file()) {
            Some(path) => path.clone(),
            None => {
                debug!("No config file found, using flags and defaults");
                return Ok(None);
            }
        },
    };

    info!("Loading configuration from {}", path.display());
    let layer = SettingsLayer::from_json_file(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

    Ok(Some(layer))
}

/// defaults → config file → flags/environment.
pub fn resolve_settings(
    explicit_config: Option<&Path>,
    defaults: &[PathBuf],
    args: SettingsArgs,
) -> Result<BackupSettings> {
    let file_layer = load_config_layer(explicit_config, defaults)?;

    Ok(SettingsBuilder::new()
        .maybe_layer(file_layer)
        .layer(args.into_layer())
        .build())
}
