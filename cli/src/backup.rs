use chrono::{DateTime, Local};
use futures::StreamExt;
use minio_backup_backends::{Backend, Connector, ObjectInfo};
use minio_backup_core::{
    archive_name, Archiver, BackupSettings, Error, Result, ResultLog, RetentionPolicy,
};
use minio_backup_notify::Notifier;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Failure,
}

impl RunOutcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            RunOutcome::Success => ExitCode::SUCCESS,
            RunOutcome::Failure => ExitCode::FAILURE,
        }
    }
}

/// How a run ended, plus everything it recorded on the way.
#[derive(Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub log: ResultLog,
}

/// Runs one backup: validate, ensure the bucket, prune old archives,
/// archive the folder, upload it, remove the local copy, notify.
///
/// Steps run strictly in that order. Listing and delete failures are
/// recorded and skipped; any other failure ends the run, after a
/// notification attempt unless it happened during validation.
pub struct BackupOrchestrator {
    connector: Box<dyn Connector>,
    archiver: Box<dyn Archiver>,
    notifier: Notifier,
    work_dir: PathBuf,
    clock: Box<dyn Fn() -> DateTime<Local> + Send + Sync>,
}

impl BackupOrchestrator {
    pub fn new(connector: Box<dyn Connector>, archiver: Box<dyn Archiver>, notifier: Notifier) -> Self {
        Self {
            connector,
            archiver,
            notifier,
            work_dir: std::env::temp_dir(),
            clock: Box::new(Local::now),
        }
    }

    /// Directory the temporary archive is written to.
    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Local> + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub async fn run(&self, settings: &BackupSettings) -> RunReport {
        let mut log = ResultLog::new();

        if validate(settings, &mut log).await.is_err() {
            return RunReport {
                outcome: RunOutcome::Failure,
                log,
            };
        }

        log.info(format!("Starting backup for {}", settings.backup_folder.display()));

        let outcome = match self.execute(settings, &mut log).await {
            Ok(()) => RunOutcome::Success,
            Err(e) => {
                log.error(e.to_string());
                RunOutcome::Failure
            }
        };

        self.notifier.maybe_send(&log).await;

        RunReport { outcome, log }
    }

    async fn execute(&self, settings: &BackupSettings, log: &mut ResultLog) -> Result<()> {
        let backend = self.connector.connect(settings).await?;
        debug!(backend = ?backend.backend_type(), bucket = backend.bucket(), "Connected to store");

        ensure_bucket(backend.as_ref(), &settings.location, log).await?;

        let objects = list_backups(backend.as_ref(), &settings.backup_prefix, log).await;
        prune(backend.as_ref(), &objects, RetentionPolicy::new(settings.max_backups), log).await;

        let name = archive_name(&settings.backup_prefix, (self.clock)(), self.archiver.extension());
        let archive_path = self.work_dir.join(&name);

        log.info(format!(
            "Creating: {} which will contain the contents of: {}",
            archive_path.display(),
            settings.backup_folder.display()
        ));
        self.archiver
            .compress(&archive_path, std::slice::from_ref(&settings.backup_folder))?;

        let written = backend
            .put_file(&name, &archive_path, self.archiver.content_type())
            .await?;
        log.success(format!("Successfully uploaded {} of size {}", name, written));

        // Still fatal although the archive is safely stored by now.
        tokio::fs::remove_file(&archive_path).await?;
        log.success(format!("Successfully removed {} from local storage", name));

        Ok(())
    }
}

async fn validate(settings: &BackupSettings, log: &mut ResultLog) -> Result<()> {
    let required = [
        ("an endpoint", "endpoint", settings.endpoint.as_str()),
        ("an access-key-id", "access-key-id", settings.access_key_id.as_str()),
        ("a secret-access-key", "secret-access-key", settings.secret_access_key.as_str()),
        ("a bucket-name", "bucket-name", settings.bucket_name.as_str()),
    ];

    for (what, flag, value) in required {
        if value.trim().is_empty() {
            let message = format!("Please specify {}: --{}=...", what, flag);
            log.info(message.clone());
            return Err(Error::Validation(message));
        }
    }

    let folder = &settings.backup_folder;
    if folder.as_os_str().is_empty() || folder.to_string_lossy().trim().is_empty() {
        let message = "Please specify a backup-folder: --backup-folder=...".to_string();
        log.info(message.clone());
        return Err(Error::Validation(message));
    }

    if let Err(e) = tokio::fs::metadata(folder).await {
        let message = if e.kind() == std::io::ErrorKind::NotFound {
            format!("The folder {} does not exist!", folder.display())
        } else {
            format!("The folder {} is not readable: {}", folder.display(), e)
        };
        log.error(message.clone());
        return Err(Error::Validation(message));
    }

    Ok(())
}

/// Creating a bucket we already own fails on most stores, so a failed
/// create is only fatal when the bucket is not there afterwards.
async fn ensure_bucket(backend: &dyn Backend, region: &str, log: &mut ResultLog) -> Result<()> {
    if let Err(create_error) = backend.make_bucket(region).await {
        debug!("Bucket creation failed: {}", create_error);
        match backend.bucket_exists().await {
            Ok(true) => log.info(format!("We already own {}", backend.bucket())),
            Ok(false) => return Err(create_error),
            Err(e) => return Err(e),
        }
    }

    log.info(format!("Using bucket: {}", backend.bucket()));
    Ok(())
}

/// Drains the whole listing before anything is deleted.
async fn list_backups(backend: &dyn Backend, prefix: &str, log: &mut ResultLog) -> Vec<ObjectInfo> {
    let mut objects = Vec::new();
    let mut listing = backend.list(prefix);

    while let Some(item) = listing.next().await {
        match item {
            Ok(object) => objects.push(object),
            Err(e) => log.error(e.to_string()),
        }
    }

    debug!(count = objects.len(), prefix, "Listed existing backups");
    objects
}

async fn prune(backend: &dyn Backend, objects: &[ObjectInfo], policy: RetentionPolicy, log: &mut ResultLog) {
    if !policy.is_enabled() {
        debug!(count = objects.len(), "Retention disabled, keeping every backup");
        return;
    }

    for object in policy.select_for_deletion(objects) {
        match backend.delete(&object.key).await {
            Ok(()) => log.success(format!("Successfully removed remote object: {}", object.key)),
            Err(e) => log.error(e.to_string()),
        }
    }
}
