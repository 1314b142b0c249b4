mod backup;
mod config;

use backup::BackupOrchestrator;
use clap::Parser;
use config::{default_config_paths, resolve_settings, SettingsArgs};
use minio_backup_backends::DefaultConnector;
use minio_backup_core::ZipArchiver;
use minio_backup_notify::{Notifier, SmtpMailer};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(
    name = "minio-backup",
    version,
    about = "Zip a folder and upload it to an S3-compatible store",
    long_about = "Archives a local folder, uploads it to a MinIO or other S3-compatible bucket, \
                  keeps only the newest backups and optionally mails a summary of the run"
)]
struct Cli {
    #[arg(long, env = "MINIO_BACKUP_CONFIG", help = "Path to a JSON config file")]
    config: Option<PathBuf>,

    #[command(flatten)]
    settings: SettingsArgs,

    #[arg(short, long, help = "Enable verbose output")]
    verbose: bool,

    #[arg(short, long, help = "Enable quiet mode")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    let settings = match resolve_settings(cli.config.as_deref(), &default_config_paths(), cli.settings) {
        Ok(settings) => settings,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };
    debug!(?settings, "Resolved settings");

    let notifier = Notifier::new(
        settings.mail.clone(),
        Box::new(SmtpMailer::new(settings.mail.clone())),
    );
    let orchestrator = BackupOrchestrator::new(
        Box::new(DefaultConnector),
        Box::new(ZipArchiver::new()),
        notifier,
    );

    let report = orchestrator.run(&settings).await;
    info!(outcome = ?report.outcome, messages = report.log.len(), "Backup run finished");

    report.outcome.exit_code()
}

const CRATE_TARGETS: [&str; 4] = [
    "minio_backup",
    "minio_backup_core",
    "minio_backup_backends",
    "minio_backup_notify",
];

fn init_tracing(verbose: bool, quiet: bool) {
    let level = if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives: Vec<String> = CRATE_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, level))
            .collect();
        EnvFilter::new(format!("warn,{}", directives.join(",")))
    });

    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install log subscriber: {}", e);
    }
}
