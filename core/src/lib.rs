pub mod archive;
pub mod error;
pub mod result_log;
pub mod retention;
pub mod settings;

pub use archive::{archive_name, Archiver, ZipArchiver};
pub use error::{Error, Result};
pub use result_log::{MessageKind, ResultLog, ResultMessage};
pub use retention::{select_for_deletion, RetentionPolicy};
pub use settings::{BackupSettings, MailSettings, SettingsBuilder, SettingsLayer};
