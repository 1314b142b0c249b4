use crate::{Error, Result};
use chrono::{DateTime, Local};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Timestamp layout embedded in archive names. Lexical order of the
/// formatted string is chronological order.
pub const ARCHIVE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d.%H-%M-%S";

/// `<prefix><YYYY-MM-DD.HH-MM-SS>.<extension>`
pub fn archive_name(prefix: &str, time: DateTime<Local>, extension: &str) -> String {
    format!("{}{}.{}", prefix, time.format(ARCHIVE_TIMESTAMP_FORMAT), extension)
}

/// Turns a set of local paths into a single archive file.
pub trait Archiver: Send + Sync {
    fn extension(&self) -> &str;

    fn content_type(&self) -> &str;

    /// Writes the archive to `output`, replacing any existing file.
    fn compress(&self, output: &Path, sources: &[PathBuf]) -> Result<()>;
}

/// Zip (deflate) encoder. Files of 4 GiB and more are written as zip64
/// entries.
#[derive(Debug, Clone, Default)]
pub struct ZipArchiver;

impl ZipArchiver {
    pub fn new() -> Self {
        Self
    }

    fn add_source<W: io::Write + io::Seek>(
        &self,
        writer: &mut ZipWriter<W>,
        source: &Path,
    ) -> Result<()> {
        // Entries are named relative to the source's parent so a directory
        // lands in the archive under its own name.
        let base = source.parent().unwrap_or_else(|| Path::new(""));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in WalkDir::new(source).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::Archive(format!("Failed to walk {}: {}", source.display(), e)))?;
            let path = entry.path();
            let name = entry_name(path.strip_prefix(base).unwrap_or(path));
            if name.is_empty() {
                continue;
            }

            let file_type = entry.file_type();
            if file_type.is_dir() {
                writer
                    .add_directory(format!("{}/", name), options)
                    .map_err(|e| Error::Archive(format!("Failed to add {}: {}", name, e)))?;
            } else if file_type.is_file() {
                let len = entry.metadata().map_err(|e| Error::Archive(format!("Failed to stat {}: {}", name, e)))?.len();
                debug!(size = len, "Adding {} to archive", name);
                writer
                    .start_file(name.as_str(), file_options(options, len))
                    .map_err(|e| Error::Archive(format!("Failed to add {}: {}", name, e)))?;
                let mut file = File::open(path)?;
                io::copy(&mut file, writer)?;
            } else {
                debug!("Skipping {} (not a regular file)", path.display());
            }
        }

        Ok(())
    }
}

impl Archiver for ZipArchiver {
    fn extension(&self) -> &str {
        "zip"
    }

    fn content_type(&self) -> &str {
        "application/zip"
    }

    fn compress(&self, output: &Path, sources: &[PathBuf]) -> Result<()> {
        let file = File::create(output)?;
        let mut writer = ZipWriter::new(BufWriter::new(file));

        for source in sources {
            if !source.exists() {
                return Err(Error::Archive(format!("{} does not exist", source.display())));
            }
            self.add_source(&mut writer, source)?;
        }

        let mut inner = writer
            .finish()
            .map_err(|e| Error::Archive(format!("Failed to finish {}: {}", output.display(), e)))?;
        io::Write::flush(&mut inner)?;

        Ok(())
    }
}

fn file_options(options: SimpleFileOptions, len: u64) -> SimpleFileOptions {
    options.large_file(len >= u64::from(u32::MAX))
}

fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
