//! Directory archiving
//!
//! Packs a directory tree into a single zip file. Entries are written in
//! file-name order with their modification times, so an unchanged tree
//! produces a byte-identical archive and therefore the same fingerprint.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Datelike, Timelike, Utc};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{BackupError, BackupResult};

/// Produces one archive file from a directory
pub trait Archiver: Send + Sync {
    /// Archive the contents of `source_dir` into `dest`
    fn archive(&self, source_dir: &Path, dest: &Path) -> BackupResult<()>;
}

/// Zip archiver
#[derive(Debug, Clone, Copy)]
pub struct ZipArchiver {
    compression: CompressionMethod,
}

impl ZipArchiver {
    /// Deflate-compressed archives
    pub fn new() -> Self {
        Self {
            compression: CompressionMethod::Deflated,
        }
    }

    /// Uncompressed archives
    pub fn stored() -> Self {
        Self {
            compression: CompressionMethod::Stored,
        }
    }

    fn options_for(&self, modified: Option<std::time::SystemTime>) -> SimpleFileOptions {
        let timestamp = modified
            .map(|t| zip_timestamp(DateTime::<Utc>::from(t)))
            .unwrap_or_default();

        SimpleFileOptions::default()
            .compression_method(self.compression)
            .last_modified_time(timestamp)
    }
}

impl Default for ZipArchiver {
    fn default() -> Self {
        Self::new()
    }
}

impl Archiver for ZipArchiver {
    fn archive(&self, source_dir: &Path, dest: &Path) -> BackupResult<()> {
        if !source_dir.is_dir() {
            return Err(BackupError::Archive(format!(
                "'{}' is not a directory",
                source_dir.display()
            )));
        }

        let file = File::create(dest).map_err(|e| {
            BackupError::Archive(format!("Failed to create {}: {}", dest.display(), e))
        })?;
        let mut zip = ZipWriter::new(BufWriter::new(file));
        let dest_identity = fs::canonicalize(dest).ok();

        for entry in WalkDir::new(source_dir).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| BackupError::Archive(format!("walkdir error: {}", e)))?;
            let path = entry.path();

            // The archive may be built inside the tree it archives
            if is_same_file(path, dest, dest_identity.as_deref()) {
                continue;
            }

            let name = entry_name(source_dir, path)?;
            let modified = entry.metadata().ok().and_then(|m| m.modified().ok());
            let options = self.options_for(modified);

            if entry.file_type().is_dir() {
                zip.add_directory(name, options)
                    .map_err(|e| BackupError::Archive(format!("{}: {}", path.display(), e)))?;
            } else if entry.file_type().is_file() {
                zip.start_file(name, options)
                    .map_err(|e| BackupError::Archive(format!("{}: {}", path.display(), e)))?;
                let mut source = File::open(path).map_err(|e| {
                    BackupError::Archive(format!("Failed to open {}: {}", path.display(), e))
                })?;
                io::copy(&mut source, &mut zip).map_err(|e| {
                    BackupError::Archive(format!("Failed to read {}: {}", path.display(), e))
                })?;
            } else {
                tracing::debug!(path = %path.display(), "skipping non-regular file");
            }
        }

        let mut writer = zip
            .finish()
            .map_err(|e| BackupError::Archive(format!("Failed to finish archive: {}", e)))?;
        writer
            .flush()
            .map_err(|e| BackupError::Archive(format!("Failed to flush archive: {}", e)))?;

        Ok(())
    }
}

/// True if `path` names `dest`, however either was spelled
fn is_same_file(path: &Path, dest: &Path, dest_identity: Option<&Path>) -> bool {
    if path == dest {
        return true;
    }
    if path.file_name() != dest.file_name() {
        return false;
    }
    match (dest_identity, fs::canonicalize(path)) {
        (Some(dest), Ok(path)) => path == dest,
        _ => false,
    }
}

/// Archive entry name: path relative to the root, `/`-separated
fn entry_name(root: &Path, path: &Path) -> BackupResult<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|e| BackupError::Archive(e.to_string()))?;
    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

/// Zip timestamps only cover 1980-2107; anything else falls back to the
/// format's default
fn zip_timestamp(time: DateTime<Utc>) -> zip::DateTime {
    let year = match u16::try_from(time.year()) {
        Ok(year) => year,
        Err(_) => return zip::DateTime::default(),
    };

    zip::DateTime::from_date_and_time(
        year,
        time.month() as u8,
        time.day() as u8,
        time.hour() as u8,
        time.minute() as u8,
        time.second() as u8,
    )
    .unwrap_or_default()
}
