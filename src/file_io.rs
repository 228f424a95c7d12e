//! File I/O utilities with atomic writes
//!
//! Provides file operations that leave either the old or the new contents in
//! place, never a partial file.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::BackupError;

/// Read JSON from a file, returning an error if the file doesn't exist
pub fn read_json_required<T, P>(path: P) -> Result<T, BackupError>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if !path.exists() {
        return Err(BackupError::Io(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let file = File::open(path)
        .map_err(|e| BackupError::Io(format!("Failed to open {}: {}", path.display(), e)))?;

    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .map_err(|e| BackupError::Json(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Read JSON from a file, returning `None` if the file doesn't exist
pub fn read_json_optional<T, P>(path: P) -> Result<Option<T>, BackupError>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }
    read_json_required(path).map(Some)
}

/// Write JSON to a file atomically (write to temp, then rename)
pub fn write_json_atomic<T, P>(path: P, data: &T) -> Result<(), BackupError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let json = serde_json::to_vec_pretty(data)
        .map_err(|e| BackupError::Json(format!("Failed to serialize data: {}", e)))?;
    write_atomic(path, &mut json.as_slice()).map(|_| ())
}

/// Stream `reader` into `path` atomically, returning the bytes written
///
/// Parent directories are created as needed. The temp file lives next to
/// the target so the final rename stays on one filesystem.
pub fn write_atomic<P, R>(path: P, reader: &mut R) -> Result<u64, BackupError>
where
    P: AsRef<Path>,
    R: Read + ?Sized,
{
    let path = path.as_ref();
    write_atomic_staged(path, temp_sibling(path), reader)
}

/// Stream `reader` into `staging`, then rename it to `path`
///
/// `staging` must be on the same filesystem as `path`. It is removed if
/// any step fails, but a crash can leave it behind.
pub fn write_atomic_staged<P, Q, R>(path: P, staging: Q, reader: &mut R) -> Result<u64, BackupError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    R: Read + ?Sized,
{
    let path = path.as_ref();
    let temp_path = staging.as_ref();

    for dir in [path.parent(), temp_path.parent()].into_iter().flatten() {
        fs::create_dir_all(dir).map_err(|e| {
            BackupError::Io(format!(
                "Failed to create directory {}: {}",
                dir.display(),
                e
            ))
        })?;
    }

    let file = File::create(temp_path)
        .map_err(|e| BackupError::Io(format!("Failed to create temp file: {}", e)))?;

    let mut writer = BufWriter::new(file);
    let written = io::copy(reader, &mut writer).map_err(|e| {
        let _ = fs::remove_file(temp_path);
        BackupError::Io(format!("Failed to write data: {}", e))
    })?;

    writer.flush().map_err(|e| {
        let _ = fs::remove_file(temp_path);
        BackupError::Io(format!("Failed to flush data: {}", e))
    })?;

    writer
        .get_ref()
        .sync_all()
        .map_err(|e| BackupError::Io(format!("Failed to sync data: {}", e)))?;

    fs::rename(temp_path, path).map_err(|e| {
        let _ = fs::remove_file(temp_path);
        BackupError::Io(format!("Failed to rename temp file: {}", e))
    })?;

    Ok(written)
}

/// Suffix of the temp file `write_atomic` writes next to its target
pub const TEMP_SUFFIX: &str = ".tmp";

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(TEMP_SUFFIX);
    path.with_file_name(name)
}

/// Remove a file, treating "already gone" as success
pub fn remove_if_exists<P: AsRef<Path>>(path: P) -> Result<(), BackupError> {
    match fs::remove_file(path.as_ref()) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BackupError::Io(format!(
            "Failed to remove {}: {}",
            path.as_ref().display(),
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::AccessPolicy;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_json_survives_a_rewrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("meta").join("bucket.json");

        let mut policies = BTreeMap::new();
        policies.insert("site-backups".to_string(), AccessPolicy::PublicRead);
        write_json_atomic(&path, &policies).unwrap();

        policies.insert("private-backups".to_string(), AccessPolicy::Private);
        write_json_atomic(&path, &policies).unwrap();

        let loaded: BTreeMap<String, AccessPolicy> = read_json_required(&path).unwrap();
        assert_eq!(loaded, policies);
        assert!(!temp_sibling(&path).exists());
    }

    #[test]
    fn test_missing_and_malformed_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let missing: Option<AccessPolicy> = read_json_optional(&path).unwrap();
        assert!(missing.is_none());
        assert!(matches!(
            read_json_required::<AccessPolicy, _>(&path),
            Err(BackupError::Io(_))
        ));

        fs::write(&path, b"{ not json").unwrap();
        assert!(matches!(
            read_json_optional::<AccessPolicy, _>(&path),
            Err(BackupError::Json(_))
        ));
    }

    #[test]
    fn test_stream_into_nested_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("www").join("20240101_0000_abc.zip");

        let mut payload: &[u8] = b"PK\x03\x04archive";
        let written = write_atomic(&path, &mut payload).unwrap();

        assert_eq!(written, 11);
        assert_eq!(fs::read(&path).unwrap(), b"PK\x03\x04archive");
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_staged_write_lands_at_target() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("www").join("a.zip");
        let staging = dir.path().join("staging").join("a.zip.part");

        let mut payload: &[u8] = b"archive";
        write_atomic_staged(&path, &staging, &mut payload).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"archive");
        assert!(!staging.exists());
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_remove_if_exists() {
        let dir = TempDir::new().unwrap();
        let blob = dir.path().join("bucket-backup-tmp.zip");

        remove_if_exists(&blob).unwrap();
        fs::write(&blob, b"stale").unwrap();
        remove_if_exists(&blob).unwrap();
        assert!(!blob.exists());
    }
}
