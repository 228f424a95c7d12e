//! Path management for bucket-backup
//!
//! Resolves where the configuration file and the filesystem bucket store live.
//!
//! ## Path Resolution Order
//!
//! 1. `BUCKET_BACKUP_HOME` environment variable (if set)
//! 2. The platform config directory (`$XDG_CONFIG_HOME/bucket-backup`,
//!    `~/Library/Application Support/bucket-backup`, `%APPDATA%\bucket-backup`)

use std::path::PathBuf;

use directories::BaseDirs;

use crate::error::BackupError;

/// Environment variable overriding the base directory
pub const HOME_ENV: &str = "BUCKET_BACKUP_HOME";

/// Manages all paths used by bucket-backup
#[derive(Debug, Clone)]
pub struct BackupPaths {
    /// Base directory for all bucket-backup files
    base_dir: PathBuf,
}

impl BackupPaths {
    /// Create a new BackupPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn new() -> Result<Self, BackupError> {
        let base_dir = match std::env::var_os(HOME_ENV) {
            Some(custom) => PathBuf::from(custom),
            None => resolve_default_path()?,
        };

        Ok(Self { base_dir })
    }

    /// Create BackupPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the path to the config file
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Default root for filesystem-backed buckets
    pub fn storage_root(&self) -> PathBuf {
        self.base_dir.join("buckets")
    }

    /// Ensure the base directory exists
    pub fn ensure_directories(&self) -> Result<(), BackupError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| BackupError::Io(format!("Failed to create base directory: {}", e)))
    }
}

/// Resolve the default base directory for this platform
fn resolve_default_path() -> Result<PathBuf, BackupError> {
    let dirs = BaseDirs::new()
        .ok_or_else(|| BackupError::InvalidConfig("Could not determine home directory".into()))?;
    Ok(dirs.config_dir().join("bucket-backup"))
}

/// Fixed location of the temporary archive built during each cycle
pub fn default_temp_blob() -> PathBuf {
    std::env::temp_dir().join("bucket-backup-tmp.zip")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_custom_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = BackupPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.base_dir(), temp_dir.path());
        assert_eq!(paths.config_file(), temp_dir.path().join("config.json"));
        assert_eq!(paths.storage_root(), temp_dir.path().join("buckets"));
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let paths = BackupPaths::with_base_dir(temp_dir.path().join("nested").join("home"));

        paths.ensure_directories().unwrap();
        assert!(paths.base_dir().is_dir());
    }

    #[test]
    fn test_temp_blob_is_zip() {
        let path = default_temp_blob();
        assert_eq!(path.extension().unwrap(), "zip");
    }
}
