//! Backup configuration for bucket-backup
//!
//! Holds the bucket target, the directory to back up, and the operational
//! knobs of the backup loop. Loaded from a JSON file with defaults for every
//! optional field.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::paths::{default_temp_blob, BackupPaths};
use crate::error::{BackupError, BackupResult};
use crate::events::{DEFAULT_ERROR_CAPACITY, DEFAULT_NOTICE_CAPACITY};
use crate::file_io;

/// Delimiter separating "directories" in bucket keys
pub const BUCKET_DELIMITER: &str = "/";

/// Time between two backup cycles (4 hours)
pub const DEFAULT_INTERVAL_SECS: u64 = 4 * 60 * 60;

/// Number of recent remote objects sampled by the dedup check
pub const DEFAULT_HISTORY_SAMPLE: usize = 10;

/// Storage backend credentials
///
/// Carried through for network-backed object stores. The filesystem store
/// has no use for them. Zeroed on drop; the secret never appears in `Debug`
/// output.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// True if neither key is set
    pub fn is_empty(&self) -> bool {
        self.access_key.is_empty() && self.secret_key.is_empty()
    }

    /// Secret with everything but the last two characters masked
    pub fn redacted_secret(&self) -> String {
        let count = self.secret_key.chars().count();
        if count <= 2 {
            return "*".repeat(count);
        }
        let tail: String = self.secret_key.chars().skip(count - 2).collect();
        format!("{}{}", "*".repeat(count - 2), tail)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

/// Everything the backup loop needs to know
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Backend credentials
    #[serde(default)]
    pub credentials: Credentials,

    /// Name of the target bucket
    pub bucket: String,

    /// Key prefix under which backups are stored
    #[serde(default)]
    pub remote_prefix: String,

    /// Directory to back up
    pub local_directory: PathBuf,

    /// Root directory of the filesystem bucket store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_root: Option<PathBuf>,

    /// Fixed path of the temporary archive
    #[serde(default = "default_temp_blob")]
    pub temp_blob: PathBuf,

    /// Seconds between cycles
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// How many recent remote objects the dedup check looks at
    #[serde(default = "default_history_sample")]
    pub history_sample: usize,

    /// Upload backups with a public-read policy
    #[serde(default = "default_make_public")]
    pub make_public: bool,

    /// Errors kept in the event log
    #[serde(default = "default_error_capacity")]
    pub error_capacity: usize,

    /// Notices kept in the event log
    #[serde(default = "default_notice_capacity")]
    pub notice_capacity: usize,
}

fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL_SECS
}

fn default_history_sample() -> usize {
    DEFAULT_HISTORY_SAMPLE
}

fn default_make_public() -> bool {
    true
}

fn default_error_capacity() -> usize {
    DEFAULT_ERROR_CAPACITY
}

fn default_notice_capacity() -> usize {
    DEFAULT_NOTICE_CAPACITY
}

impl BackupConfig {
    /// Create a configuration with defaults for every optional field
    pub fn new(bucket: impl Into<String>, local_directory: impl Into<PathBuf>) -> Self {
        Self {
            credentials: Credentials::default(),
            bucket: bucket.into(),
            remote_prefix: String::new(),
            local_directory: local_directory.into(),
            storage_root: None,
            temp_blob: default_temp_blob(),
            interval_secs: default_interval_secs(),
            history_sample: default_history_sample(),
            make_public: default_make_public(),
            error_capacity: default_error_capacity(),
            notice_capacity: default_notice_capacity(),
        }
    }

    /// Set the remote prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.remote_prefix = prefix.into();
        self
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> BackupResult<Self> {
        file_io::read_json_required(path)
            .map_err(|e| BackupError::InvalidConfig(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> BackupResult<()> {
        file_io::write_json_atomic(path, self)
    }

    /// Normalize the remote prefix and check field ranges
    ///
    /// Does not touch the filesystem or the bucket; see
    /// `backup::validate` for that.
    pub fn normalized(mut self) -> BackupResult<Self> {
        if self.bucket.trim().is_empty() {
            return Err(BackupError::InvalidConfig("bucket name is empty".into()));
        }
        if self.interval_secs == 0 {
            return Err(BackupError::InvalidConfig(
                "interval_secs must be positive".into(),
            ));
        }
        if self.history_sample == 0 {
            return Err(BackupError::InvalidConfig(
                "history_sample must be at least 1".into(),
            ));
        }
        if self.error_capacity == 0 || self.notice_capacity == 0 {
            return Err(BackupError::InvalidConfig(
                "event log capacities must be at least 1".into(),
            ));
        }

        self.remote_prefix = normalize_prefix(&self.remote_prefix, BUCKET_DELIMITER);
        Ok(self)
    }

    /// Time to wait between cycles
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Root of the filesystem bucket store, falling back to the default location
    pub fn storage_root_or(&self, paths: &BackupPaths) -> PathBuf {
        self.storage_root
            .clone()
            .unwrap_or_else(|| paths.storage_root())
    }
}

/// Strip a leading `/` and make sure a non-empty prefix ends with `delim`
pub fn normalize_prefix(prefix: &str, delim: &str) -> String {
    let trimmed = prefix.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.ends_with(delim) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, delim)
    }
}
