//! Custom error types for bucket-backup
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

/// The main error type for bucket-backup operations
#[derive(Error, Debug)]
pub enum BackupError {
    /// Configuration errors; fatal when raised during startup validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The directory could not be archived
    #[error("Archive error: {0}")]
    Archive(String),

    /// The archive could not be fingerprinted
    #[error("Hash error: {0}")]
    Hash(String),

    /// Object storage listing or bucket errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Transfer of a blob to the bucket failed
    #[error("Upload error: {0}")]
    Upload(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),
}

impl BackupError {
    /// Check if this error should stop the process rather than a single cycle
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidConfig(_))
    }

    /// Short name of the failing stage, used in cycle outcomes
    pub fn stage(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "config",
            Self::Archive(_) => "archive",
            Self::Hash(_) => "fingerprint",
            Self::Storage(_) => "storage",
            Self::Upload(_) => "upload",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }
}

impl From<std::io::Error> for BackupError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BackupError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for bucket-backup operations
pub type BackupResult<T> = Result<T, BackupError>;
