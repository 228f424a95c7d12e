//! bucket-backup - Unattended deduplicated backups to object storage
//!
//! This library periodically archives a local directory, fingerprints the
//! archive and uploads it to a bucket unless one of the most recent backups
//! already holds the same content. Errors and notices raised along the way
//! are kept in a bounded, thread-safe event log for later status display.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `events`: Ring-buffered error and notice log
//! - `storage`: Object store abstraction and its backends
//! - `backup`: Archive, dedup and upload cycle plus the scheduler
//! - `cli`: Command handlers for the binary
//! - `logging`: `tracing` subscriber setup
//!
//! # Example
//!
//! ```rust,ignore
//! use bucket_backup::config::{BackupConfig, BackupPaths};
//!
//! let paths = BackupPaths::new()?;
//! let config = BackupConfig::load(&paths.config_file())?;
//! ```

pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod file_io;
pub mod logging;
pub mod storage;

pub use error::{BackupError, BackupResult};
