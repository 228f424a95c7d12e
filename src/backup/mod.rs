//! Periodic deduplicated backups
//!
//! Provides unattended backups of a local directory to a bucket, skipping
//! uploads whose content already sits among the most recent backups.
//!
//! # Architecture
//!
//! - `BackupScheduler`: validates the target once, then runs cycles forever
//! - `BackupCycle`: one archive, fingerprint, dedup check and upload pass
//! - `Archiver` / `Fingerprinter`: pluggable archive and hash steps
//! - `RemoteHistoryProbe`: samples recent keys for the dedup check
//! - `BackupUploader`: pushes the archive with content type and access policy
//!
//! # Key Format
//!
//! Backups land at `<prefix><YYYYMMDD_HHMM_><fingerprint>.zip`. The
//! fingerprint is embedded in the key, so the dedup check needs nothing more
//! than a listing.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use bucket_backup::backup::BackupScheduler;
//! use bucket_backup::config::BackupConfig;
//! use bucket_backup::events::EventLog;
//! use bucket_backup::storage::LocalObjectStore;
//!
//! let config = BackupConfig::new("site-backups", "/srv/www").with_prefix("www");
//! let store = Arc::new(LocalObjectStore::new("/var/lib/buckets", &config.bucket)?);
//! let events = EventLog::new(32, 128)?;
//!
//! let handle = BackupScheduler::new(config, store, events.clone()).spawn()?;
//! ```

mod archive;
mod cycle;
mod fingerprint;
mod probe;
mod scheduler;
mod upload;

pub use archive::{Archiver, ZipArchiver};
pub use cycle::{remote_key, BackupCycle, CycleOutcome, BACKUP_EXTENSION, TIME_PREFIX_FORMAT};
pub use fingerprint::{Fingerprinter, Sha256Fingerprinter};
pub use probe::{contains_fingerprint, RemoteHistoryProbe};
pub use scheduler::{validate, BackupScheduler};
pub use upload::{content_type_for, BackupUploader};
