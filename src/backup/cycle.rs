//! One backup pass: archive, fingerprint, dedup check, upload, clean up

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::archive::{Archiver, ZipArchiver};
use super::fingerprint::{Fingerprinter, Sha256Fingerprinter};
use super::probe::RemoteHistoryProbe;
use super::upload::BackupUploader;
use crate::config::BackupConfig;
use crate::error::BackupResult;
use crate::events::EventLog;
use crate::file_io;
use crate::storage::ObjectStore;

/// Fixed-width, lexically sortable time prefix of remote keys
pub const TIME_PREFIX_FORMAT: &str = "%Y%m%d_%H%M_";

/// Extension of uploaded archives
pub const BACKUP_EXTENSION: &str = ".zip";

/// What a cycle ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// New content was uploaded to `key`
    Uploaded { key: String, fingerprint: String },
    /// A recent backup already has this content
    Skipped { fingerprint: String },
    /// The cycle stopped at `stage`
    Failed { stage: &'static str, reason: String },
}

impl CycleOutcome {
    pub fn is_uploaded(&self) -> bool {
        matches!(self, Self::Uploaded { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Removes the temp archive when dropped, whichever way the cycle exits
struct TempBlob {
    path: PathBuf,
}

impl TempBlob {
    /// Claim `path`, removing a leftover file from an earlier run
    fn claim(path: &Path) -> BackupResult<Self> {
        file_io::remove_if_exists(path)?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempBlob {
    fn drop(&mut self) {
        if let Err(e) = file_io::remove_if_exists(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove temp archive");
        }
    }
}

/// Remote key for a backup: `prefix + time + fingerprint + ".zip"`
pub fn remote_key(prefix: &str, now: DateTime<Utc>, fingerprint: &str) -> String {
    format!(
        "{}{}{}{}",
        prefix,
        now.format(TIME_PREFIX_FORMAT),
        fingerprint,
        BACKUP_EXTENSION
    )
}

/// Runs single backup passes against one configuration
pub struct BackupCycle {
    config: BackupConfig,
    archiver: Arc<dyn Archiver>,
    fingerprinter: Arc<dyn Fingerprinter>,
    probe: RemoteHistoryProbe,
    uploader: BackupUploader,
    events: EventLog,
}

impl BackupCycle {
    /// Cycle using zip archives and SHA-256 fingerprints
    pub fn new(config: BackupConfig, store: Arc<dyn ObjectStore>, events: EventLog) -> Self {
        Self::with_collaborators(
            config,
            Arc::new(ZipArchiver::new()),
            Arc::new(Sha256Fingerprinter),
            store,
            events,
        )
    }

    /// Cycle with explicit archiver and fingerprinter
    pub fn with_collaborators(
        config: BackupConfig,
        archiver: Arc<dyn Archiver>,
        fingerprinter: Arc<dyn Fingerprinter>,
        store: Arc<dyn ObjectStore>,
        events: EventLog,
    ) -> Self {
        let probe = RemoteHistoryProbe::new(
            Arc::clone(&store),
            config.remote_prefix.clone(),
            events.clone(),
        );
        let uploader = BackupUploader::new(store);

        Self {
            config,
            archiver,
            fingerprinter,
            probe,
            uploader,
            events,
        }
    }

    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// Run one pass
    ///
    /// Failures are recorded on the error channel and reported in the
    /// outcome; nothing is retried until the next pass.
    pub fn run_once(&self) -> CycleOutcome {
        match self.try_run() {
            Ok(outcome) => outcome,
            Err(e) => {
                self.events.record_error(format!(
                    "backup of '{}' failed: {}",
                    self.config.local_directory.display(),
                    e
                ));
                CycleOutcome::Failed {
                    stage: e.stage(),
                    reason: e.to_string(),
                }
            }
        }
    }

    fn try_run(&self) -> BackupResult<CycleOutcome> {
        let blob = TempBlob::claim(&self.config.temp_blob)?;

        self.archiver
            .archive(&self.config.local_directory, blob.path())?;
        tracing::debug!(path = %blob.path().display(), "archive created");

        let fingerprint = self.fingerprinter.fingerprint(blob.path())?;
        tracing::debug!(%fingerprint, "archive fingerprinted");

        if self
            .probe
            .already_uploaded(&fingerprint, self.config.history_sample)
        {
            self.events.record_notice(format!(
                "backup skipped, content unchanged (fingerprint {})",
                fingerprint
            ));
            return Ok(CycleOutcome::Skipped { fingerprint });
        }

        let key = remote_key(&self.config.remote_prefix, Utc::now(), &fingerprint);
        self.uploader
            .upload(blob.path(), &key, self.config.make_public)?;

        self.events.record_notice(format!(
            "backup of '{}' uploaded to '{}'",
            self.config.local_directory.display(),
            key
        ));
        Ok(CycleOutcome::Uploaded { key, fingerprint })
    }
}
