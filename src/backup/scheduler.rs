//! The backup loop
//!
//! Validates the configuration once, then runs a cycle every interval for as
//! long as the process lives. Misconfiguration is a hard stop: a target that
//! can't be listed at startup won't fix itself.

use std::convert::Infallible;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::archive::{Archiver, ZipArchiver};
use super::cycle::{BackupCycle, CycleOutcome};
use super::fingerprint::{Fingerprinter, Sha256Fingerprinter};
use crate::config::settings::BUCKET_DELIMITER;
use crate::config::BackupConfig;
use crate::error::{BackupError, BackupResult};
use crate::events::EventLog;
use crate::storage::ObjectStore;

/// Check a configuration against the filesystem and the bucket
///
/// Returns the normalized configuration. Fails with `InvalidConfig` if the
/// directory to back up is missing or the bucket can't be listed.
pub fn validate(config: BackupConfig, store: &dyn ObjectStore) -> BackupResult<BackupConfig> {
    let config = config.normalized()?;

    if !config.local_directory.is_dir() {
        return Err(BackupError::InvalidConfig(format!(
            "directory to back up '{}' doesn't exist",
            config.local_directory.display()
        )));
    }

    store
        .list(
            &config.remote_prefix,
            BUCKET_DELIMITER,
            "",
            config.history_sample,
        )
        .map_err(|e| {
            BackupError::InvalidConfig(format!(
                "listing bucket '{}' failed: {}",
                config.bucket, e
            ))
        })?;

    Ok(config)
}

/// Runs backup cycles on a fixed interval
pub struct BackupScheduler {
    config: BackupConfig,
    store: Arc<dyn ObjectStore>,
    archiver: Arc<dyn Archiver>,
    fingerprinter: Arc<dyn Fingerprinter>,
    events: EventLog,
}

impl BackupScheduler {
    pub fn new(config: BackupConfig, store: Arc<dyn ObjectStore>, events: EventLog) -> Self {
        Self {
            config,
            store,
            archiver: Arc::new(ZipArchiver::new()),
            fingerprinter: Arc::new(Sha256Fingerprinter),
            events,
        }
    }

    /// Replace the archiver used by every cycle
    pub fn with_archiver(mut self, archiver: Arc<dyn Archiver>) -> Self {
        self.archiver = archiver;
        self
    }

    /// Replace the fingerprinter used by every cycle
    pub fn with_fingerprinter(mut self, fingerprinter: Arc<dyn Fingerprinter>) -> Self {
        self.fingerprinter = fingerprinter;
        self
    }

    /// Validate the configuration and build the cycle it will run
    pub fn prepare(self) -> BackupResult<BackupCycle> {
        let config = validate(self.config, self.store.as_ref())?;
        tracing::info!(
            bucket = %config.bucket,
            prefix = %config.remote_prefix,
            directory = %config.local_directory.display(),
            interval_secs = config.interval_secs,
            "backup target validated"
        );

        Ok(BackupCycle::with_collaborators(
            config,
            self.archiver,
            self.fingerprinter,
            self.store,
            self.events,
        ))
    }

    /// Validate, then run `cycles` cycles with the interval between them
    pub fn run_for(self, cycles: usize) -> BackupResult<Vec<CycleOutcome>> {
        let cycle = self.prepare()?;
        let interval = cycle.config().interval();

        let mut outcomes = Vec::with_capacity(cycles);
        for i in 0..cycles {
            if i > 0 {
                thread::sleep(interval);
            }
            outcomes.push(cycle.run_once());
        }
        Ok(outcomes)
    }

    /// Validate, then run cycles forever
    ///
    /// Only returns on a validation error.
    pub fn run(self) -> BackupResult<Infallible> {
        let cycle = self.prepare()?;
        run_loop(&cycle)
    }

    /// Validate on the calling thread, then run the loop on a background
    /// thread
    pub fn spawn(self) -> BackupResult<JoinHandle<()>> {
        let cycle = self.prepare()?;
        thread::Builder::new()
            .name("backup-loop".into())
            .spawn(move || {
                run_loop(&cycle);
            })
            .map_err(|e| BackupError::Io(format!("Failed to start backup thread: {}", e)))
    }
}

fn run_loop(cycle: &BackupCycle) -> ! {
    let interval = cycle.config().interval();
    loop {
        let outcome = cycle.run_once();
        tracing::debug!(?outcome, "cycle finished");
        thread::sleep(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryObjectStore;
    use std::fs;
    use tempfile::TempDir;

    fn config_for(source: &TempDir, scratch: &TempDir) -> BackupConfig {
        let mut config = BackupConfig::new("bucket", source.path()).with_prefix("/site");
        config.temp_blob = scratch.path().join("tmp.zip");
        config.interval_secs = 1;
        config
    }

    #[test]
    fn test_validate_normalizes_prefix() {
        let source = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let store = MemoryObjectStore::new();

        let config = validate(config_for(&source, &scratch), &store).unwrap();
        assert_eq!(config.remote_prefix, "site/");
        assert_eq!(store.list_count(), 1);
    }

    #[test]
    fn test_validate_missing_directory() {
        let source = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let mut config = config_for(&source, &scratch);
        config.local_directory = source.path().join("does-not-exist");
        let store = MemoryObjectStore::new();

        let err = validate(config, &store).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("doesn't exist"));
        assert_eq!(store.list_count(), 0);
    }

    #[test]
    fn test_validate_unreachable_bucket() {
        let source = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let store = MemoryObjectStore::new();
        store.set_fail_list(true);

        let err = validate(config_for(&source, &scratch), &store).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_run_aborts_before_any_cycle_on_bad_config() {
        let source = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let mut config = config_for(&source, &scratch);
        config.local_directory = source.path().join("missing");

        let store = Arc::new(MemoryObjectStore::new());
        let events = EventLog::new(4, 4).unwrap();
        let result = BackupScheduler::new(config, store.clone(), events.clone()).run();

        assert!(result.is_err());
        assert_eq!(store.put_count(), 0);
        assert!(events.notices_snapshot().is_empty());
        assert!(!scratch.path().join("tmp.zip").exists());
    }

    #[test]
    fn test_run_for_two_cycles() {
        let source = TempDir::new().unwrap();
        fs::write(source.path().join("data.txt"), b"payload").unwrap();
        let scratch = TempDir::new().unwrap();

        let store = Arc::new(MemoryObjectStore::new());
        let events = EventLog::new(4, 8).unwrap();
        let outcomes = BackupScheduler::new(config_for(&source, &scratch), store.clone(), events)
            .run_for(2)
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].is_uploaded());
        assert!(outcomes[1].is_skipped());
        assert_eq!(store.put_count(), 1);
        assert!(store.keys()[0].starts_with("site/"));
    }

    #[test]
    fn test_spawn_runs_in_background() {
        let source = TempDir::new().unwrap();
        fs::write(source.path().join("data.txt"), b"payload").unwrap();
        let scratch = TempDir::new().unwrap();

        let store = Arc::new(MemoryObjectStore::new());
        let events = EventLog::new(4, 8).unwrap();
        let handle = BackupScheduler::new(config_for(&source, &scratch), store.clone(), events.clone())
            .spawn()
            .unwrap();
        assert_eq!(handle.thread().name(), Some("backup-loop"));

        // Other components keep recording while the loop runs
        events.record_notice("request served");

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        while store.put_count() == 0 && std::time::Instant::now() < deadline {
            thread::sleep(std::time::Duration::from_millis(20));
        }
        assert_eq!(store.put_count(), 1);
        assert!(events
            .notices_snapshot()
            .iter()
            .any(|e| e.message == "request served"));
    }
}
