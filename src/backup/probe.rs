//! Recent remote history sampling for the dedup check
//!
//! Only the first few keys of a listing are examined. If the content hasn't
//! changed, the last backup should carry the same fingerprint, so there is
//! no need to look at the whole bucket.

use std::sync::Arc;

use crate::config::settings::BUCKET_DELIMITER;
use crate::error::BackupResult;
use crate::events::EventLog;
use crate::storage::ObjectStore;

/// Queries recent backup keys under a prefix
pub struct RemoteHistoryProbe {
    store: Arc<dyn ObjectStore>,
    prefix: String,
    events: EventLog,
}

impl RemoteHistoryProbe {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<String>, events: EventLog) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            events,
        }
    }

    /// Keys of up to `max` objects under the prefix
    ///
    /// No ordering is assumed beyond what the store returns.
    pub fn list_recent(&self, max: usize) -> BackupResult<Vec<String>> {
        let listing = self.store.list(&self.prefix, BUCKET_DELIMITER, "", max)?;
        Ok(listing.keys())
    }

    /// Check whether a backup with this fingerprint is among the sampled keys
    ///
    /// A failed listing is recorded as an error and counts as "not uploaded",
    /// so the caller goes ahead with the upload.
    pub fn already_uploaded(&self, fingerprint: &str, sample: usize) -> bool {
        match self.list_recent(sample) {
            Ok(keys) => contains_fingerprint(&keys, fingerprint),
            Err(e) => {
                self.events
                    .record_error(format!("listing recent backups failed: {}", e));
                false
            }
        }
    }
}

/// True iff any key contains `fingerprint` as a substring
pub fn contains_fingerprint<S: AsRef<str>>(keys: &[S], fingerprint: &str) -> bool {
    !fingerprint.is_empty() && keys.iter().any(|k| k.as_ref().contains(fingerprint))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryObjectStore;

    fn probe_with(store: Arc<MemoryObjectStore>, events: EventLog) -> RemoteHistoryProbe {
        RemoteHistoryProbe::new(store, "site/", events)
    }

    #[test]
    fn test_contains_fingerprint() {
        let keys = ["20240101_0000_abc123.zip"];
        assert!(contains_fingerprint(&keys, "abc123"));
        assert!(!contains_fingerprint(&keys, "def456"));
        assert!(!contains_fingerprint(&keys, ""));
        assert!(!contains_fingerprint::<&str>(&[], "abc123"));
    }

    #[test]
    fn test_list_recent_respects_max_and_prefix() {
        let store = Arc::new(MemoryObjectStore::with_keys(
            (0..20)
                .map(|i| format!("site/202401{:02}_0000_f{}.zip", i + 1, i))
                .chain(std::iter::once("other/x.zip".to_string())),
        ));
        let probe = probe_with(store, EventLog::new(4, 4).unwrap());

        let keys = probe.list_recent(10).unwrap();
        assert_eq!(keys.len(), 10);
        assert!(keys.iter().all(|k| k.starts_with("site/")));
        assert_eq!(keys[0], "site/20240120_0000_f19.zip");
    }

    #[test]
    fn test_sample_is_bounded() {
        let store = Arc::new(MemoryObjectStore::with_keys(
            (0..20).map(|i| format!("site/202401{:02}_0000_f{:02}.zip", i + 1, i)),
        ));
        let probe = probe_with(store, EventLog::new(4, 4).unwrap());

        // The oldest backup falls outside a sample of 10
        assert!(probe.already_uploaded("f19", 10));
        assert!(!probe.already_uploaded("f00", 10));
        assert!(probe.already_uploaded("f00", 20));
    }

    #[test]
    fn test_listing_failure_counts_as_not_uploaded() {
        let store = Arc::new(MemoryObjectStore::with_keys(["site/20240101_0000_abc.zip"]));
        store.set_fail_list(true);
        let events = EventLog::new(4, 4).unwrap();
        let probe = probe_with(store, events.clone());

        assert!(!probe.already_uploaded("abc", 10));
        assert_eq!(events.errors_snapshot().len(), 1);
        assert!(events.errors_snapshot()[0].message.contains("listing"));
    }
}
