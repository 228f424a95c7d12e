//! In-memory bucket store
//!
//! Holds one bucket in a map. Listing and put failures can be switched on to
//! exercise error paths, and every put is counted.

use std::collections::BTreeMap;
use std::io::Read;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::{select_listing, AccessPolicy, ListResult, ObjectStore};
use crate::error::{BackupError, BackupResult};

/// An object held by `MemoryObjectStore`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
    pub policy: AccessPolicy,
}

#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    bucket_policy: Mutex<Option<AccessPolicy>>,
    fail_list: AtomicBool,
    fail_put: AtomicBool,
    puts: AtomicUsize,
    lists: AtomicUsize,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the bucket with empty objects at `keys`
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        for key in keys {
            store.insert(key, Vec::new());
        }
        store
    }

    /// Store an object directly, bypassing put accounting
    pub fn insert(&self, key: impl Into<String>, data: Vec<u8>) {
        self.objects.lock().insert(
            key.into(),
            StoredObject {
                data,
                content_type: super::DEFAULT_CONTENT_TYPE.to_string(),
                policy: AccessPolicy::Private,
            },
        );
    }

    /// Make every `list` call fail
    pub fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Make every `put_object` call fail
    pub fn set_fail_put(&self, fail: bool) {
        self.fail_put.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `put_object` calls
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Number of `list` calls, failed ones included
    pub fn list_count(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    /// All keys in ascending order
    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().keys().cloned().collect()
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().get(key).cloned()
    }

    pub fn bucket_policy(&self) -> Option<AccessPolicy> {
        *self.bucket_policy.lock()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn list(
        &self,
        prefix: &str,
        delimiter: &str,
        marker: &str,
        max_keys: usize,
    ) -> BackupResult<ListResult> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(BackupError::Storage("simulated listing failure".into()));
        }

        let objects = self.objects.lock();
        Ok(select_listing(
            objects
                .iter()
                .rev()
                .map(|(k, o)| (k.as_str(), o.data.len() as u64)),
            prefix,
            delimiter,
            marker,
            max_keys,
        ))
    }

    fn ensure_bucket(&self, policy: AccessPolicy) -> BackupResult<()> {
        *self.bucket_policy.lock() = Some(policy);
        Ok(())
    }

    fn put_object(
        &self,
        key: &str,
        content: &mut dyn Read,
        size: u64,
        content_type: &str,
        policy: AccessPolicy,
    ) -> BackupResult<()> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(BackupError::Storage("simulated put failure".into()));
        }

        let mut data = Vec::new();
        content.read_to_end(&mut data)?;
        if data.len() as u64 != size {
            return Err(BackupError::Storage(format!(
                "short read for {}: expected {} bytes, got {}",
                key,
                size,
                data.len()
            )));
        }

        self.objects.lock().insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
                policy,
            },
        );
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_then_list() {
        let store = MemoryObjectStore::new();
        store
            .put_object("p/a.zip", &mut &b"abc"[..], 3, "application/zip", AccessPolicy::PublicRead)
            .unwrap();

        let result = store.list("p/", "/", "", 10).unwrap();
        assert_eq!(result.keys(), vec!["p/a.zip"]);
        assert_eq!(store.put_count(), 1);
        assert_eq!(store.object("p/a.zip").unwrap().policy, AccessPolicy::PublicRead);
    }

    #[test]
    fn test_injected_failures() {
        let store = MemoryObjectStore::with_keys(["x"]);
        store.set_fail_list(true);
        assert!(store.list("", "/", "", 10).is_err());
        assert_eq!(store.list_count(), 1);

        store.set_fail_put(true);
        assert!(store
            .put_object("y", &mut &b""[..], 0, "t", AccessPolicy::Private)
            .is_err());
        assert_eq!(store.put_count(), 0);
    }
}
