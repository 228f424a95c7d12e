//! Object storage layer for bucket-backup
//!
//! Every bucket operation goes through the [`ObjectStore`] trait. Two
//! implementations ship with the crate:
//!
//! - `LocalObjectStore`: buckets are directories under a storage root
//! - `MemoryObjectStore`: a bucket held in memory, with failure injection
//!
//! # Listing semantics
//!
//! `list` follows the familiar bucket listing contract: keys under `prefix`,
//! resumed after `marker`, capped at `max_keys`, with keys that contain
//! `delimiter` past the prefix rolled up into `common_prefixes`. Both stores
//! return keys in reverse lexical order, so time-prefixed backup keys come
//! back newest first.

mod local;
mod memory;

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::error::BackupResult;

pub use local::{LocalObjectStore, ObjectMetadata};
pub use memory::{MemoryObjectStore, StoredObject};

/// Fallback content type for blobs with an unknown extension
pub const DEFAULT_CONTENT_TYPE: &str = "binary/octet-stream";

/// Access policy applied to buckets and objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessPolicy {
    Private,
    PublicRead,
}

impl AccessPolicy {
    pub fn from_public(public: bool) -> Self {
        if public {
            Self::PublicRead
        } else {
            Self::Private
        }
    }
}

impl std::fmt::Display for AccessPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Private => write!(f, "private"),
            Self::PublicRead => write!(f, "public-read"),
        }
    }
}

/// One object in a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
}

/// Result of a `list` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListResult {
    /// Objects directly under the prefix
    pub contents: Vec<ObjectSummary>,
    /// Rolled-up "subdirectories" under the prefix
    pub common_prefixes: Vec<String>,
    /// More entries were available past `max_keys`
    pub is_truncated: bool,
}

impl ListResult {
    /// Keys of the listed objects, in listing order
    pub fn keys(&self) -> Vec<String> {
        self.contents.iter().map(|o| o.key.clone()).collect()
    }
}

/// The bucket operations the backup workflow needs
///
/// Implementations must be `Send + Sync`: the backup loop runs on its own
/// thread.
pub trait ObjectStore: Send + Sync {
    /// List up to `max_keys` entries under `prefix`
    fn list(
        &self,
        prefix: &str,
        delimiter: &str,
        marker: &str,
        max_keys: usize,
    ) -> BackupResult<ListResult>;

    /// Create the bucket if it doesn't exist and apply `policy` to it
    fn ensure_bucket(&self, policy: AccessPolicy) -> BackupResult<()>;

    /// Store `size` bytes read from `content` at `key`
    fn put_object(
        &self,
        key: &str,
        content: &mut dyn Read,
        size: u64,
        content_type: &str,
        policy: AccessPolicy,
    ) -> BackupResult<()>;
}

/// Apply listing semantics to a reverse-sorted sequence of `(key, size)`
fn select_listing<'a, I>(
    entries: I,
    prefix: &str,
    delimiter: &str,
    marker: &str,
    max_keys: usize,
) -> ListResult
where
    I: IntoIterator<Item = (&'a str, u64)>,
{
    let mut result = ListResult::default();
    let mut count = 0;

    for (key, size) in entries {
        if !key.starts_with(prefix) {
            continue;
        }
        // Reverse order: resuming after the marker means smaller keys
        if !marker.is_empty() && key >= marker {
            continue;
        }

        let rest = &key[prefix.len()..];
        let rolled_up = if delimiter.is_empty() {
            None
        } else {
            rest.find(delimiter)
                .map(|i| format!("{}{}", prefix, &rest[..i + delimiter.len()]))
        };

        if let Some(common) = &rolled_up {
            if result.common_prefixes.last() == Some(common) {
                continue;
            }
        }

        if count == max_keys {
            result.is_truncated = true;
            break;
        }
        count += 1;

        match rolled_up {
            Some(common) => result.common_prefixes.push(common),
            None => result.contents.push(ObjectSummary {
                key: key.to_string(),
                size,
            }),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(keys: &[&str], prefix: &str, marker: &str, max: usize) -> ListResult {
        let mut sorted: Vec<&str> = keys.to_vec();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        select_listing(sorted.into_iter().map(|k| (k, 1)), prefix, "/", marker, max)
    }

    #[test]
    fn test_listing_newest_first_and_capped() {
        let keys = [
            "b/20240101_0000_aaa.zip",
            "b/20240102_0000_bbb.zip",
            "b/20240103_0000_ccc.zip",
        ];
        let result = listing(&keys, "b/", "", 2);
        assert_eq!(
            result.keys(),
            vec!["b/20240103_0000_ccc.zip", "b/20240102_0000_bbb.zip"]
        );
        assert!(result.is_truncated);
    }

    #[test]
    fn test_listing_filters_prefix() {
        let keys = ["a/1.zip", "b/2.zip", "b/3.zip"];
        let result = listing(&keys, "b/", "", 10);
        assert_eq!(result.keys(), vec!["b/3.zip", "b/2.zip"]);
        assert!(!result.is_truncated);
    }

    #[test]
    fn test_listing_rolls_up_common_prefixes() {
        let keys = ["b/old/1.zip", "b/old/2.zip", "b/x.zip"];
        let result = listing(&keys, "b/", "", 10);
        assert_eq!(result.keys(), vec!["b/x.zip"]);
        assert_eq!(result.common_prefixes, vec!["b/old/"]);
    }

    #[test]
    fn test_listing_resumes_after_marker() {
        let keys = ["p/1", "p/2", "p/3", "p/4"];
        let result = listing(&keys, "p/", "p/3", 10);
        assert_eq!(result.keys(), vec!["p/2", "p/1"]);
    }

    #[test]
    fn test_access_policy_display() {
        assert_eq!(AccessPolicy::from_public(true).to_string(), "public-read");
        assert_eq!(AccessPolicy::from_public(false).to_string(), "private");
    }
}
