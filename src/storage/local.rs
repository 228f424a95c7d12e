//! Filesystem-backed bucket store
//!
//! A bucket is the directory `<root>/<bucket>` and every object is a file at
//! its key path inside it. Per-object metadata (content type, access policy,
//! size) is kept in JSON sidecars under `<bucket>/.bucket-meta/`, and object
//! writes are staged in `<bucket>/.bucket-meta/tmp/`, so listings only ever
//! see complete object files.

use std::fs;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use super::{select_listing, AccessPolicy, ListResult, ObjectStore};
use crate::error::{BackupError, BackupResult};
use crate::file_io;

const META_DIR: &str = ".bucket-meta";

/// Metadata stored alongside each object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    pub content_type: String,
    pub policy: AccessPolicy,
    pub size: u64,
    pub stored_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BucketMetadata {
    policy: AccessPolicy,
    created_at: DateTime<Utc>,
}

/// Object store keeping one bucket in a local directory tree
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    bucket: String,
    bucket_dir: PathBuf,
}

impl LocalObjectStore {
    /// Open `bucket` under `root`; the bucket directory is created lazily by
    /// `ensure_bucket`
    pub fn new(root: impl Into<PathBuf>, bucket: impl Into<String>) -> BackupResult<Self> {
        let bucket = bucket.into();
        if bucket.is_empty()
            || bucket.contains(['/', '\\'])
            || bucket.starts_with('.')
        {
            return Err(BackupError::InvalidConfig(format!(
                "invalid bucket name '{}'",
                bucket
            )));
        }

        let bucket_dir = root.into().join(&bucket);
        Ok(Self { bucket, bucket_dir })
    }

    /// Name of the bucket
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Directory holding the bucket's objects
    pub fn bucket_dir(&self) -> &Path {
        &self.bucket_dir
    }

    /// Check if the bucket directory exists
    pub fn bucket_exists(&self) -> bool {
        self.bucket_dir.is_dir()
    }

    /// Metadata of a stored object, if present
    pub fn object_metadata(&self, key: &str) -> BackupResult<Option<ObjectMetadata>> {
        let path = self.meta_path(key)?;
        file_io::read_json_optional(path)
    }

    /// Current bucket access policy, if the bucket exists
    pub fn bucket_policy(&self) -> BackupResult<Option<AccessPolicy>> {
        let meta: Option<BucketMetadata> = file_io::read_json_optional(self.bucket_meta_path())?;
        Ok(meta.map(|m| m.policy))
    }

    fn object_path(&self, key: &str) -> BackupResult<PathBuf> {
        Ok(self.bucket_dir.join(validate_key(key)?))
    }

    fn meta_path(&self, key: &str) -> BackupResult<PathBuf> {
        let relative = validate_key(key)?;
        let mut path = self.bucket_dir.join(META_DIR).join("objects").join(relative);
        let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".json");
        path.set_file_name(name);
        Ok(path)
    }

    /// Where an object is written before being renamed into place
    fn staging_path(&self, key: &str) -> PathBuf {
        let name = key.replace('%', "%25").replace('/', "%2F");
        self.bucket_dir
            .join(META_DIR)
            .join("tmp")
            .join(format!("{}.part", name))
    }

    fn bucket_meta_path(&self) -> PathBuf {
        self.bucket_dir.join(META_DIR).join("bucket.json")
    }

    /// All object keys and sizes, sorted in reverse lexical order
    fn collect_objects(&self) -> BackupResult<Vec<(String, u64)>> {
        let mut objects = Vec::new();

        let walker = WalkDir::new(&self.bucket_dir)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| e.file_name() != META_DIR);

        for entry in walker {
            let entry = entry
                .map_err(|e| BackupError::Storage(format!("Failed to walk bucket: {}", e)))?;
            // Unfinished atomic writes are never objects
            if !entry.file_type().is_file() || is_temp_file(entry.path()) {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&self.bucket_dir)
                .map_err(|e| BackupError::Storage(e.to_string()))?;
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let size = entry
                .metadata()
                .map_err(|e| BackupError::Storage(format!("Failed to stat {}: {}", key, e)))?
                .len();

            objects.push((key, size));
        }

        objects.sort_unstable_by(|a, b| b.0.cmp(&a.0));
        Ok(objects)
    }
}

impl ObjectStore for LocalObjectStore {
    fn list(
        &self,
        prefix: &str,
        delimiter: &str,
        marker: &str,
        max_keys: usize,
    ) -> BackupResult<ListResult> {
        if !self.bucket_exists() {
            return Err(BackupError::Storage(format!(
                "bucket '{}' does not exist at {}",
                self.bucket,
                self.bucket_dir.display()
            )));
        }

        let objects = self.collect_objects()?;
        Ok(select_listing(
            objects.iter().map(|(k, s)| (k.as_str(), *s)),
            prefix,
            delimiter,
            marker,
            max_keys,
        ))
    }

    fn ensure_bucket(&self, policy: AccessPolicy) -> BackupResult<()> {
        fs::create_dir_all(&self.bucket_dir).map_err(|e| {
            BackupError::Storage(format!(
                "Failed to create bucket {}: {}",
                self.bucket_dir.display(),
                e
            ))
        })?;

        let created_at = file_io::read_json_optional::<BucketMetadata, _>(self.bucket_meta_path())?
            .map(|m| m.created_at)
            .unwrap_or_else(Utc::now);

        file_io::write_json_atomic(self.bucket_meta_path(), &BucketMetadata { policy, created_at })
            .map_err(|e| BackupError::Storage(format!("Failed to write bucket policy: {}", e)))
    }

    fn put_object(
        &self,
        key: &str,
        content: &mut dyn Read,
        size: u64,
        content_type: &str,
        policy: AccessPolicy,
    ) -> BackupResult<()> {
        if !self.bucket_exists() {
            return Err(BackupError::Storage(format!(
                "bucket '{}' does not exist",
                self.bucket
            )));
        }

        let path = self.object_path(key)?;
        let written = file_io::write_atomic_staged(&path, self.staging_path(key), content)
            .map_err(|e| BackupError::Storage(format!("Failed to store {}: {}", key, e)))?;

        if written != size {
            let _ = fs::remove_file(&path);
            return Err(BackupError::Storage(format!(
                "short write for {}: expected {} bytes, got {}",
                key, size, written
            )));
        }

        let metadata = ObjectMetadata {
            content_type: content_type.to_string(),
            policy,
            size,
            stored_at: Utc::now(),
        };
        file_io::write_json_atomic(self.meta_path(key)?, &metadata)
            .map_err(|e| BackupError::Storage(format!("Failed to store metadata for {}: {}", key, e)))
    }
}

fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().ends_with(file_io::TEMP_SUFFIX))
        .unwrap_or(false)
}

/// Turn a key into a relative path, rejecting anything that could escape
/// the bucket or collide with the metadata directory
fn validate_key(key: &str) -> BackupResult<PathBuf> {
    let invalid = || BackupError::Storage(format!("invalid object key '{}'", key));

    if key.is_empty() || key.ends_with('/') || key.ends_with(file_io::TEMP_SUFFIX) {
        return Err(invalid());
    }

    let relative = PathBuf::from(key);
    for (i, component) in relative.components().enumerate() {
        match component {
            Component::Normal(part) if !(i == 0 && part == META_DIR) => {}
            _ => return Err(invalid()),
        }
    }
    if key.split('/').any(|part| part.is_empty()) {
        return Err(invalid());
    }

    Ok(relative)
}
