//! Blob upload to the bucket

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use crate::error::{BackupError, BackupResult};
use crate::storage::{AccessPolicy, ObjectStore, DEFAULT_CONTENT_TYPE};

/// Transfers local blobs to remote keys
pub struct BackupUploader {
    store: Arc<dyn ObjectStore>,
}

impl BackupUploader {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Upload `local_blob` to `remote_key`, creating the bucket if needed
    ///
    /// Every failure comes back as `BackupError::Upload`; there is no retry.
    pub fn upload(&self, local_blob: &Path, remote_key: &str, make_public: bool) -> BackupResult<()> {
        let fail = |detail: String| {
            BackupError::Upload(format!(
                "'{}' to '{}': {}",
                local_blob.display(),
                remote_key,
                detail
            ))
        };

        let file = File::open(local_blob).map_err(|e| fail(e.to_string()))?;
        let size = file.metadata().map_err(|e| fail(e.to_string()))?.len();

        let policy = AccessPolicy::from_public(make_public);
        let content_type = content_type_for(local_blob);

        self.store
            .ensure_bucket(policy)
            .map_err(|e| fail(e.to_string()))?;

        let mut reader = BufReader::new(file);
        self.store
            .put_object(remote_key, &mut reader, size, &content_type, policy)
            .map_err(|e| fail(e.to_string()))?;

        tracing::debug!(key = %remote_key, size, %policy, "uploaded blob");
        Ok(())
    }
}

/// Content type from the file extension, falling back to a generic binary type
pub fn content_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string()
}
