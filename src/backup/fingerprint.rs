//! Content fingerprinting

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{BackupError, BackupResult};

/// Computes a stable identifier from a blob's content
pub trait Fingerprinter: Send + Sync {
    fn fingerprint(&self, blob: &Path) -> BackupResult<String>;
}

/// Lowercase hex SHA-256 of the file contents
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Fingerprinter;

impl Fingerprinter for Sha256Fingerprinter {
    fn fingerprint(&self, blob: &Path) -> BackupResult<String> {
        let file = File::open(blob)
            .map_err(|e| BackupError::Hash(format!("unable to read {}: {}", blob.display(), e)))?;

        let mut reader = BufReader::new(file);
        let mut hasher = Sha256::new();
        io::copy(&mut reader, &mut hasher)
            .map_err(|e| BackupError::Hash(format!("unable to hash {}: {}", blob.display(), e)))?;

        Ok(hex::encode(hasher.finalize()))
    }
}
