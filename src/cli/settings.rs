//! Configuration CLI commands
//!
//! Loads the config file, applies command-line overrides, and implements
//! `init` and `config`.

use std::path::PathBuf;

use clap::Args;

use crate::config::{BackupConfig, BackupPaths, Credentials};
use crate::error::{BackupError, BackupResult};
use crate::storage::{AccessPolicy, LocalObjectStore, ObjectStore};

/// Bucket used by `init` when none is given
const DEFAULT_BUCKET: &str = "backups";

/// Flags that take precedence over the config file
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigOverrides {
    /// Path to the config file
    #[arg(long, global = true, env = "BUCKET_BACKUP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory to back up
    #[arg(long, global = true)]
    pub local_dir: Option<PathBuf>,

    /// Target bucket
    #[arg(long, global = true)]
    pub bucket: Option<String>,

    /// Key prefix for uploaded backups
    #[arg(long, global = true)]
    pub prefix: Option<String>,

    /// Seconds between backup cycles
    #[arg(long, global = true)]
    pub interval_secs: Option<u64>,

    /// Storage backend access key
    #[arg(long, global = true, env = "BUCKET_BACKUP_ACCESS_KEY", hide_env_values = true)]
    pub access_key: Option<String>,

    /// Storage backend secret key
    #[arg(long, global = true, env = "BUCKET_BACKUP_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,
}

impl ConfigOverrides {
    /// The config file these overrides point at
    pub fn config_file(&self, paths: &BackupPaths) -> PathBuf {
        self.config.clone().unwrap_or_else(|| paths.config_file())
    }

    /// Apply every set flag on top of `config`
    pub fn apply(&self, mut config: BackupConfig) -> BackupConfig {
        if let Some(dir) = &self.local_dir {
            config.local_directory = dir.clone();
        }
        if let Some(bucket) = &self.bucket {
            config.bucket = bucket.clone();
        }
        if let Some(prefix) = &self.prefix {
            config.remote_prefix = prefix.clone();
        }
        if let Some(secs) = self.interval_secs {
            config.interval_secs = secs;
        }
        if let Some(key) = &self.access_key {
            config.credentials.access_key = key.clone();
        }
        if let Some(secret) = &self.secret_key {
            config.credentials.secret_key = secret.clone();
        }
        config
    }
}

/// Load the config file and apply overrides
pub fn resolve_config(paths: &BackupPaths, overrides: &ConfigOverrides) -> BackupResult<BackupConfig> {
    let path = overrides.config_file(paths);
    if !path.exists() {
        return Err(BackupError::InvalidConfig(format!(
            "no config file at {} (run 'bucket-backup init' first)",
            path.display()
        )));
    }

    let config = BackupConfig::load(&path)?;
    Ok(overrides.apply(config))
}

/// Open the filesystem bucket store a configuration points at
///
/// The filesystem store doesn't authenticate; configured credentials are
/// reported as unused.
pub fn open_store(config: &BackupConfig, paths: &BackupPaths) -> BackupResult<LocalObjectStore> {
    if !config.credentials.is_empty() {
        tracing::warn!(
            access_key = %config.credentials.access_key,
            "credentials are set but the filesystem bucket store does not use them"
        );
    }
    LocalObjectStore::new(config.storage_root_or(paths), config.bucket.clone())
}

/// Write a default config file and create its bucket
pub fn handle_init(paths: &BackupPaths, overrides: &ConfigOverrides) -> BackupResult<()> {
    let path = overrides.config_file(paths);
    if path.exists() {
        return Err(BackupError::InvalidConfig(format!(
            "config file already exists at {}",
            path.display()
        )));
    }

    let local_directory = match &overrides.local_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    let config = overrides.apply(BackupConfig::new(DEFAULT_BUCKET, local_directory));
    let config = config.normalized()?;

    paths.ensure_directories()?;
    config.save(&path)?;

    let store = open_store(&config, paths)?;
    store.ensure_bucket(AccessPolicy::from_public(config.make_public))?;

    println!("Initialized bucket-backup at: {}", paths.base_dir().display());
    println!("Config file: {}", path.display());
    println!("Bucket:      {}", store.bucket_dir().display());
    Ok(())
}

/// Print the effective configuration with the secret masked
pub fn handle_config(paths: &BackupPaths, overrides: &ConfigOverrides) -> BackupResult<()> {
    let config = resolve_config(paths, overrides)?;

    println!("bucket-backup Configuration");
    println!("===========================");
    println!("Config file:     {}", overrides.config_file(paths).display());
    println!("Storage root:    {}", config.storage_root_or(paths).display());
    println!("Bucket:          {}", config.bucket);
    println!("Prefix:          {}", config.remote_prefix);
    println!("Local directory: {}", config.local_directory.display());
    println!("Temp archive:    {}", config.temp_blob.display());
    println!("Interval:        {}s", config.interval_secs);
    println!("History sample:  {}", config.history_sample);
    println!("Public uploads:  {}", config.make_public);
    println!(
        "Event log:       {} errors, {} notices",
        config.error_capacity, config.notice_capacity
    );
    print_credentials(&config.credentials);
    Ok(())
}

fn print_credentials(credentials: &Credentials) {
    println!();
    println!("Credentials:");
    println!("  Access key: {}", credentials.access_key);
    println!("  Secret key: {}", credentials.redacted_secret());
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_apply_overrides() {
        let overrides = ConfigOverrides {
            bucket: Some("other".into()),
            prefix: Some("/www".into()),
            interval_secs: Some(60),
            secret_key: Some("hunter22".into()),
            ..Default::default()
        };

        let config = overrides.apply(BackupConfig::new("bucket", "/srv"));
        assert_eq!(config.bucket, "other");
        assert_eq!(config.remote_prefix, "/www");
        assert_eq!(config.interval_secs, 60);
        assert_eq!(config.local_directory, PathBuf::from("/srv"));
        assert_eq!(config.credentials.secret_key, "hunter22");
        assert_eq!(config.credentials.access_key, "");
    }

    #[test]
    fn test_open_store_with_unused_credentials() {
        let temp = TempDir::new().unwrap();
        let paths = BackupPaths::with_base_dir(temp.path().to_path_buf());

        let mut config = BackupConfig::new("bucket", "/srv");
        assert!(config.credentials.is_empty());
        let store = open_store(&config, &paths).unwrap();
        assert_eq!(store.bucket_dir(), paths.storage_root().join("bucket"));

        config.credentials = Credentials::new("AKID", "");
        assert!(!config.credentials.is_empty());
        let store = open_store(&config, &paths).unwrap();
        assert_eq!(store.bucket(), "bucket");
    }

    #[test]
    fn test_resolve_requires_config_file() {
        let temp = TempDir::new().unwrap();
        let paths = BackupPaths::with_base_dir(temp.path().to_path_buf());

        let err = resolve_config(&paths, &ConfigOverrides::default()).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("init"));
    }

    #[test]
    fn test_init_then_resolve() {
        let temp = TempDir::new().unwrap();
        let source = TempDir::new().unwrap();
        let paths = BackupPaths::with_base_dir(temp.path().to_path_buf());
        let overrides = ConfigOverrides {
            local_dir: Some(source.path().to_path_buf()),
            prefix: Some("site".into()),
            ..Default::default()
        };

        handle_init(&paths, &overrides).unwrap();
        assert!(paths.config_file().exists());
        assert!(paths.storage_root().join(DEFAULT_BUCKET).is_dir());

        let config = resolve_config(&paths, &ConfigOverrides::default()).unwrap();
        assert_eq!(config.bucket, DEFAULT_BUCKET);
        assert_eq!(config.remote_prefix, "site/");
        assert_eq!(config.local_directory, source.path());

        // A second init refuses to clobber the file
        assert!(handle_init(&paths, &overrides).is_err());
    }
}
