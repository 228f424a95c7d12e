//! Configuration module for bucket-backup
//!
//! This module provides configuration management including:
//! - Config file and bucket store path resolution
//! - The backup target and loop settings

pub mod paths;
pub mod settings;

pub use paths::BackupPaths;
pub use settings::{BackupConfig, Credentials};
