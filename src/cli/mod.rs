//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the backup library.

pub mod backup;
pub mod settings;

pub use backup::{handle_check, handle_once, handle_run};
pub use settings::{handle_config, handle_init, resolve_config, ConfigOverrides};
