//! Backup CLI commands
//!
//! Implements `check`, `once` and `run`.

use std::sync::Arc;

use crate::backup::{validate, BackupScheduler, CycleOutcome};
use crate::config::{BackupConfig, BackupPaths};
use crate::error::BackupResult;
use crate::events::render::{render_lines, StatusReport};
use crate::events::EventLog;

use super::settings::{open_store, resolve_config, ConfigOverrides};

/// Build the scheduler and the event log it records to
fn scheduler_for(
    config: BackupConfig,
    paths: &BackupPaths,
) -> BackupResult<(BackupScheduler, EventLog)> {
    let events = EventLog::new(config.error_capacity, config.notice_capacity)?;
    let store = Arc::new(open_store(&config, paths)?);
    Ok((BackupScheduler::new(config, store, events.clone()), events))
}

/// Validate the configuration against the filesystem and the bucket
pub fn handle_check(paths: &BackupPaths, overrides: &ConfigOverrides) -> BackupResult<()> {
    let config = resolve_config(paths, overrides)?;
    let store = open_store(&config, paths)?;
    let config = validate(config, &store)?;

    println!("Configuration OK");
    println!(
        "Backing up {} to {}/{}",
        config.local_directory.display(),
        config.bucket,
        config.remote_prefix
    );
    Ok(())
}

/// Run a single cycle and print the event log
pub fn handle_once(
    paths: &BackupPaths,
    overrides: &ConfigOverrides,
    json: bool,
) -> BackupResult<CycleOutcome> {
    let config = resolve_config(paths, overrides)?;
    let (scheduler, events) = scheduler_for(config, paths)?;

    let outcome = scheduler
        .run_for(1)?
        .pop()
        .unwrap_or(CycleOutcome::Failed {
            stage: "schedule",
            reason: "no cycle ran".into(),
        });

    if json {
        println!("{}", serde_json::to_string_pretty(&StatusReport::capture(&events))?);
    } else {
        let lines = render_lines(&events);
        if lines.is_empty() {
            println!("No events recorded.");
        }
        for line in lines {
            println!("{}", line);
        }
    }

    Ok(outcome)
}

/// Validate, then back up every interval until the process is stopped
pub fn handle_run(paths: &BackupPaths, overrides: &ConfigOverrides) -> BackupResult<()> {
    let config = resolve_config(paths, overrides)?;
    let (scheduler, _events) = scheduler_for(config, paths)?;

    let never = scheduler.run()?;
    match never {}
}
