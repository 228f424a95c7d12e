//! Operational event history for bucket-backup
//!
//! Keeps a rolling, in-memory record of errors and notices so an operator
//! can see what the backup loop has been doing. Nothing here is persisted:
//! the history is lost on restart.
//!
//! # Architecture
//!
//! - `TimestampedEvent`: a message and the instant it was recorded
//! - `RingEventBuffer`: fixed-capacity store that overwrites the oldest
//!   event and returns snapshots newest first
//! - `EventLog`: an error channel and a notice channel behind a clonable
//!   handle shared by the backup loop and anything else that records events
//! - `render`: `<time> E: <msg>` / `<time> N: <msg>` lines and JSON reports
//!
//! # Example
//!
//! ```rust,ignore
//! use bucket_backup::events::EventLog;
//!
//! let log = EventLog::new(32, 128)?;
//! log.record_notice("backup skipped, content unchanged");
//! for event in log.notices_snapshot() {
//!     println!("{}", event);
//! }
//! ```

mod event;
mod log;
pub mod render;
mod ring;

pub use event::TimestampedEvent;
pub use log::{Channel, EventLog, DEFAULT_ERROR_CAPACITY, DEFAULT_NOTICE_CAPACITY};
pub use render::StatusReport;
pub use ring::RingEventBuffer;
