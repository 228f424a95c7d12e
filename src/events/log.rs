//! Two-channel operational event log
//!
//! Pairs an error channel and a notice channel, each its own ring buffer.
//! The log is a cheap clonable handle: every component that records events
//! receives one explicitly instead of reaching for global state.

use std::sync::Arc;

use super::event::TimestampedEvent;
use super::ring::RingEventBuffer;
use crate::error::BackupResult;

/// Default number of errors retained
pub const DEFAULT_ERROR_CAPACITY: usize = 32;

/// Default number of notices retained
pub const DEFAULT_NOTICE_CAPACITY: usize = 128;

/// Which channel an event was recorded on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Error,
    Notice,
}

impl Channel {
    /// Single-letter tag used in text renderings
    pub fn tag(&self) -> char {
        match self {
            Self::Error => 'E',
            Self::Notice => 'N',
        }
    }
}

#[derive(Debug)]
struct Channels {
    errors: RingEventBuffer,
    notices: RingEventBuffer,
}

/// Shared handle to the error and notice channels
#[derive(Debug, Clone)]
pub struct EventLog {
    inner: Arc<Channels>,
}

impl EventLog {
    /// Create a log with independent capacities for each channel
    pub fn new(error_capacity: usize, notice_capacity: usize) -> BackupResult<Self> {
        Ok(Self {
            inner: Arc::new(Channels {
                errors: RingEventBuffer::new(error_capacity)?,
                notices: RingEventBuffer::new(notice_capacity)?,
            }),
        })
    }

    /// Record an error event
    pub fn record_error(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{}", message);
        self.inner.errors.add(message);
    }

    /// Record a notice event
    pub fn record_notice(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{}", message);
        self.inner.notices.add(message);
    }

    /// Errors, most recent first
    pub fn errors_snapshot(&self) -> Vec<Arc<TimestampedEvent>> {
        self.inner.errors.ordered_snapshot()
    }

    /// Notices, most recent first
    pub fn notices_snapshot(&self) -> Vec<Arc<TimestampedEvent>> {
        self.inner.notices.ordered_snapshot()
    }

    /// Snapshot of one channel
    pub fn snapshot(&self, channel: Channel) -> Vec<Arc<TimestampedEvent>> {
        match channel {
            Channel::Error => self.errors_snapshot(),
            Channel::Notice => self.notices_snapshot(),
        }
    }
}
