//! Event data structure

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single recorded message and when it was recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampedEvent {
    /// When the event was recorded (UTC)
    pub timestamp: DateTime<Utc>,
    /// Human-readable message
    pub message: String,
}

impl TimestampedEvent {
    /// Create an event stamped with the current time
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
        }
    }

    /// Create an event with an explicit timestamp
    pub fn at(timestamp: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for TimestampedEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.message
        )
    }
}
