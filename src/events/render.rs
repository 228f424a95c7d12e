//! Text and JSON renderings of the event log for status output

use serde::Serialize;

use super::event::TimestampedEvent;
use super::log::{Channel, EventLog};

const LINE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format one event as `<time> E: <message>` or `<time> N: <message>`
pub fn format_line(channel: Channel, event: &TimestampedEvent) -> String {
    format!(
        "{} {}: {}",
        event.timestamp.format(LINE_TIME_FORMAT),
        channel.tag(),
        event.message
    )
}

/// Interleave both channels into one newest-first list of lines
///
/// Ties on timestamp keep errors ahead of notices.
pub fn render_lines(log: &EventLog) -> Vec<String> {
    let mut tagged: Vec<(Channel, _)> = log
        .errors_snapshot()
        .into_iter()
        .map(|e| (Channel::Error, e))
        .chain(
            log.notices_snapshot()
                .into_iter()
                .map(|e| (Channel::Notice, e)),
        )
        .collect();

    // Stable sort: each channel is already newest-first
    tagged.sort_by(|a, b| b.1.timestamp.cmp(&a.1.timestamp));

    tagged
        .iter()
        .map(|(channel, event)| format_line(*channel, event))
        .collect()
}

/// Serializable view of both channels
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub errors: Vec<TimestampedEvent>,
    pub notices: Vec<TimestampedEvent>,
}

impl StatusReport {
    /// Capture the current contents of the log
    pub fn capture(log: &EventLog) -> Self {
        Self {
            errors: log.errors_snapshot().iter().map(|e| (**e).clone()).collect(),
            notices: log.notices_snapshot().iter().map(|e| (**e).clone()).collect(),
        }
    }

    /// Check if both channels are empty
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.notices.is_empty()
    }
}
