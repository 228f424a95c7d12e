//! Fixed-capacity event ring buffer
//!
//! Stores the most recent events in a preallocated slot array. Once every
//! slot is used the oldest event is overwritten. Snapshots come back newest
//! first.

use std::sync::Arc;

use parking_lot::Mutex;

use super::event::TimestampedEvent;
use crate::error::{BackupError, BackupResult};

struct RingState {
    slots: Vec<Option<Arc<TimestampedEvent>>>,
    /// Next slot to write; always in `[0, capacity)`
    write_cursor: usize,
    /// Set once the cursor has wrapped; every slot then holds an event
    is_full: bool,
}

/// Bounded event store with overwrite-oldest semantics
///
/// `add` and `ordered_snapshot` take the same lock, so concurrent writers
/// never corrupt the cursor and readers never see a half-written slot.
pub struct RingEventBuffer {
    capacity: usize,
    state: Mutex<RingState>,
}

impl RingEventBuffer {
    /// Create a buffer holding at most `capacity` events
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `capacity` is zero.
    pub fn new(capacity: usize) -> BackupResult<Self> {
        if capacity == 0 {
            return Err(BackupError::InvalidConfig(
                "event buffer capacity must be at least 1".into(),
            ));
        }

        Ok(Self {
            capacity,
            state: Mutex::new(RingState {
                slots: vec![None; capacity],
                write_cursor: 0,
                is_full: false,
            }),
        })
    }

    /// Record a message stamped with the current time
    pub fn add(&self, message: impl Into<String>) {
        let event = Arc::new(TimestampedEvent::now(message));

        let mut state = self.state.lock();
        let cursor = state.write_cursor;
        state.slots[cursor] = Some(event);

        if cursor + 1 == self.capacity {
            state.write_cursor = 0;
            state.is_full = true;
        } else {
            state.write_cursor = cursor + 1;
        }
    }

    /// Return the stored events, most recent first
    ///
    /// Walks backward from the slot before the write cursor, wrapping around
    /// the slot array, so ordering holds wherever the cursor sits.
    pub fn ordered_snapshot(&self) -> Vec<Arc<TimestampedEvent>> {
        let state = self.state.lock();
        let size = if state.is_full {
            self.capacity
        } else {
            state.write_cursor
        };

        (0..size)
            .filter_map(|i| {
                let index = (state.write_cursor + self.capacity - 1 - i) % self.capacity;
                state.slots[index].clone()
            })
            .collect()
    }

    /// Maximum number of events retained
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of events currently retained
    pub fn len(&self) -> usize {
        let state = self.state.lock();
        if state.is_full {
            self.capacity
        } else {
            state.write_cursor
        }
    }

    /// Check if nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if the buffer has wrapped at least once
    pub fn is_full(&self) -> bool {
        self.state.lock().is_full
    }
}

impl std::fmt::Debug for RingEventBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingEventBuffer")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn messages(buffer: &RingEventBuffer) -> Vec<String> {
        buffer
            .ordered_snapshot()
            .iter()
            .map(|e| e.message.clone())
            .collect()
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = RingEventBuffer::new(0).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_empty_snapshot() {
        let buffer = RingEventBuffer::new(4).unwrap();
        assert!(buffer.ordered_snapshot().is_empty());
        assert!(buffer.is_empty());
        assert!(!buffer.is_full());
    }

    #[test]
    fn test_partial_fill_newest_first() {
        let buffer = RingEventBuffer::new(5).unwrap();
        buffer.add("a");
        buffer.add("b");
        buffer.add("c");

        assert_eq!(messages(&buffer), vec!["c", "b", "a"]);
        assert_eq!(buffer.len(), 3);
        assert!(!buffer.is_full());
    }

    #[test]
    fn test_exact_fill() {
        let buffer = RingEventBuffer::new(3).unwrap();
        buffer.add("a");
        buffer.add("b");
        buffer.add("c");

        assert!(buffer.is_full());
        assert_eq!(messages(&buffer), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_wraparound_keeps_newest() {
        let buffer = RingEventBuffer::new(3).unwrap();
        for m in ["a", "b", "c", "d"] {
            buffer.add(m);
        }

        assert_eq!(messages(&buffer), vec!["d", "c", "b"]);
    }

    #[test]
    fn test_many_wraps() {
        let buffer = RingEventBuffer::new(4).unwrap();
        for i in 0..23 {
            buffer.add(format!("event {}", i));
        }

        let expected: Vec<String> = (19..23).rev().map(|i| format!("event {}", i)).collect();
        assert_eq!(messages(&buffer), expected);
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn test_every_length_up_to_twice_capacity() {
        let capacity = 5;
        for n in 0..=capacity * 2 {
            let buffer = RingEventBuffer::new(capacity).unwrap();
            for i in 0..n {
                buffer.add(i.to_string());
            }

            let kept = n.min(capacity);
            let expected: Vec<String> = (n - kept..n).rev().map(|i| i.to_string()).collect();
            assert_eq!(messages(&buffer), expected, "after {} adds", n);
        }
    }

    #[test]
    fn test_capacity_one() {
        let buffer = RingEventBuffer::new(1).unwrap();
        buffer.add("first");
        assert!(buffer.is_full());
        assert_eq!(messages(&buffer), vec!["first"]);

        buffer.add("second");
        buffer.add("third");
        assert_eq!(messages(&buffer), vec!["third"]);
    }

    #[test]
    fn test_snapshot_is_idempotent() {
        let buffer = RingEventBuffer::new(3).unwrap();
        for m in ["a", "b", "c", "d", "e"] {
            buffer.add(m);
        }

        let first = buffer.ordered_snapshot();
        let second = buffer.ordered_snapshot();
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert!(Arc::ptr_eq(a, b));
        }
    }

    #[test]
    fn test_snapshot_survives_overwrite() {
        let buffer = RingEventBuffer::new(2).unwrap();
        buffer.add("old");
        let snapshot = buffer.ordered_snapshot();

        buffer.add("x");
        buffer.add("y");

        assert_eq!(snapshot[0].message, "old");
        assert_eq!(messages(&buffer), vec!["y", "x"]);
    }

    #[test]
    fn test_concurrent_writers() {
        let buffer = Arc::new(RingEventBuffer::new(16).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let buffer = Arc::clone(&buffer);
                thread::spawn(move || {
                    for i in 0..250 {
                        buffer.add(format!("{}-{}", t, i));
                        if i % 50 == 0 {
                            let _ = buffer.ordered_snapshot();
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(buffer.is_full());
        let snapshot = buffer.ordered_snapshot();
        assert_eq!(snapshot.len(), 16);

        // Per-writer order is preserved even when writers interleave
        for t in 0..4 {
            let prefix = format!("{}-", t);
            let indices: Vec<u32> = snapshot
                .iter()
                .filter_map(|e| e.message.strip_prefix(&prefix))
                .map(|i| i.parse().unwrap())
                .collect();
            assert!(indices.windows(2).all(|w| w[0] > w[1]));
        }
    }
}
