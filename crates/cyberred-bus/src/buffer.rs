//! Bounded local buffer for publishes made while disconnected from the
//! bus. Drained FIFO on reconnect; entries older than `max_age` are
//! dropped rather than retried, and the buffer never grows past
//! `max_count` (oldest entries are evicted first).

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde_json::Value;

struct Entry {
    channel: String,
    message: Value,
    enqueued_at: Instant,
}

pub struct MessageBuffer {
    entries: VecDeque<Entry>,
    max_count: usize,
    max_age: Duration,
}

impl MessageBuffer {
    pub fn new(max_count: usize, max_age: Duration) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_count.min(1024)),
            max_count,
            max_age,
        }
    }

    pub fn push(&mut self, channel: String, message: Value) {
        if self.entries.len() >= self.max_count {
            self.entries.pop_front();
        }
        self.entries.push_back(Entry {
            channel,
            message,
            enqueued_at: Instant::now(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drain all non-expired entries in FIFO order, discarding expired
    /// ones along the way.
    pub fn drain(&mut self) -> Vec<(String, Value)> {
        let max_age = self.max_age;
        self.entries
            .drain(..)
            .filter(|entry| entry.enqueued_at.elapsed() <= max_age)
            .map(|entry| (entry.channel, entry.message))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread::sleep;

    #[test]
    fn evicts_oldest_when_over_capacity() {
        let mut buffer = MessageBuffer::new(2, Duration::from_secs(60));
        buffer.push("c1".into(), json!(1));
        buffer.push("c2".into(), json!(2));
        buffer.push("c3".into(), json!(3));
        assert_eq!(buffer.len(), 2);
        let drained = buffer.drain();
        assert_eq!(drained[0].1, json!(2));
        assert_eq!(drained[1].1, json!(3));
    }

    #[test]
    fn drops_expired_entries_on_drain() {
        let mut buffer = MessageBuffer::new(10, Duration::from_millis(10));
        buffer.push("c1".into(), json!("stale"));
        sleep(Duration::from_millis(30));
        buffer.push("c2".into(), json!("fresh"));
        let drained = buffer.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].1, json!("fresh"));
    }

    #[test]
    fn drain_empties_the_buffer() {
        let mut buffer = MessageBuffer::new(10, Duration::from_secs(60));
        buffer.push("c1".into(), json!(1));
        buffer.drain();
        assert!(buffer.is_empty());
    }
}
