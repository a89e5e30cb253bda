//! Coalescing of high-frequency events
//!
//! Only the latest value per (segment, event name) is kept. Each enqueue
//! re-arms a single deadline; when it passes the whole queue is flushed.

use indexmap::IndexMap;
use serde_json::Value;
use std::time::Duration;
use trellis_protocol::EventRecord;

/// Builds the event payload at flush time
pub type EventProducer = Box<dyn FnOnce() -> Value + Send>;

pub struct CoalescingQueue {
    delay: Duration,
    queued: IndexMap<(String, String), EventProducer>,
    deadline: Option<Duration>,
}

impl CoalescingQueue {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            queued: IndexMap::new(),
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Queue `producer` for the key, superseding any earlier one. The key
    /// keeps the position of its first enqueue.
    pub fn enqueue(
        &mut self,
        segment_id: &str,
        event_name: &str,
        producer: EventProducer,
        now: Duration,
    ) {
        self.queued
            .insert((segment_id.to_string(), event_name.to_string()), producer);
        self.deadline = Some(now.saturating_add(self.delay));
    }

    pub fn is_due(&self, now: Duration) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Empty the queue, running each producer, and cancel the deadline
    pub fn drain(&mut self) -> Vec<EventRecord> {
        self.deadline = None;
        self.queued
            .drain(..)
            .map(|((segment_id, event_name), producer)| {
                EventRecord::segment(segment_id, event_name, producer())
            })
            .collect()
    }

    /// Drop everything queued without producing events
    pub fn clear(&mut self) {
        self.deadline = None;
        self.queued.clear();
    }
}

impl std::fmt::Debug for CoalescingQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoalescingQueue")
            .field("delay", &self.delay)
            .field("keys", &self.queued.keys().collect::<Vec<_>>())
            .field("deadline", &self.deadline)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn value(v: Value) -> EventProducer {
        Box::new(move || v)
    }

    #[test]
    fn test_latest_producer_wins_and_keeps_position() {
        let mut queue = CoalescingQueue::new(Duration::from_secs(1));
        queue.enqueue("slider", "value", value(json!(1)), Duration::ZERO);
        queue.enqueue("text", "value", value(json!("a")), Duration::from_millis(100));
        queue.enqueue("slider", "value", value(json!(2)), Duration::from_millis(200));

        let events = queue.drain();
        assert_eq!(
            events,
            vec![
                EventRecord::segment("slider", "value", json!(2)),
                EventRecord::segment("text", "value", json!("a")),
            ]
        );
        assert_eq!(queue.deadline(), None);
    }

    #[test]
    fn test_deadline_rearms() {
        let mut queue = CoalescingQueue::new(Duration::from_secs(1));
        queue.enqueue("s", "drag", value(json!(0)), Duration::ZERO);
        assert!(queue.is_due(Duration::from_secs(1)));

        queue.enqueue("s", "drag", value(json!(1)), Duration::from_millis(900));
        assert!(!queue.is_due(Duration::from_secs(1)));
        assert!(queue.is_due(Duration::from_millis(1900)));
    }

    #[test]
    fn test_clear_cancels() {
        let mut queue = CoalescingQueue::new(Duration::from_secs(1));
        queue.enqueue("s", "drag", value(json!(0)), Duration::ZERO);
        queue.clear();
        assert!(queue.is_empty());
        assert!(!queue.is_due(Duration::from_secs(10)));
    }
}
