//! # Flow Control
//!
//! Sliding window over outbound event blocks.
//!
//! ## Design
//!
//! - At most `max_inflight` blocks are unacknowledged at any time
//! - Events sent while the window is closed, or while a server batch is
//!   being applied, wait in a pending buffer
//! - Any inbound batch acknowledges everything sent so far
//! - When a batch finishes, the pending buffer goes out as one block
//!
//! The state machine performs no I/O: every operation that may transmit
//! returns the [`OutboundBlock`] for the caller to hand to its transport.

use tracing::debug;
use trellis_protocol::{EventRecord, OutboundBlock};

#[derive(Debug, Clone)]
pub struct FlowControl {
    max_inflight: u32,
    unacknowledged: u32,
    next_sequence: u64,
    pending: Vec<EventRecord>,
    receiving: bool,
}

impl FlowControl {
    /// A window of zero is treated as one
    pub fn new(max_inflight: u32) -> Self {
        Self {
            max_inflight: max_inflight.max(1),
            unacknowledged: 0,
            next_sequence: 0,
            pending: Vec::new(),
            receiving: false,
        }
    }

    pub fn max_inflight(&self) -> u32 {
        self.max_inflight
    }

    pub fn unacknowledged(&self) -> u32 {
        self.unacknowledged
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_receiving(&self) -> bool {
        self.receiving
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Send `events`, buffered behind anything already pending.
    ///
    /// Returns the block to transmit, or `None` if the events were buffered
    /// or there was nothing to send.
    pub fn send_events(&mut self, events: Vec<EventRecord>) -> Option<OutboundBlock> {
        if self.unacknowledged >= self.max_inflight || self.receiving {
            debug!(
                buffered = events.len(),
                unacknowledged = self.unacknowledged,
                receiving = self.receiving,
                "send window closed"
            );
            self.pending.extend(events);
            return None;
        }

        let mut messages = std::mem::take(&mut self.pending);
        messages.extend(events);
        if messages.is_empty() {
            return None;
        }

        self.unacknowledged += 1;
        let id = self.next_sequence;
        self.next_sequence += 1;

        Some(OutboundBlock {
            id,
            messages,
            ack_immediately: self.unacknowledged >= self.max_inflight,
        })
    }

    /// An inbound batch arrived: acknowledge and close the window
    pub fn begin_receive(&mut self) {
        self.unacknowledged = 0;
        self.receiving = true;
    }

    /// The batch is applied; flush whatever queued up meanwhile
    pub fn end_receive(&mut self) -> Option<OutboundBlock> {
        self.receiving = false;
        if self.pending.is_empty() {
            None
        } else {
            self.send_events(Vec::new())
        }
    }
}

impl Default for FlowControl {
    fn default() -> Self {
        Self::new(1)
    }
}
