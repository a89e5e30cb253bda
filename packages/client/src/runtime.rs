//! Driving an engine from a tokio task
//!
//! Inbound batches arrive on a stream and are applied in order; between
//! batches the driver sleeps until the coalescing deadline so queued events
//! flush on time. Engine time is tokio time since the session started.

use crate::engine::Engine;
use crate::host::{Host, Transport};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tokio_stream::{Stream, StreamExt};
use tracing::{info, warn};
use trellis_protocol::OutboundBlock;

/// Forwards outbound blocks into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    sender: mpsc::UnboundedSender<OutboundBlock>,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundBlock>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Transport for ChannelTransport {
    fn send_block(&mut self, block: OutboundBlock) {
        if self.sender.send(block).is_err() {
            warn!("outbound channel closed, dropping block");
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub batches: usize,
    pub protocol_errors: usize,
}

/// Run until `inbound` ends
pub async fn run_session<T, H, S>(engine: &mut Engine<T, H>, mut inbound: S) -> SessionSummary
where
    T: Transport,
    H: Host,
    S: Stream<Item = Vec<Value>> + Unpin,
{
    let started = Instant::now();
    let mut summary = SessionSummary::default();

    loop {
        let deadline = engine.next_deadline();
        tokio::select! {
            batch = inbound.next() => match batch {
                Some(messages) => {
                    engine.set_clock(started.elapsed());
                    summary.batches += 1;
                    if let Err(failure) = engine.receive_block(messages) {
                        warn!(%failure, "batch halted");
                        summary.protocol_errors += 1;
                    }
                }
                None => break,
            },
            _ = sleep_until(started + deadline.unwrap_or_default()), if deadline.is_some() => {
                engine.set_clock(started.elapsed());
            }
        }
    }

    info!(batches = summary.batches, "session ended");
    summary
}
