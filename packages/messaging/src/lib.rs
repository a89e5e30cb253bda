//! # Trellis Messaging
//!
//! Everything between the page and the wire that is not tree work:
//!
//! - [`FlowControl`]: bounded window of unacknowledged outbound blocks
//! - [`CoalescingQueue`]: latest-value-wins queue for noisy events
//! - [`DeterministicClock`]: host-advanced time for timers
//! - [`ResourceRegistry`]: fetchable and channel resources with listeners
//! - [`AlertStack`]: paged user notifications

pub mod alerts;
pub mod clock;
pub mod coalesce;
pub mod error;
pub mod flow;
pub mod resources;

pub use alerts::{Alert, AlertBody, AlertStack};
pub use clock::DeterministicClock;
pub use coalesce::{CoalescingQueue, EventProducer};
pub use error::{ResourceError, ResourceResult};
pub use flow::FlowControl;
pub use resources::{
    FetchFormat, FetchRequest, Listener, ListenerId, ResourceKind, ResourceRegistry,
};
