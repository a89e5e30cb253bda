//! # Trellis Protocol
//!
//! Records exchanged between the client engine and the application server.
//! Wire encoding is the transport's concern; these types define field sets
//! and their JSON shape.

pub mod changes;
pub mod error;
pub mod events;
pub mod messages;

pub use changes::{ChangeSet, NodeScripts, PopupScripts, ScriptCall};
pub use error::ProtocolError;
pub use events::{names, EventRecord, OutboundBlock};
pub use messages::{
    EventErrorReport, ModelFixSet, ReloadRequest, ReportedFix, ReportedFixKind,
    ResourceErrorReport, ResourceMessage, ServerMessage, UpdateErrorReport, MESSAGE_TYPES,
};
