//! # Trellis Segments
//!
//! Tracks server-rendered segments in the page tree and applies change sets
//! to it.
//!
//! - [`SegmentStore`]: segment table, ownership tags and the tree patcher
//! - [`ChangePipeline`]: ordered application of one [`ChangeSet`](trellis_protocol::ChangeSet)
//! - [`ScriptRegistry`]: handlers for server-named behaviour scripts

pub mod error;
pub mod markers;
pub mod pipeline;
pub mod scripts;
pub mod segment;
pub mod store;

pub use error::{ScriptError, SegmentError, SegmentResult};
pub use markers::MarkerConfig;
pub use pipeline::{ChangePipeline, PipelineReport};
pub use scripts::{ScriptContext, ScriptHandler, ScriptRegistry, ScriptTarget};
pub use segment::{NodeRange, Segment, SegmentTags};
pub use store::{inner_nodes, SegmentStore};
