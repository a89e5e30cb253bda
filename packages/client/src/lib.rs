//! # Trellis Client
//!
//! The per-page session engine for server-driven pages.
//!
//! The server renders the page as segments and pushes change sets; the
//! [`Engine`] applies them to its tree and sends user events back through a
//! bounded window. Embedders plug in a [`Transport`] for the wire and a
//! [`Host`] for page-level effects (navigation, modals, dependencies,
//! alerts).
//!
//! With the `runtime` feature, [`run_session`] drives an engine from a
//! tokio task.

pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod navigation;
pub mod recording;
#[cfg(feature = "runtime")]
pub mod runtime;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use host::{Host, Modal, Transport};
pub use navigation::{resolve_reload, Navigation};
pub use recording::{RecordingHost, RecordingTransport};
#[cfg(feature = "runtime")]
pub use runtime::{run_session, ChannelTransport, SessionSummary};
