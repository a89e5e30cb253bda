//! The boundary between the engine and whatever embeds it

use crate::navigation::Navigation;
use trellis_messaging::AlertStack;
use trellis_protocol::OutboundBlock;
use url::Url;

/// Carries outbound blocks to the server, in the order given
pub trait Transport {
    fn send_block(&mut self, block: OutboundBlock);
}

/// Blocking notifications the user must acknowledge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modal {
    /// The server no longer knows this page. Acknowledging reloads it.
    SessionLost,
    /// The server sent something this client cannot understand
    ProtocolViolation {
        msgtype: Option<String>,
        reason: String,
    },
}

impl Modal {
    pub fn message(&self) -> String {
        match self {
            Modal::SessionLost => {
                "Connection to page lost. Click to reload. (the server may have been restarted)"
                    .to_string()
            }
            Modal::ProtocolViolation { reason, .. } => {
                format!("Client/server protocol mismatch: {reason}")
            }
        }
    }
}

/// Page-level capabilities the engine asks the embedder for
pub trait Host {
    /// Where the page currently is; reloads resolve against this
    fn current_location(&self) -> Url;

    fn navigate(&mut self, navigation: Navigation);

    fn show_modal(&mut self, modal: Modal);

    /// A stylesheet or script reference the page should load
    fn add_dependency(&mut self, dependency: &str);

    fn alerts_changed(&mut self, _alerts: &AlertStack) {}

    /// Milliseconds since the Unix epoch, used to stamp alerts
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
