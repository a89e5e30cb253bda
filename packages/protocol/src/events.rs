//! Client → server records

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Document-level event names the client itself emits
pub mod names {
    /// Segment ids whose begin/end markers could not be matched
    pub const BROKEN_HTML_STRUCTURE: &str = "broken_html_structure";
    /// Payload `{resource_id, message}` addressed to a server-side resource
    pub const RESOURCE_MESSAGE: &str = "resource_message";
    pub const NOTIFY_POPUP_CLOSED: &str = "notify_popup_closed";
    pub const CLOSE_PAGE: &str = "close_page";
}

/// One user or client event, addressed to a segment or to the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msgtype", rename = "event", rename_all = "camelCase")]
pub struct EventRecord {
    /// `None` addresses the document rather than a segment
    pub segment_id: Option<String>,
    pub event_name: String,
    #[serde(default)]
    pub data: Value,
}

impl EventRecord {
    pub fn segment(segment_id: impl Into<String>, event_name: impl Into<String>, data: Value) -> Self {
        Self {
            segment_id: Some(segment_id.into()),
            event_name: event_name.into(),
            data,
        }
    }

    pub fn document(event_name: impl Into<String>, data: Value) -> Self {
        Self {
            segment_id: None,
            event_name: event_name.into(),
            data,
        }
    }

    pub fn is_document_event(&self) -> bool {
        self.segment_id.is_none()
    }
}

/// Sequence-numbered unit handed to the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundBlock {
    pub id: u64,
    pub messages: Vec<EventRecord>,
    /// Set when this block fills the flow-control window
    pub ack_immediately: bool,
}
