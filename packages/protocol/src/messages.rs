//! Server → client messages

use crate::changes::{ChangeSet, ScriptCall};
use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Every msgtype the client understands, in dispatch-table order
pub const MESSAGE_TYPES: &[&str] = &[
    "modify_page",
    "execute_js",
    "add_dependencies",
    "resource_messages",
    "resources_disposed",
    "invalid_page",
    "reload_page",
    "error_handling_event",
    "error_retrieving_resource",
    "error_during_update",
    "html_structure_fixes",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msgtype", rename_all = "snake_case")]
pub enum ServerMessage {
    ModifyPage {
        changes: ChangeSet,
    },

    /// Run one registered callback against the whole document
    ExecuteJs {
        script: ScriptCall,
    },

    AddDependencies {
        deps: Vec<String>,
    },

    ResourceMessages {
        messages: Vec<ResourceMessage>,
    },

    #[serde(rename_all = "camelCase")]
    ResourcesDisposed {
        resource_ids: Vec<String>,
    },

    /// The server no longer knows this session
    InvalidPage,

    ReloadPage(ReloadRequest),

    ErrorHandlingEvent(EventErrorReport),

    ErrorRetrievingResource(ResourceErrorReport),

    ErrorDuringUpdate(UpdateErrorReport),

    #[serde(rename_all = "camelCase")]
    HtmlStructureFixes {
        fixes_by_model: Vec<ModelFixSet>,
    },
}

impl ServerMessage {
    /// Decode one inbound message, distinguishing an unknown msgtype from a
    /// known one with a bad payload.
    pub fn decode(value: Value) -> Result<Self, ProtocolError> {
        let msgtype = value
            .get("msgtype")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingMessageType)?
            .to_string();

        if !MESSAGE_TYPES.contains(&msgtype.as_str()) {
            return Err(ProtocolError::UnrecognisedMessage(msgtype));
        }

        serde_json::from_value(value).map_err(|source| ProtocolError::Malformed { msgtype, source })
    }

    pub fn msgtype(&self) -> &'static str {
        match self {
            ServerMessage::ModifyPage { .. } => "modify_page",
            ServerMessage::ExecuteJs { .. } => "execute_js",
            ServerMessage::AddDependencies { .. } => "add_dependencies",
            ServerMessage::ResourceMessages { .. } => "resource_messages",
            ServerMessage::ResourcesDisposed { .. } => "resources_disposed",
            ServerMessage::InvalidPage => "invalid_page",
            ServerMessage::ReloadPage(_) => "reload_page",
            ServerMessage::ErrorHandlingEvent(_) => "error_handling_event",
            ServerMessage::ErrorRetrievingResource(_) => "error_retrieving_resource",
            ServerMessage::ErrorDuringUpdate(_) => "error_during_update",
            ServerMessage::HtmlStructureFixes { .. } => "html_structure_fixes",
        }
    }
}

/// A message addressed to one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMessage {
    pub resource_id: String,
    pub message: Value,
}

/// Where to navigate. Absent parts default to the current location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReloadRequest {
    pub location: Option<String>,
    pub get_params: Option<BTreeMap<String, Value>>,
}

impl ReloadRequest {
    /// Neither part given: a plain reload of the current page
    pub fn is_plain_reload(&self) -> bool {
        self.location.is_none() && self.get_params.is_none()
    }
}

/// The server failed while handling an event the client sent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventErrorReport {
    pub event_name: String,
    /// `None` for document-level events
    #[serde(default)]
    pub event_seg_id: Option<String>,
    #[serde(default)]
    pub handler_seg_id: Option<String>,
    #[serde(default)]
    pub event_model_type_name: Option<String>,
    #[serde(default)]
    pub handler_model_type_name: Option<String>,
    pub err_html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceErrorReport {
    #[serde(default)]
    pub rsc_seg_id: Option<String>,
    #[serde(default)]
    pub rsc_model_type_name: Option<String>,
    pub err_html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateErrorReport {
    pub err_html: String,
}

/// Markup repairs the server made while rendering one model type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelFixSet {
    pub model_type_name: String,
    pub fixes: Vec<ReportedFix>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedFix {
    pub fix_type: ReportedFixKind,
    pub tag: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportedFixKind {
    CloseUnclosedTag,
    DropCloseTagWithNoMatchingOpenTag,
}
