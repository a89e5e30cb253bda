//! Change sets carried by `modify_page`

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A server-chosen callback plus its structured arguments.
///
/// The callback id names a handler the embedding application registered on
/// the client; no code is shipped over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptCall {
    pub callback: String,
    #[serde(default)]
    pub args: Value,
}

impl ScriptCall {
    pub fn new(callback: impl Into<String>, args: Value) -> Self {
        Self {
            callback: callback.into(),
            args,
        }
    }
}

/// `[segment_id, [script, ...]]`: scripts run against each node of a segment
pub type NodeScripts = Vec<(String, Vec<ScriptCall>)>;

/// `[segment_id, script]`: scripts run against a popup's content
pub type PopupScripts = Vec<(String, ScriptCall)>;

/// One ordered batch of tree mutations.
///
/// Fields are applied in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChangeSet {
    pub shutdown_scripts: NodeScripts,
    pub removed: Vec<String>,
    /// `[segment_id, markup]`
    pub modified: Vec<(String, String)>,
    /// `[segment_id, markup]`
    pub popups: Vec<(String, String)>,
    pub popup_scripts: PopupScripts,
    pub initialise_scripts: NodeScripts,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.shutdown_scripts.is_empty()
            && self.removed.is_empty()
            && self.modified.is_empty()
            && self.popups.is_empty()
            && self.popup_scripts.is_empty()
            && self.initialise_scripts.is_empty()
    }
}
