//! Server-addressable resources
//!
//! A resource is identified by the id the server issued for it. Fetchable
//! resources point at a URL the host can request; channel resources receive
//! pushed messages. Both fan server notifications out to listeners.

use crate::error::{ResourceError, ResourceResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::debug;

/// Handle returned when a listener is added
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Called with `None` when a fetchable resource changed, or with the pushed
/// payload for a channel resource
pub type Listener = Box<dyn FnMut(Option<&Value>) + Send>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    Plain,
    Fetchable { url: String },
    Channel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchFormat {
    String,
    Json,
}

/// A GET the host should perform on behalf of a fetchable resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    pub resource_id: String,
    pub url: String,
    pub format: FetchFormat,
}

struct Resource {
    kind: ResourceKind,
    listeners: IndexMap<ListenerId, Listener>,
}

#[derive(Default)]
pub struct ResourceRegistry {
    resources: HashMap<String, Resource>,
    next_listener: u64,
    fetch_count: u64,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, resource_id: &str) -> bool {
        self.resources.contains_key(resource_id)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn kind(&self, resource_id: &str) -> Option<&ResourceKind> {
        self.resources.get(resource_id).map(|r| &r.kind)
    }

    fn install(&mut self, resource_id: &str, kind: ResourceKind) {
        debug!(resource_id, ?kind, "creating resource");
        self.resources.insert(
            resource_id.to_string(),
            Resource {
                kind,
                listeners: IndexMap::new(),
            },
        );
    }

    pub fn create(&mut self, resource_id: &str) {
        self.install(resource_id, ResourceKind::Plain);
    }

    pub fn create_fetchable(&mut self, resource_id: &str, url: impl Into<String>) {
        self.install(resource_id, ResourceKind::Fetchable { url: url.into() });
    }

    pub fn create_channel(&mut self, resource_id: &str) {
        self.install(resource_id, ResourceKind::Channel);
    }

    pub fn dispose(&mut self, resource_id: &str) -> bool {
        debug!(resource_id, "disposing resource");
        self.resources.remove(resource_id).is_some()
    }

    fn resource_mut(&mut self, resource_id: &str) -> ResourceResult<&mut Resource> {
        self.resources
            .get_mut(resource_id)
            .ok_or_else(|| ResourceError::UnknownResource(resource_id.to_string()))
    }

    pub fn add_listener(&mut self, resource_id: &str, listener: Listener) -> ResourceResult<ListenerId> {
        let id = ListenerId(self.next_listener);
        let resource = self.resource_mut(resource_id)?;
        if resource.kind == ResourceKind::Plain {
            return Err(ResourceError::NoListeners(resource_id.to_string()));
        }
        resource.listeners.insert(id, listener);
        self.next_listener += 1;
        Ok(id)
    }

    pub fn remove_listener(&mut self, resource_id: &str, listener: ListenerId) -> ResourceResult<bool> {
        let resource = self.resource_mut(resource_id)?;
        Ok(resource.listeners.shift_remove(&listener).is_some())
    }

    /// Route a server message to a resource; returns how many listeners ran
    pub fn handle_message(&mut self, resource_id: &str, message: &Value) -> ResourceResult<usize> {
        let resource = self.resource_mut(resource_id)?;
        let msgtype = message.get("msgtype").and_then(Value::as_str);

        let payload = match (&resource.kind, msgtype) {
            (ResourceKind::Fetchable { .. }, Some("modified")) => None,
            (ResourceKind::Channel, Some("message")) => {
                Some(message.get("message").unwrap_or(&Value::Null))
            }
            _ => {
                return Err(ResourceError::UnhandledMessage {
                    resource_id: resource_id.to_string(),
                    msgtype: msgtype.map(str::to_string),
                })
            }
        };

        for listener in resource.listeners.values_mut() {
            listener(payload);
        }
        Ok(resource.listeners.len())
    }

    /// Next request for a fetchable resource. The `_idx` query parameter
    /// counts requests across the registry so no two URLs repeat.
    pub fn fetch_request(&mut self, resource_id: &str, format: FetchFormat) -> ResourceResult<FetchRequest> {
        let url = match self.resources.get(resource_id).map(|r| &r.kind) {
            Some(ResourceKind::Fetchable { url }) => url.clone(),
            Some(_) => return Err(ResourceError::NotFetchable(resource_id.to_string())),
            None => return Err(ResourceError::UnknownResource(resource_id.to_string())),
        };
        let index = self.fetch_count;
        self.fetch_count += 1;

        Ok(FetchRequest {
            resource_id: resource_id.to_string(),
            url: format!("{url}?_idx={index}"),
            format,
        })
    }

    /// Payload of the `resource_message` document event carrying `message`
    /// to the server side of a resource
    pub fn outgoing_message(&self, resource_id: &str, message: Value) -> ResourceResult<Value> {
        if !self.contains(resource_id) {
            return Err(ResourceError::UnknownResource(resource_id.to_string()));
        }
        // The server reads this key from the event data as `resource_id`,
        // unlike the camelCase records it sends.
        Ok(json!({
            "resource_id": resource_id,
            "message": message,
        }))
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field("fetch_count", &self.fetch_count)
            .finish()
    }
}
