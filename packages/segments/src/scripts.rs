//! Client-side behaviour scripts
//!
//! The server refers to scripts by callback id. Hosts register a handler
//! for each id up front; a handler runs against a [`ScriptContext`] that
//! exposes the tree, segment lookups and an outbox for events.

use crate::error::ScriptError;
use crate::segment::SegmentTags;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use trellis_dom::{NodeId, Tree};
use trellis_protocol::{EventRecord, ScriptCall};

pub type ScriptHandler =
    Box<dyn FnMut(&mut ScriptContext<'_>, &Value) -> Result<(), ScriptError> + Send>;

/// What a script runs against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptTarget {
    /// One node inside a segment, markers excluded
    Node(NodeId),
    /// A popup segment, with every node of its run
    Popup { popup_id: String, nodes: Vec<NodeId> },
    Document,
}

pub struct ScriptContext<'a> {
    pub tree: &'a mut Tree,
    tags: &'a SegmentTags,
    outbox: &'a mut Vec<EventRecord>,
    target: ScriptTarget,
}

impl<'a> ScriptContext<'a> {
    pub fn new(
        tree: &'a mut Tree,
        tags: &'a SegmentTags,
        outbox: &'a mut Vec<EventRecord>,
        target: ScriptTarget,
    ) -> Self {
        Self {
            tree,
            tags,
            outbox,
            target,
        }
    }

    pub fn target(&self) -> &ScriptTarget {
        &self.target
    }

    pub fn node(&self) -> Option<NodeId> {
        match self.target {
            ScriptTarget::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn popup_id(&self) -> Option<&str> {
        match &self.target {
            ScriptTarget::Popup { popup_id, .. } => Some(popup_id),
            _ => None,
        }
    }

    pub fn segment_id_for_node(&self, node: NodeId) -> Option<&str> {
        self.tags.segment_id_for_node(self.tree, node)
    }

    /// Queue an event from the segment owning `node`.
    ///
    /// Returns false when the node belongs to no segment.
    pub fn post_event(&mut self, node: NodeId, event_name: &str, data: Value) -> bool {
        let Some(segment_id) = self.tags.segment_id_for_node(self.tree, node) else {
            tracing::warn!(event_name, "event raised outside of any segment");
            return false;
        };
        self.outbox
            .push(EventRecord::segment(segment_id, event_name, data));
        true
    }

    pub fn post_document_event(&mut self, event_name: &str, data: Value) {
        self.outbox.push(EventRecord::document(event_name, data));
    }
}

#[derive(Default)]
pub struct ScriptRegistry {
    handlers: HashMap<String, ScriptHandler>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, callback: impl Into<String>, handler: F)
    where
        F: FnMut(&mut ScriptContext<'_>, &Value) -> Result<(), ScriptError> + Send + 'static,
    {
        self.handlers.insert(callback.into(), Box::new(handler));
    }

    pub fn unregister(&mut self, callback: &str) -> bool {
        self.handlers.remove(callback).is_some()
    }

    pub fn contains(&self, callback: &str) -> bool {
        self.handlers.contains_key(callback)
    }

    /// Run one call. A panicking handler is reported as an error.
    pub fn invoke(&mut self, call: &ScriptCall, cx: &mut ScriptContext<'_>) -> Result<(), ScriptError> {
        let handler = self
            .handlers
            .get_mut(&call.callback)
            .ok_or_else(|| ScriptError::UnknownCallback(call.callback.clone()))?;

        match catch_unwind(AssertUnwindSafe(|| handler(cx, &call.args))) {
            Ok(result) => result,
            Err(_) => Err(ScriptError::Panicked(call.callback.clone())),
        }
    }
}

impl std::fmt::Debug for ScriptRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptRegistry")
            .field("callbacks", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use trellis_dom::Element;

    #[test]
    fn test_invoke_passes_args_and_target() {
        let mut tree = Tree::new();
        let node = tree.create_element(Element::new("input"));
        let mut tags = SegmentTags::new();
        tags.tag(node, "s1");
        let mut outbox = Vec::new();

        let mut registry = ScriptRegistry::new();
        registry.register("focus", |cx, args| {
            let node = cx.node().ok_or_else(|| ScriptError::failed("no node"))?;
            let name = args["event"].as_str().unwrap_or("focused");
            cx.post_event(node, name, json!(null));
            Ok(())
        });

        let mut cx = ScriptContext::new(&mut tree, &tags, &mut outbox, ScriptTarget::Node(node));
        registry
            .invoke(&ScriptCall::new("focus", json!({"event": "got_focus"})), &mut cx)
            .unwrap();

        assert_eq!(outbox, vec![EventRecord::segment("s1", "got_focus", json!(null))]);
    }

    #[test]
    fn test_unknown_callback() {
        let mut tree = Tree::new();
        let tags = SegmentTags::new();
        let mut outbox = Vec::new();
        let mut cx = ScriptContext::new(&mut tree, &tags, &mut outbox, ScriptTarget::Document);

        let error = ScriptRegistry::new()
            .invoke(&ScriptCall::new("missing", json!(null)), &mut cx)
            .unwrap_err();
        assert_eq!(error, ScriptError::UnknownCallback("missing".into()));
    }

    #[test]
    fn test_panicking_handler_is_contained() {
        let mut tree = Tree::new();
        let tags = SegmentTags::new();
        let mut outbox = Vec::new();
        let mut cx = ScriptContext::new(&mut tree, &tags, &mut outbox, ScriptTarget::Document);

        let mut registry = ScriptRegistry::new();
        registry.register("explode", |_, _| panic!("boom"));

        let error = registry
            .invoke(&ScriptCall::new("explode", json!(null)), &mut cx)
            .unwrap_err();
        assert_eq!(error, ScriptError::Panicked("explode".into()));
    }

    #[test]
    fn test_event_outside_segment_is_dropped() {
        let mut tree = Tree::new();
        let node = tree.create_text("loose");
        let tags = SegmentTags::new();
        let mut outbox = Vec::new();
        let mut cx = ScriptContext::new(&mut tree, &tags, &mut outbox, ScriptTarget::Document);

        assert!(!cx.post_event(node, "click", json!(null)));
        cx.post_document_event("ready", json!(1));
        assert_eq!(outbox, vec![EventRecord::document("ready", json!(1))]);
    }
}
