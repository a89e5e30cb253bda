//! Applying a change set to the page
//!
//! Stages run in a fixed order:
//!
//! 1. shutdown scripts (always run to the end)
//! 2. removals
//! 3. modifications
//! 4. popups
//! 5. placeholder resolution
//! 6. registration of new segments
//! 7. popup scripts
//! 8. initialise scripts

use crate::error::ScriptError;
use crate::scripts::{ScriptContext, ScriptRegistry, ScriptTarget};
use crate::store::{inner_nodes, SegmentStore};
use tracing::{debug, warn};
use trellis_dom::NodeId;
use trellis_protocol::{ChangeSet, EventRecord, NodeScripts, PopupScripts, ScriptCall};

/// What one pipeline run did
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PipelineReport {
    pub removed: Vec<String>,
    pub modified: Vec<String>,
    pub popups: Vec<String>,
    pub placeholders_resolved: usize,
    pub registered: Vec<String>,
    pub scripts_run: usize,
    pub script_failures: Vec<ScriptError>,
    /// Events posted by scripts, in the order they were raised
    pub events: Vec<EventRecord>,
}

pub struct ChangePipeline<'a> {
    store: &'a mut SegmentStore,
    scripts: &'a mut ScriptRegistry,
    report: PipelineReport,
}

impl<'a> ChangePipeline<'a> {
    pub fn new(store: &'a mut SegmentStore, scripts: &'a mut ScriptRegistry) -> Self {
        Self {
            store,
            scripts,
            report: PipelineReport::default(),
        }
    }

    /// Apply every stage of `changes` and hand back the report
    pub fn apply(mut self, changes: &ChangeSet) -> PipelineReport {
        self.run_node_scripts(&changes.shutdown_scripts);
        self.remove_segments(&changes.removed);
        self.modify_segments(&changes.modified);
        let popup_nodes = self.insert_popups(&changes.popups);
        self.resolve_placeholders();
        self.register(&popup_nodes);
        self.run_popup_scripts(&changes.popup_scripts);
        self.run_node_scripts(&changes.initialise_scripts);
        self.finish()
    }

    pub fn finish(self) -> PipelineReport {
        self.report
    }

    pub fn remove_segments(&mut self, segment_ids: &[String]) {
        for segment_id in segment_ids {
            if self.store.dispose_segment(segment_id).is_some() {
                debug!(segment_id = %segment_id, "removed segment");
                self.report.removed.push(segment_id.clone());
            }
        }
    }

    pub fn modify_segments(&mut self, modified: &[(String, String)]) {
        for (segment_id, markup) in modified {
            let Some(old) = self.store.get(segment_id).cloned() else {
                debug!(segment_id = %segment_id, "skipping modification of unknown segment");
                continue;
            };

            let new = match self.store.parse_segment(segment_id, markup) {
                Ok(segment) => segment,
                Err(error) => {
                    warn!(segment_id = %segment_id, %error, "cannot build replacement");
                    continue;
                }
            };
            self.store.mark_initialised(new.start);

            let old_nodes = self.store.nodes(&old);
            match self.store.replace_segment(&old, &new) {
                Ok(placed) => {
                    self.store.untag_nodes(&old_nodes);
                    let new_nodes = self.store.nodes(&placed);
                    self.store.tag_nodes(&new_nodes, segment_id);
                    self.store.insert(segment_id, placed);
                    self.store.reclaim(&old_nodes);
                    self.report.modified.push(segment_id.clone());
                }
                Err(error) => {
                    warn!(segment_id = %segment_id, %error, "cannot replace segment");
                }
            }
        }
    }

    /// Build popup segments off-page; returns all of their nodes
    pub fn insert_popups(&mut self, popups: &[(String, String)]) -> Vec<NodeId> {
        let mut popup_nodes = Vec::new();
        for (popup_id, markup) in popups {
            let segment = match self.store.parse_segment(popup_id, markup) {
                Ok(segment) => segment,
                Err(error) => {
                    warn!(popup_id = %popup_id, %error, "cannot build popup");
                    continue;
                }
            };
            self.store.mark_initialised(segment.start);
            let nodes = self.store.nodes(&segment);
            self.store.tag_nodes(&nodes, popup_id);
            self.store.insert(popup_id, segment);
            popup_nodes.extend(nodes);
            self.report.popups.push(popup_id.clone());
        }
        popup_nodes
    }

    pub fn resolve_placeholders(&mut self) {
        self.report.placeholders_resolved += self.store.resolve_placeholders();
    }

    pub fn register(&mut self, popup_nodes: &[NodeId]) {
        let mut registered = self.store.register_document();
        if !popup_nodes.is_empty() {
            registered.extend(self.store.register_within(popup_nodes));
        }
        self.report.registered.extend(registered);
    }

    /// Run each segment's scripts against the nodes between its markers.
    ///
    /// A segment that is not registered stops the remaining entries.
    pub fn run_node_scripts(&mut self, scripts: &NodeScripts) {
        for (segment_id, calls) in scripts {
            let nodes = match self.store.segment_nodes(segment_id) {
                Ok(nodes) => nodes,
                Err(error) => {
                    warn!(segment_id = %segment_id, %error, "abandoning node scripts");
                    return;
                }
            };
            for &node in inner_nodes(&nodes) {
                for call in calls {
                    self.run_script(call, ScriptTarget::Node(node));
                }
            }
        }
    }

    /// A popup that is not registered stops the remaining entries
    pub fn run_popup_scripts(&mut self, scripts: &PopupScripts) {
        for (popup_id, call) in scripts {
            let nodes = match self.store.segment_nodes(popup_id) {
                Ok(nodes) => nodes,
                Err(error) => {
                    warn!(popup_id = %popup_id, %error, "abandoning popup scripts");
                    return;
                }
            };
            self.run_script(
                call,
                ScriptTarget::Popup {
                    popup_id: popup_id.clone(),
                    nodes,
                },
            );
        }
    }

    pub fn run_document_script(&mut self, call: &ScriptCall) {
        self.run_script(call, ScriptTarget::Document);
    }

    fn run_script(&mut self, call: &ScriptCall, target: ScriptTarget) {
        let (tree, tags) = self.store.tree_and_tags();
        let mut cx = ScriptContext::new(tree, tags, &mut self.report.events, target);
        self.report.scripts_run += 1;
        if let Err(error) = self.scripts.invoke(call, &mut cx) {
            warn!(callback = %call.callback, %error, "script failed");
            self.report.script_failures.push(error);
        }
    }
}
