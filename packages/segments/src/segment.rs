//! Segment records and node ownership tags

use std::collections::HashMap;
use trellis_dom::{NodeId, Tree};

/// Where a segment's node run can be found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRange {
    /// The run is a sibling chain under `parent`, from start to end
    Live { parent: NodeId },
    /// The run has been spliced out; the nodes are kept in order
    Detached(Vec<NodeId>),
}

/// A contiguous run of sibling nodes delimited by a begin and an end marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub start: NodeId,
    pub end: NodeId,
    pub range: NodeRange,
}

impl Segment {
    pub fn live(start: NodeId, end: NodeId, parent: NodeId) -> Self {
        Self {
            start,
            end,
            range: NodeRange::Live { parent },
        }
    }

    pub fn is_detached(&self) -> bool {
        matches!(self.range, NodeRange::Detached(_))
    }

    /// Walk the segment's run in order, markers included.
    ///
    /// A live run that loses its end marker yields the nodes up to where the
    /// chain stops.
    pub fn nodes(&self, tree: &Tree) -> Vec<NodeId> {
        match &self.range {
            NodeRange::Detached(nodes) => nodes.clone(),
            NodeRange::Live { .. } => {
                let mut nodes = vec![self.start];
                let mut current = self.start;
                while current != self.end {
                    match tree.next_sibling(current) {
                        Some(next) => {
                            nodes.push(next);
                            current = next;
                        }
                        None => {
                            tracing::warn!(start = ?self.start, "segment run ends before its end marker");
                            break;
                        }
                    }
                }
                nodes
            }
        }
    }
}

/// Side table mapping nodes to the segment that owns them
#[derive(Debug, Default, Clone)]
pub struct SegmentTags {
    owners: HashMap<NodeId, String>,
}

impl SegmentTags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(&mut self, node: NodeId, segment_id: &str) {
        self.owners.insert(node, segment_id.to_string());
    }

    pub fn tag_all(&mut self, nodes: &[NodeId], segment_id: &str) {
        for &node in nodes {
            self.tag(node, segment_id);
        }
    }

    pub fn clear(&mut self, nodes: &[NodeId]) {
        for node in nodes {
            self.owners.remove(node);
        }
    }

    pub fn get(&self, node: NodeId) -> Option<&str> {
        self.owners.get(&node).map(String::as_str)
    }

    /// The nearest tagged node at or above `node` names its segment
    pub fn segment_id_for_node(&self, tree: &Tree, node: NodeId) -> Option<&str> {
        tree.ancestors(node).find_map(|n| self.get(n))
    }
}
