//! Recognising segment delimiter and placeholder nodes

use serde::{Deserialize, Serialize};
use trellis_dom::{NodeId, Tree};

/// How delimiter and placeholder nodes are marked up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarkerConfig {
    /// Attribute holding the segment id on markers and placeholders
    pub segment_id_attr: String,
    pub begin_class: String,
    pub end_class: String,
    pub placeholder_class: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            segment_id_attr: "data-segid".to_string(),
            begin_class: "begin".to_string(),
            end_class: "end".to_string(),
            placeholder_class: "placeholder".to_string(),
        }
    }
}

impl MarkerConfig {
    pub fn segment_id<'t>(&self, tree: &'t Tree, node: NodeId) -> Option<&'t str> {
        tree.attribute(node, &self.segment_id_attr)
    }

    pub fn is_begin(&self, tree: &Tree, node: NodeId) -> bool {
        tree.has_class(node, &self.begin_class)
    }

    /// An end marker closes only the segment with the same id
    pub fn is_end_of(&self, tree: &Tree, node: NodeId, segment_id: &str) -> bool {
        tree.has_class(node, &self.end_class) && self.segment_id(tree, node) == Some(segment_id)
    }

    pub fn is_placeholder(&self, tree: &Tree, node: NodeId) -> bool {
        tree.has_class(node, &self.placeholder_class)
    }
}
