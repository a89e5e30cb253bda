//! # Live Tree
//!
//! Arena-backed mutable node tree.
//!
//! Nodes are addressed by [`NodeId`] handles. A handle stays valid for the
//! lifetime of the node: detaching a node only unlinks it, so a detached run
//! of nodes can be re-inserted later and keeps its identity (and anything
//! keyed by that identity in side tables).
//!
//! [`Tree::remove_subtree`] frees a node and everything below it. Freed slots
//! are handed out again by the `create_*` methods, so a handle must not be
//! used once its node has been removed.

use crate::error::{TreeError, TreeResult};
use serde::{Deserialize, Serialize};

/// Stable handle to a node in a [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Element data: tag name and ordered attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .map(|classes| classes.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Parentless container (parse results, the document root)
    Fragment,
    Element(Element),
    Text(String),
    Comment(String),
}

impl NodeKind {
    fn can_have_children(&self) -> bool {
        matches!(self, NodeKind::Fragment | NodeKind::Element(_))
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
    vacant: bool,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            vacant: false,
        }
    }
}

/// Mutable node tree
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<NodeData>,
    free: Vec<NodeId>,
}

impl Tree {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Number of slots in the arena, free or in use
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes that have not been removed
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// False once `id` has been removed
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.get(id.index()).is_some_and(|data| !data.vacant)
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.nodes[id.index()] = NodeData::new(kind);
            return id;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData::new(kind));
        id
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.index()]
    }

    pub fn create_fragment(&mut self) -> NodeId {
        self.push(NodeKind::Fragment)
    }

    pub fn create_element(&mut self, element: Element) -> NodeId {
        self.push(NodeKind::Element(element))
    }

    pub fn create_text(&mut self, content: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(content.into()))
    }

    pub fn create_comment(&mut self, content: impl Into<String>) -> NodeId {
        self.push(NodeKind::Comment(content.into()))
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.data(id).kind
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.data_mut(id).kind
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.data(id).kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.data_mut(id).kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attribute(name))
    }

    /// Set an attribute, replacing an existing value. No-op on non-elements.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(element) = self.element_mut(id) {
            let value = value.into();
            match element.attributes.iter_mut().find(|(key, _)| key == name) {
                Some(slot) => slot.1 = value,
                None => element.attributes.push((name.to_string(), value)),
            }
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).map(|e| e.has_class(class)).unwrap_or(false)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).parent
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).first_child
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).last_child
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).next_sibling
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).prev_sibling
    }

    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.first_child(id),
        }
    }

    /// Pre-order traversal of `root` and everything below it
    pub fn descendants(&self, root: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            root,
            next: Some(root),
        }
    }

    /// `id` followed by its parent chain
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: Some(id),
        }
    }

    /// True if `id` is `root` or lies somewhere below it
    pub fn is_attached_to(&self, id: NodeId, root: NodeId) -> bool {
        self.ancestors(id).any(|n| n == root)
    }

    /// Unlink a node from its parent. The node keeps its own children.
    pub fn detach(&mut self, id: NodeId) {
        let NodeData {
            parent,
            prev_sibling,
            next_sibling,
            ..
        } = *self.data(id);

        let Some(parent) = parent else {
            return;
        };

        match prev_sibling {
            Some(prev) => self.data_mut(prev).next_sibling = next_sibling,
            None => self.data_mut(parent).first_child = next_sibling,
        }
        match next_sibling {
            Some(next) => self.data_mut(next).prev_sibling = prev_sibling,
            None => self.data_mut(parent).last_child = prev_sibling,
        }

        let data = self.data_mut(id);
        data.parent = None;
        data.prev_sibling = None;
        data.next_sibling = None;
    }

    /// Detach `id` and free it together with everything below it.
    ///
    /// Returns the freed handles, `id` first. Removing a node that is
    /// already gone frees nothing.
    pub fn remove_subtree(&mut self, id: NodeId) -> Vec<NodeId> {
        if !self.contains(id) {
            return Vec::new();
        }
        self.detach(id);
        let removed: Vec<NodeId> = self.descendants(id).collect();
        for &node in &removed {
            let data = self.data_mut(node);
            *data = NodeData::new(NodeKind::Fragment);
            data.vacant = true;
            self.free.push(node);
        }
        removed
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> TreeResult<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert `node` under `parent` before `reference` (or at the end when
    /// `reference` is `None`). A node that is already parented is moved.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        node: NodeId,
        reference: Option<NodeId>,
    ) -> TreeResult<()> {
        if !self.data(parent).kind.can_have_children() {
            return Err(TreeError::NotAContainer(parent));
        }
        if self.is_attached_to(parent, node) {
            return Err(TreeError::HierarchyViolation { parent, node });
        }
        if let Some(reference) = reference {
            if self.parent(reference) != Some(parent) {
                return Err(TreeError::NotAChild {
                    parent,
                    child: reference,
                });
            }
            if reference == node {
                return Ok(());
            }
        }

        self.detach(node);

        let prev = match reference {
            Some(reference) => self.previous_sibling(reference),
            None => self.last_child(parent),
        };

        {
            let data = self.data_mut(node);
            data.parent = Some(parent);
            data.prev_sibling = prev;
            data.next_sibling = reference;
        }
        match prev {
            Some(prev) => self.data_mut(prev).next_sibling = Some(node),
            None => self.data_mut(parent).first_child = Some(node),
        }
        match reference {
            Some(reference) => self.data_mut(reference).prev_sibling = Some(node),
            None => self.data_mut(parent).last_child = Some(node),
        }

        Ok(())
    }

    /// Concatenated text of all text nodes below `id`
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .filter_map(|n| match self.kind(n) {
                NodeKind::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

pub struct Children<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.next_sibling(current);
        Some(current)
    }
}

pub struct Descendants<'a> {
    tree: &'a Tree,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;

        self.next = match self.tree.first_child(current) {
            Some(child) => Some(child),
            None => {
                let mut node = current;
                loop {
                    if node == self.root {
                        break None;
                    }
                    if let Some(sibling) = self.tree.next_sibling(node) {
                        break Some(sibling);
                    }
                    match self.tree.parent(node) {
                        Some(parent) => node = parent,
                        None => break None,
                    }
                }
            }
        };

        Some(current)
    }
}

pub struct Ancestors<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}
