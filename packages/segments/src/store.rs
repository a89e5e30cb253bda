//! Segment table and the tree patcher
//!
//! The store owns the page tree together with everything the client knows
//! about segments in it: the id → [`Segment`] table, the node ownership
//! tags, which begin markers have already been registered and which
//! segments turned out broken.

use crate::error::{SegmentError, SegmentResult};
use crate::markers::MarkerConfig;
use crate::segment::{NodeRange, Segment, SegmentTags};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};
use trellis_dom::{parse_fragment, NodeId, NodeKind, Tree};

pub struct SegmentStore {
    tree: Tree,
    document: NodeId,
    markers: MarkerConfig,
    segments: HashMap<String, Segment>,
    tags: SegmentTags,
    initialised: HashSet<NodeId>,
    broken: Vec<String>,
}

impl SegmentStore {
    pub fn new(markers: MarkerConfig) -> Self {
        let mut tree = Tree::new();
        let document = tree.create_fragment();
        Self {
            tree,
            document,
            markers,
            segments: HashMap::new(),
            tags: SegmentTags::new(),
            initialised: HashSet::new(),
            broken: Vec::new(),
        }
    }

    /// Append markup to the document. Nothing is registered.
    pub fn load_document(&mut self, markup: &str) -> SegmentResult<()> {
        let parsed = parse_fragment(&mut self.tree, markup);
        if !parsed.fixes.is_empty() {
            debug!(fixes = parsed.fixes.len(), "repaired document markup");
        }
        let children: Vec<_> = self.tree.children(parsed.root).collect();
        for child in children {
            self.tree.append_child(self.document, child)?;
        }
        self.tree.remove_subtree(parsed.root);
        Ok(())
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    /// Root of the live page
    pub fn document(&self) -> NodeId {
        self.document
    }

    pub fn markers(&self) -> &MarkerConfig {
        &self.markers
    }

    pub fn tags(&self) -> &SegmentTags {
        &self.tags
    }

    /// Borrow the tree mutably alongside the ownership tags
    pub fn tree_and_tags(&mut self) -> (&mut Tree, &SegmentTags) {
        (&mut self.tree, &self.tags)
    }

    pub fn get(&self, segment_id: &str) -> Option<&Segment> {
        self.segments.get(segment_id)
    }

    pub fn contains(&self, segment_id: &str) -> bool {
        self.segments.contains_key(segment_id)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segment_ids(&self) -> impl Iterator<Item = &str> {
        self.segments.keys().map(String::as_str)
    }

    pub fn insert(&mut self, segment_id: &str, segment: Segment) {
        self.segments.insert(segment_id.to_string(), segment);
    }

    pub fn is_initialised(&self, begin_marker: NodeId) -> bool {
        self.initialised.contains(&begin_marker)
    }

    pub fn mark_initialised(&mut self, begin_marker: NodeId) {
        self.initialised.insert(begin_marker);
    }

    pub fn tag_nodes(&mut self, nodes: &[NodeId], segment_id: &str) {
        self.tags.tag_all(nodes, segment_id);
    }

    pub fn untag_nodes(&mut self, nodes: &[NodeId]) {
        self.tags.clear(nodes);
    }

    pub fn segment_id_for_node(&self, node: NodeId) -> Option<&str> {
        self.tags.segment_id_for_node(&self.tree, node)
    }

    /// Every node of a segment's run, markers included, wherever it lives
    pub fn nodes(&self, segment: &Segment) -> Vec<NodeId> {
        segment.nodes(&self.tree)
    }

    pub fn segment_nodes(&self, segment_id: &str) -> SegmentResult<Vec<NodeId>> {
        self.get(segment_id)
            .map(|segment| self.nodes(segment))
            .ok_or_else(|| SegmentError::UnknownSegment(segment_id.to_string()))
    }

    /// A segment is active while its begin marker is part of the page
    pub fn is_active(&self, segment_id: &str) -> bool {
        self.get(segment_id)
            .map(|segment| {
                !segment.is_detached() && self.tree.is_attached_to(segment.start, self.document)
            })
            .unwrap_or(false)
    }

    /// The run without its two markers, i.e. what a user would see
    pub fn highlightable_nodes(&self, segment_id: &str) -> SegmentResult<Vec<NodeId>> {
        let nodes = self.segment_nodes(segment_id)?;
        Ok(inner_nodes(&nodes).to_vec())
    }

    /// Parse markup for a segment into a detached fragment.
    ///
    /// The fragment's first and last nodes become the segment's markers.
    pub fn parse_segment(&mut self, segment_id: &str, markup: &str) -> SegmentResult<Segment> {
        let parsed = parse_fragment(&mut self.tree, markup);
        if !parsed.fixes.is_empty() {
            debug!(segment_id, fixes = parsed.fixes.len(), "repaired segment markup");
        }
        match (
            self.tree.first_child(parsed.root),
            self.tree.last_child(parsed.root),
        ) {
            (Some(start), Some(end)) => Ok(Segment::live(start, end, parsed.root)),
            _ => {
                self.tree.remove_subtree(parsed.root);
                Err(SegmentError::EmptyContent(segment_id.to_string()))
            }
        }
    }

    pub fn register_document(&mut self) -> Vec<String> {
        let candidates = self.begin_markers_under(&[self.document]);
        self.register_candidates(candidates)
    }

    /// Register every begin marker at or below `roots`
    pub fn register_within(&mut self, roots: &[NodeId]) -> Vec<String> {
        let candidates = self.begin_markers_under(roots);
        self.register_candidates(candidates)
    }

    fn begin_markers_under(&self, roots: &[NodeId]) -> Vec<NodeId> {
        roots
            .iter()
            .flat_map(|&root| self.tree.descendants(root))
            .filter(|&node| self.markers.is_begin(&self.tree, node))
            .collect()
    }

    /// Returns the ids of the segments registered
    fn register_candidates(&mut self, candidates: Vec<NodeId>) -> Vec<String> {
        let mut registered = Vec::new();

        for start in candidates {
            if !self.initialised.insert(start) {
                continue;
            }
            let Some(segment_id) = self.markers.segment_id(&self.tree, start).map(str::to_string)
            else {
                warn!(node = ?start, "begin marker without a segment id");
                continue;
            };

            let mut run = Vec::new();
            let mut current = Some(start);
            let mut end = None;
            while let Some(node) = current {
                self.tags.tag(node, &segment_id);
                run.push(node);
                if node != start && self.markers.is_end_of(&self.tree, node, &segment_id) {
                    end = Some(node);
                    break;
                }
                current = self.tree.next_sibling(node);
            }

            let Some(end) = end else {
                warn!(segment_id = %segment_id, "segment has no matching end marker");
                self.broken.push(segment_id);
                continue;
            };

            let range = match self.tree.parent(start) {
                Some(parent) => NodeRange::Live { parent },
                None => NodeRange::Detached(run),
            };
            debug!(segment_id = %segment_id, "registered segment");
            self.segments
                .insert(segment_id.clone(), Segment { start, end, range });
            registered.push(segment_id);
        }

        registered
    }

    /// Broken segment ids seen since the last call, each once
    pub fn take_broken(&mut self) -> Vec<String> {
        let mut seen = HashSet::new();
        std::mem::take(&mut self.broken)
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect()
    }

    /// Splice `new`'s run into the place of `old`'s run.
    ///
    /// Returns the new segment positioned where the old one was. Segments
    /// that start directly in the outgoing run are switched to detached
    /// ranges so they can still be walked, and placed back later.
    pub fn replace_segment(&mut self, old: &Segment, new: &Segment) -> SegmentResult<Segment> {
        let old_nodes = self.nodes(old);
        let new_nodes = self.nodes(new);
        let Some(parent) = self.tree.parent(old.start) else {
            // The old run is off-page already; the new one stays in its fragment
            return Ok(new.clone());
        };

        self.detach_nested(&old_nodes);

        for &node in &new_nodes {
            self.tree.insert_before(parent, node, Some(old.start))?;
        }
        for &node in &old_nodes {
            self.tree.detach(node);
        }
        if let NodeRange::Live { parent: fragment } = new.range {
            self.drop_empty_fragment(fragment);
        }

        Ok(Segment::live(new.start, new.end, parent))
    }

    fn detach_nested(&mut self, outgoing: &[NodeId]) {
        let positions: HashMap<NodeId, usize> =
            outgoing.iter().enumerate().map(|(i, &n)| (n, i)).collect();

        for (segment_id, segment) in self.segments.iter_mut() {
            if segment.is_detached() {
                continue;
            }
            let Some(&first) = positions.get(&segment.start) else {
                continue;
            };
            let nodes = match positions.get(&segment.end) {
                Some(&last) if last >= first => outgoing[first..=last].to_vec(),
                _ => segment.nodes(&self.tree),
            };
            debug!(segment_id = %segment_id, "segment detached with its parent run");
            segment.range = NodeRange::Detached(nodes);
        }
    }

    /// Remove a segment from the table and let go of what it owned.
    ///
    /// A run that is still on the page only loses its tags: its nodes go
    /// when the enclosing segment is replaced. An off-page run is freed.
    pub fn dispose_segment(&mut self, segment_id: &str) -> Option<Segment> {
        let segment = self.segments.remove(segment_id)?;
        let nodes = segment.nodes(&self.tree);
        if self.tree.is_attached_to(segment.start, self.document) {
            self.tags.clear(&nodes);
        } else {
            self.reclaim(&nodes);
        }
        Some(segment)
    }

    /// Free an outgoing run and everything below it.
    ///
    /// Segments still in the table whose begin marker lies in the run keep
    /// their nodes (and whatever is nested in them): they are switched to
    /// detached ranges and cut loose before the rest is freed. Tags and
    /// registration marks of freed nodes are dropped. Nodes still on the
    /// page are left alone.
    pub fn reclaim(&mut self, run: &[NodeId]) {
        let roots: Vec<NodeId> = run
            .iter()
            .copied()
            .filter(|&node| self.tree.contains(node) && !self.tree.is_attached_to(node, self.document))
            .collect();
        if roots.is_empty() {
            return;
        }

        let starts: HashMap<NodeId, String> = self
            .segments
            .iter()
            .map(|(segment_id, segment)| (segment.start, segment_id.clone()))
            .collect();

        let mut kept = HashSet::new();
        let mut stack: Vec<NodeId> = roots.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            if kept.contains(&node) {
                continue;
            }
            if let Some(segment) = starts.get(&node).and_then(|id| self.segments.get_mut(id)) {
                let nodes = segment.nodes(&self.tree);
                if !segment.is_detached() {
                    debug!(node = ?node, "segment outlives its enclosing run");
                    segment.range = NodeRange::Detached(nodes.clone());
                }
                kept.extend(nodes);
                continue;
            }
            let children: Vec<NodeId> = self.tree.children(node).collect();
            stack.extend(children.into_iter().rev());
        }
        let parents: Vec<NodeId> = roots.iter().filter_map(|&node| self.tree.parent(node)).collect();
        for &node in &kept {
            self.tree.detach(node);
        }

        let mut freed = 0;
        for &node in &roots {
            if kept.contains(&node) {
                continue;
            }
            freed += self.discard(node);
        }
        for parent in parents {
            self.drop_empty_fragment(parent);
        }
        debug!(freed, kept = kept.len(), "reclaimed outgoing run");
    }

    /// Free a parse fragment once everything has been moved out of it
    fn drop_empty_fragment(&mut self, fragment: NodeId) {
        if fragment != self.document
            && self.tree.contains(fragment)
            && self.tree.parent(fragment).is_none()
            && self.tree.first_child(fragment).is_none()
            && matches!(self.tree.kind(fragment), NodeKind::Fragment)
        {
            self.tree.remove_subtree(fragment);
        }
    }

    fn discard(&mut self, node: NodeId) -> usize {
        let removed = self.tree.remove_subtree(node);
        self.tags.clear(&removed);
        for node in &removed {
            self.initialised.remove(node);
        }
        removed.len()
    }

    /// Put a registered segment's run where `placeholder` is, then drop the
    /// placeholder.
    pub fn replace_placeholder(
        &mut self,
        placeholder: NodeId,
        segment_id: &str,
    ) -> SegmentResult<Vec<NodeId>> {
        let segment = self
            .get(segment_id)
            .ok_or_else(|| SegmentError::UnknownSegment(segment_id.to_string()))?;
        let nodes = self.nodes(segment);
        let parent = self
            .tree
            .parent(placeholder)
            .ok_or(SegmentError::DetachedPlaceholder)?;

        for &node in &nodes {
            self.tree.insert_before(parent, node, Some(placeholder))?;
        }
        self.discard(placeholder);
        self.relink(&nodes, parent);

        Ok(nodes)
    }

    /// Segments starting directly in a reattached run become live again and
    /// get their ownership tags back, outermost first.
    fn relink(&mut self, reattached: &[NodeId], parent: NodeId) {
        let positions: HashMap<NodeId, usize> =
            reattached.iter().enumerate().map(|(i, &n)| (n, i)).collect();

        let mut relinked: Vec<(usize, String)> = self
            .segments
            .iter()
            .filter_map(|(id, segment)| positions.get(&segment.start).map(|&i| (i, id.clone())))
            .collect();
        relinked.sort();

        for (_, segment_id) in relinked {
            if let Some(segment) = self.segments.get_mut(&segment_id) {
                segment.range = NodeRange::Live { parent };
                let nodes = segment.nodes(&self.tree);
                self.tags.tag_all(&nodes, &segment_id);
            }
        }
    }

    fn placeholders_in_document(&self) -> Vec<NodeId> {
        self.tree
            .descendants(self.document)
            .filter(|&node| self.markers.is_placeholder(&self.tree, node))
            .collect()
    }

    /// Replace placeholders in the document until none remain.
    ///
    /// Reattached runs can carry placeholders of their own, so the document
    /// is searched again after each round. A placeholder that cannot be
    /// filled is removed.
    pub fn resolve_placeholders(&mut self) -> usize {
        let mut resolved = 0;
        let max_rounds = self.tree.len() + 1;

        for _ in 0..max_rounds {
            let placeholders = self.placeholders_in_document();
            if placeholders.is_empty() {
                break;
            }
            for placeholder in placeholders {
                if !self.tree.is_attached_to(placeholder, self.document) {
                    continue;
                }
                let segment_id = self
                    .markers
                    .segment_id(&self.tree, placeholder)
                    .unwrap_or_default()
                    .to_string();
                match self.replace_placeholder(placeholder, &segment_id) {
                    Ok(_) => resolved += 1,
                    Err(error) => {
                        warn!(segment_id = %segment_id, %error, "dropping unresolvable placeholder");
                        self.discard(placeholder);
                    }
                }
            }
        }

        resolved
    }
}

/// Nodes strictly between the begin and end markers
pub fn inner_nodes(nodes: &[NodeId]) -> &[NodeId] {
    if nodes.len() < 2 {
        &[]
    } else {
        &nodes[1..nodes.len() - 1]
    }
}
