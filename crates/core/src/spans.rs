//! Section span resolution: turn a section tree with partial span anchors
//! into one ordered chunk of object ids per section.
//!
//! The tree is flattened into an arena (a `Vec` of nodes addressed by
//! index) so that parent and child links can be followed in both
//! directions without shared ownership. Body text between a heading and
//! its first subsection lands in a residual leaf added at build time.
//! Leaves claim objects first; every ancestor then aggregates the union of
//! its children.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::{OverlapPolicy, StructureConfig};
use crate::layout::normalize_heading_text;
use crate::types::{ContentElement, ObjectId, SectionChunk, SectionId, SectionNode};
use crate::{Precondition, StructureError};

// ---------------------------------------------------------------------------
// Object ordering
// ---------------------------------------------------------------------------

/// Objects in reading order with an id -> position lookup.
pub(crate) struct ObjectIndex<'a, T> {
    pub(crate) ordered: Vec<&'a T>,
    positions: HashMap<&'a str, usize>,
}

impl<'a, T: ContentElement> ObjectIndex<'a, T> {
    /// Stable sort by `(page_index or 0, order_index)`; the first occurrence
    /// of a duplicated id wins and later ones are dropped.
    pub(crate) fn new(objects: &'a [T]) -> Self {
        let mut sorted: Vec<&'a T> = objects.iter().collect();
        sorted.sort_by_key(|o| (o.page_index().unwrap_or(0), o.order_index()));

        let mut ordered = Vec::with_capacity(sorted.len());
        let mut positions = HashMap::with_capacity(sorted.len());
        for object in sorted {
            let id = object.object_id().as_str();
            if positions.contains_key(id) {
                log::warn!("spans.duplicate_object object={}", id);
                continue;
            }
            positions.insert(id, ordered.len());
            ordered.push(object);
        }
        ObjectIndex { ordered, positions }
    }

    pub(crate) fn len(&self) -> usize {
        self.ordered.len()
    }

    /// Position of `id`, logging ids that name no object.
    pub(crate) fn position(&self, id: Option<&ObjectId>, section: &SectionId) -> Option<usize> {
        let id = id?;
        let position = self.positions.get(id.as_str()).copied();
        if position.is_none() {
            log::warn!("spans.unknown_object section={} object={}", section, id);
        }
        position
    }

    pub(crate) fn normalized_text(&self, pos: usize) -> String {
        self.ordered[pos]
            .text()
            .map(normalize_heading_text)
            .unwrap_or_default()
    }
}

/// Whether the object at `pos` repeats the section heading.
fn is_heading_object<T: ContentElement>(index: &ObjectIndex<'_, T>, pos: usize, title: &str) -> bool {
    let object_text = index.normalized_text(pos);
    let title = normalize_heading_text(title);
    !object_text.is_empty()
        && !title.is_empty()
        && (object_text.starts_with(&title) || title.starts_with(&object_text))
}

// ---------------------------------------------------------------------------
// Arena
// ---------------------------------------------------------------------------

struct ArenaNode<'a> {
    section_id: SectionId,
    title: &'a str,
    depth: usize,
    /// Resolved span start and explicit end.
    start: Option<usize>,
    end: Option<usize>,
    /// Body text between a section heading and its first subsection.
    residual: bool,
    children: Vec<usize>,
    /// Labels of non-root ancestors joined with the configured separator.
    header_path: String,
}

/// Pre-order arena of the section tree; index 0 is the root and every
/// parent precedes its descendants.
struct SectionArena<'a> {
    nodes: Vec<ArenaNode<'a>>,
}

impl<'a> SectionArena<'a> {
    fn build<T: ContentElement>(root: &'a SectionNode, index: &ObjectIndex<'_, T>, separator: &str) -> Self {
        let mut arena = SectionArena { nodes: Vec::new() };
        arena.push(root, index, None, "", separator);
        arena
    }

    fn push<T: ContentElement>(
        &mut self,
        node: &'a SectionNode,
        index: &ObjectIndex<'_, T>,
        parent: Option<usize>,
        path: &str,
        separator: &str,
    ) -> usize {
        let (start, end) = match &node.span {
            Some(span) => (
                index.position(span.start_object.as_ref(), &node.section_id),
                index.position(span.end_object.as_ref(), &node.section_id),
            ),
            None => (None, None),
        };
        let idx = self.nodes.len();
        self.nodes.push(ArenaNode {
            section_id: node.section_id.clone(),
            title: &node.title,
            depth: node.depth,
            start,
            end,
            residual: false,
            children: Vec::new(),
            header_path: path.to_string(),
        });

        let child_path = match parent {
            // The root's own label never appears in paths.
            None => String::new(),
            Some(_) if path.is_empty() => node.label(),
            Some(_) => format!("{}{}{}", path, separator, node.label()),
        };
        for child in &node.children {
            let child_idx = self.push(child, index, Some(idx), &child_path, separator);
            self.nodes[idx].children.push(child_idx);
        }
        idx
    }

    /// Sort every child list by anchor position and return the keys.
    ///
    /// A node's key is its own resolved span start, else the smallest key
    /// among its descendants; nodes with neither sort last, keeping their
    /// relative order.
    fn sort_children(&mut self) -> Vec<usize> {
        let mut keys = vec![usize::MAX; self.nodes.len()];
        for idx in (0..self.nodes.len()).rev() {
            keys[idx] = match self.nodes[idx].start {
                Some(pos) => pos,
                None => self.nodes[idx]
                    .children
                    .iter()
                    .map(|&c| keys[c])
                    .min()
                    .unwrap_or(usize::MAX),
            };
        }
        for node in &mut self.nodes {
            node.children.sort_by_key(|&c| keys[c]);
        }
        keys
    }

    /// Give every anchored section with subsections a residual leaf holding
    /// the objects between its heading and its first subsection.
    ///
    /// The residual is the first child, so the parent's chunk stays the
    /// union of its children's chunks.
    fn add_residuals<T: ContentElement>(&mut self, index: &ObjectIndex<'_, T>, keys: &[usize]) {
        let last = index.len() - 1;
        for idx in 1..keys.len() {
            let node = &self.nodes[idx];
            let Some(anchor) = node.start else {
                continue;
            };
            let Some(first_child) = node.children.first().map(|&c| keys[c]) else {
                continue;
            };
            let start = if is_heading_object(index, anchor, node.title) {
                anchor + 1
            } else {
                anchor
            };
            let bound = match (node.end, first_child) {
                (Some(end), usize::MAX) => Some(end),
                (Some(end), next) => next.checked_sub(1).map(|before| end.min(before)),
                (None, usize::MAX) => None,
                (None, next) => next.checked_sub(1),
            };
            let Some(end) = bound.map(|b| b.min(last)) else {
                continue;
            };
            if start > end {
                continue;
            }

            let residual = ArenaNode {
                section_id: SectionId::new(format!("{}::gap-{:06}-{:06}", node.section_id, start, end)),
                title: node.title,
                depth: node.depth + 1,
                start: Some(start),
                end: Some(end),
                residual: true,
                children: Vec::new(),
                header_path: self.child_path(idx),
            };
            log::debug!("spans.residual section={} start={} end={}", node.section_id, start, end);
            let residual_idx = self.nodes.len();
            self.nodes.push(residual);
            self.nodes[idx].children.insert(0, residual_idx);
        }
    }

    /// Path handed to the children of `idx`, taken from an existing child.
    fn child_path(&self, idx: usize) -> String {
        self.nodes[idx]
            .children
            .first()
            .map(|&c| self.nodes[c].header_path.clone())
            .unwrap_or_default()
    }

    fn is_leaf(&self, idx: usize) -> bool {
        self.nodes[idx].children.is_empty()
    }

    fn preorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![0];
        while let Some(idx) = stack.pop() {
            order.push(idx);
            stack.extend(self.nodes[idx].children.iter().rev());
        }
        order
    }
}

// ---------------------------------------------------------------------------
// Leaf ranges
// ---------------------------------------------------------------------------

/// Inclusive object range a leaf may claim; empty when `start > end`.
#[derive(Debug, Clone, Copy)]
struct LeafRange {
    leaf: usize,
    anchor: usize,
    start: usize,
    end: usize,
}

fn leaf_ranges<T: ContentElement>(
    arena: &SectionArena<'_>,
    index: &ObjectIndex<'_, T>,
    policy: OverlapPolicy,
) -> Vec<LeafRange> {
    let last = index.len() - 1;

    let mut anchored: Vec<(usize, usize, Option<usize>)> = arena
        .preorder()
        .into_iter()
        .filter(|&idx| idx != 0 && arena.is_leaf(idx))
        .filter_map(|idx| {
            let node = &arena.nodes[idx];
            Some((idx, node.start?, node.end))
        })
        .collect();
    anchored.sort_by(|a, b| {
        let (na, nb) = (&arena.nodes[a.0], &arena.nodes[b.0]);
        (a.1, na.depth, &na.section_id).cmp(&(b.1, nb.depth, &nb.section_id))
    });

    anchored
        .iter()
        .enumerate()
        .map(|(i, &(leaf, anchor, explicit_end))| {
            let node = &arena.nodes[leaf];
            let start = if !node.residual && is_heading_object(index, anchor, node.title) {
                anchor + 1
            } else {
                anchor
            };
            let mut end = explicit_end.unwrap_or(start).min(last);
            if policy == OverlapPolicy::Clamp {
                let boundary = anchored[i + 1..]
                    .iter()
                    .map(|&(_, next, _)| next)
                    .find(|&next| next > anchor);
                if let Some(next) = boundary {
                    end = end.min(next - 1);
                }
            }
            LeafRange {
                leaf,
                anchor,
                start,
                end,
            }
        })
        .collect()
}

/// Assign every object to at most one leaf: the claiming leaf whose anchor
/// is closest before it, then the shallower one, then the smaller id.
fn assign_objects(arena: &SectionArena<'_>, ranges: &[LeafRange], total: usize) -> Vec<Option<usize>> {
    let mut owners: Vec<Option<(usize, usize, &SectionId, usize)>> = vec![None; total];
    for range in ranges.iter().filter(|r| r.start <= r.end) {
        let node = &arena.nodes[range.leaf];
        for (pos, owner) in owners.iter_mut().enumerate().take(range.end + 1).skip(range.start) {
            let claim = (pos - range.anchor, node.depth, &node.section_id, range.leaf);
            let replace = match owner {
                Some(current) => (current.0, current.1, current.2) > (claim.0, claim.1, claim.2),
                None => true,
            };
            if replace {
                *owner = Some(claim);
            }
        }
    }
    owners.into_iter().map(|o| o.map(|(_, _, _, leaf)| leaf)).collect()
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve a section tree against parsed objects into one chunk per node.
///
/// Chunks come out in pre-order with children ordered by anchor position.
/// Leaves own disjoint, ascending object lists; every other node holds the
/// ascending union of its children. Leaves with no resolvable anchor, and
/// leaves whose range is empty, still get an (empty) chunk.
///
/// An anchored section whose heading is followed by body text before its
/// first subsection gets an extra leaf chunk `{section_id}::gap-{start}-{end}`
/// (zero-padded object positions) ahead of its subsections.
pub fn resolve_sections<T: ContentElement>(
    root: &SectionNode,
    objects: &[T],
    config: &StructureConfig,
) -> Result<Vec<SectionChunk>, StructureError> {
    if objects.is_empty() {
        return Err(StructureError::MissingPrecondition(Precondition::ParsedObjectsMissing));
    }
    if root.children.is_empty() {
        return Err(StructureError::MissingPrecondition(Precondition::SectionsMissing));
    }

    let index = ObjectIndex::new(objects);
    let mut arena = SectionArena::build(root, &index, &config.path_separator);
    let keys = arena.sort_children();
    arena.add_residuals(&index, &keys);

    let ranges = leaf_ranges(&arena, &index, config.overlap_policy);
    let owners = assign_objects(&arena, &ranges, index.len());

    let mut positions: Vec<Vec<usize>> = vec![Vec::new(); arena.nodes.len()];
    for (pos, owner) in owners.iter().enumerate() {
        if let Some(leaf) = owner {
            positions[*leaf].push(pos);
        }
    }
    // Walk bottom-up so children are aggregated before their parents.
    for idx in arena.preorder().into_iter().rev() {
        if arena.is_leaf(idx) {
            continue;
        }
        let union: BTreeSet<usize> = arena.nodes[idx]
            .children
            .iter()
            .flat_map(|&c| positions[c].iter().copied())
            .collect();
        positions[idx] = union.into_iter().collect();
    }

    let orphans: Vec<usize> = owners
        .iter()
        .enumerate()
        .filter(|(_, owner)| owner.is_none())
        .map(|(pos, _)| pos)
        .collect();
    if config.root_collects_orphans && !orphans.is_empty() {
        let mut all: BTreeSet<usize> = positions[0].iter().copied().collect();
        all.extend(orphans.iter().copied());
        positions[0] = all.into_iter().collect();
    }

    let leaves = (1..arena.nodes.len()).filter(|&i| arena.is_leaf(i)).count();
    let residuals = arena.nodes.iter().filter(|n| n.residual).count();
    log::debug!(
        "spans.summary objects={} sections={} leaves={} residuals={} anchored={} assigned={} unassigned={}",
        index.len(),
        arena.nodes.len(),
        leaves,
        residuals,
        ranges.len(),
        index.len() - orphans.len(),
        orphans.len()
    );

    let chunks = arena
        .preorder()
        .into_iter()
        .map(|idx| {
            let entry = &arena.nodes[idx];
            let object_ids = positions[idx]
                .iter()
                .map(|&pos| index.ordered[pos].object_id().clone())
                .collect();
            SectionChunk {
                section_id: entry.section_id.clone(),
                header_path: entry.header_path.clone(),
                depth: entry.depth,
                is_leaf: idx != 0 && arena.is_leaf(idx),
                object_ids,
            }
        })
        .collect();

    Ok(chunks)
}

/// Index chunks by section id for persistence.
pub fn chunk_map(chunks: &[SectionChunk]) -> BTreeMap<SectionId, Vec<ObjectId>> {
    chunks
        .iter()
        .map(|c| (c.section_id.clone(), c.object_ids.clone()))
        .collect()
}
