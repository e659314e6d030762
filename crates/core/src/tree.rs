use sha2::{Digest, Sha256};

use crate::layout::HeaderCandidate;
use crate::types::{HeaderItem, HeaderNode, HeadingLevel, SectionId, SectionNode};

/// Font sizes closer than this to a larger distinct size share its rank.
const SIZE_MERGE_TOLERANCE: f32 = 0.5;

/// Internal builder that accumulates children before finalizing into a `HeaderNode`.
struct HeaderBuilder {
    id: String,
    title: String,
    level: HeadingLevel,
    page: usize,
    line_index: usize,
    number: Option<String>,
    score: f32,
    children: Vec<HeaderNode>,
}

impl HeaderBuilder {
    fn from_candidate(candidate: &HeaderCandidate<'_>, level: HeadingLevel) -> Self {
        let line = candidate.line;
        HeaderBuilder {
            id: node_id(line.page_number, line.line_index, &candidate.title),
            title: candidate.title.clone(),
            level,
            page: line.page_number,
            line_index: line.line_index,
            number: candidate.number.as_ref().map(|n| n.label.clone()),
            score: candidate.score,
            children: Vec::new(),
        }
    }

    fn add_child(&mut self, child: HeaderNode) {
        self.children.push(child);
    }

    fn build(self) -> HeaderNode {
        log::debug!(
            "headers.node title={:?} level={} score={:.3} page={} line={}",
            self.title,
            self.level.as_u8(),
            self.score,
            self.page,
            self.line_index
        );
        HeaderNode {
            id: self.id,
            title: self.title,
            level: self.level,
            page: self.page,
            line_index: self.line_index,
            number: self.number,
            score: self.score,
            children: self.children,
        }
    }
}

/// Deterministic node id derived from position and title.
fn node_id(page: usize, line_index: usize, title: &str) -> String {
    let digest = Sha256::digest(format!("{page}:{line_index}:{title}").as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(32);
    hex
}

fn round_tenth(size: f32) -> f32 {
    (size * 10.0).round() / 10.0
}

/// Distinct candidate font sizes, largest first, with sizes within
/// [`SIZE_MERGE_TOLERANCE`] of a larger one folded into it.
pub fn size_order(candidates: &[HeaderCandidate<'_>]) -> Vec<f32> {
    let mut sizes: Vec<f32> = candidates
        .iter()
        .filter_map(|c| c.line.font_size)
        .filter(|s| s.is_finite())
        .map(round_tenth)
        .collect();
    sizes.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    let mut order: Vec<f32> = Vec::new();
    for size in sizes {
        match order.last() {
            Some(last) if (last - size).abs() <= SIZE_MERGE_TOLERANCE => {}
            _ => order.push(size),
        }
    }
    order
}

/// Level of a candidate: numbering depth when numbered, otherwise the rank
/// of its font size in `order` (1 = largest).
pub fn infer_level(candidate: &HeaderCandidate<'_>, order: &[f32]) -> HeadingLevel {
    if candidate.inferred_level > 0 {
        return HeadingLevel::clamped(candidate.inferred_level);
    }
    let rank = match candidate.line.font_size.filter(|s| s.is_finite()) {
        Some(size) => {
            let size = round_tenth(size);
            order
                .iter()
                .position(|bucket| size >= bucket - SIZE_MERGE_TOLERANCE)
                .map(|i| i + 1)
                .unwrap_or(order.len())
        }
        None => order.len(),
    };
    HeadingLevel::clamped(rank)
}

/// Nest candidates into a forest with a level stack.
///
/// A candidate becomes a child of the nearest preceding candidate with a
/// strictly smaller level, or a root when there is none. Candidates must
/// already be in document order.
pub fn build_tree(candidates: &[HeaderCandidate<'_>]) -> Vec<HeaderNode> {
    let order = size_order(candidates);

    // Stack of (HeaderBuilder, heading_level).
    let mut stack: Vec<(HeaderBuilder, HeadingLevel)> = Vec::new();
    let mut roots: Vec<HeaderNode> = Vec::new();

    for candidate in candidates {
        let level = infer_level(candidate, &order);

        while let Some((_, top_level)) = stack.last() {
            if *top_level < level {
                break;
            }
            let Some((builder, _)) = stack.pop() else {
                break;
            };
            let finished = builder.build();
            if let Some((parent, _)) = stack.last_mut() {
                parent.add_child(finished);
            } else {
                roots.push(finished);
            }
        }

        stack.push((HeaderBuilder::from_candidate(candidate, level), level));
    }

    // Unwind the entire stack.
    while let Some((builder, _)) = stack.pop() {
        let finished = builder.build();
        if let Some((parent, _)) = stack.last_mut() {
            parent.add_child(finished);
        } else {
            roots.push(finished);
        }
    }

    roots
}

/// Pre-order flat list of the forest, with 1-based pages.
pub fn flatten_headers(nodes: &[HeaderNode]) -> Vec<HeaderItem> {
    let mut items = Vec::new();
    for node in nodes {
        flatten_node(node, &mut items);
    }
    items
}

fn flatten_node(node: &HeaderNode, items: &mut Vec<HeaderItem>) {
    items.push(HeaderItem {
        number: node.number.clone(),
        title: node.title.clone(),
        page: node.page + 1,
        line_index: node.line_index,
    });
    for child in &node.children {
        flatten_node(child, items);
    }
}

/// Wrap a heading forest into a section tree under a synthetic root.
///
/// The root has id `root` and depth 0. Other ids are `s-{level}-{index}`
/// with one counter per heading level, assigned in pre-order. Spans are
/// left empty; see [`crate::anchor::anchor_sections`].
pub fn to_section_tree(nodes: &[HeaderNode], title: &str) -> SectionNode {
    // Per-level counters, index 0 unused.
    let mut level_counters = [0usize; HeadingLevel::MAX as usize + 1];
    let children = nodes
        .iter()
        .map(|node| section_from_header(node, 1, &mut level_counters))
        .collect();

    SectionNode {
        section_id: SectionId::root(),
        title: title.to_string(),
        number: None,
        depth: 0,
        span: None,
        children,
    }
}

fn section_from_header(node: &HeaderNode, depth: usize, level_counters: &mut [usize]) -> SectionNode {
    let level = node.level.as_u8();
    let index = level_counters[level as usize];
    level_counters[level as usize] += 1;
    let section_id = SectionId::numbered(level, index);

    let children = node
        .children
        .iter()
        .map(|child| section_from_header(child, depth + 1, level_counters))
        .collect();

    SectionNode {
        section_id,
        title: node.title.clone(),
        number: node.number.clone(),
        depth,
        span: None,
        children,
    }
}
