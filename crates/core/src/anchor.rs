//! Attach span anchors to a freshly detected section tree by locating each
//! heading among the parsed objects.

use crate::layout::normalize_heading_text;
use crate::spans::ObjectIndex;
use crate::types::{ContentElement, SectionNode, SectionSpan};

fn matches_title(object_text: &str, title: &str) -> bool {
    object_text == title
        || object_text
            .strip_prefix(title)
            .is_some_and(|rest| rest.starts_with(' '))
}

fn collect_preorder<'a>(node: &'a SectionNode, out: &mut Vec<&'a SectionNode>) {
    out.push(node);
    for child in &node.children {
        collect_preorder(child, out);
    }
}

/// Return a copy of `root` whose sections carry spans found in `objects`.
///
/// Sections are matched in pre-order against objects in reading order with
/// a cursor that only moves forward, so each object anchors at most one
/// section. An object whose normalized text equals the title is preferred
/// over one that merely starts with it.
///
/// A section spans from its heading object to the object before the next
/// anchored section, or to the last object. Sections whose title is never
/// found keep their existing span; the root is left untouched.
pub fn anchor_sections<T: ContentElement>(root: &SectionNode, objects: &[T]) -> SectionNode {
    let index = ObjectIndex::new(objects);
    let texts: Vec<String> = (0..index.len()).map(|pos| index.normalized_text(pos)).collect();

    let mut nodes = Vec::new();
    collect_preorder(root, &mut nodes);

    let mut cursor = 0;
    let mut anchors: Vec<Option<usize>> = vec![None; nodes.len()];
    for (i, node) in nodes.iter().enumerate().skip(1) {
        let title = normalize_heading_text(&node.title);
        if title.is_empty() {
            continue;
        }
        let remaining = &texts[cursor..];
        let found = remaining
            .iter()
            .position(|t| *t == title)
            .or_else(|| remaining.iter().position(|t| matches_title(t, &title)));
        if let Some(offset) = found {
            anchors[i] = Some(cursor + offset);
            cursor += offset + 1;
        } else {
            log::debug!("anchor.miss section={} title={:?}", node.section_id, node.title);
        }
    }

    let anchored = anchors.iter().filter(|a| a.is_some()).count();
    log::debug!(
        "anchor.summary sections={} anchored={} objects={}",
        nodes.len() - 1,
        anchored,
        index.len()
    );

    let mut spans: Vec<Option<SectionSpan>> = vec![None; nodes.len()];
    for (i, anchor) in anchors.iter().enumerate() {
        let Some(start) = *anchor else {
            continue;
        };
        let end = anchors[i + 1..]
            .iter()
            .flatten()
            .next()
            .map(|next| next - 1)
            .unwrap_or(index.len() - 1);
        spans[i] = Some(SectionSpan {
            start_object: Some(index.ordered[start].object_id().clone()),
            end_object: Some(index.ordered[end].object_id().clone()),
        });
    }

    let mut position = 0;
    rebuild(root, &mut spans, &mut position)
}

fn rebuild(node: &SectionNode, spans: &mut [Option<SectionSpan>], position: &mut usize) -> SectionNode {
    let span = spans[*position].take().or_else(|| node.span.clone());
    *position += 1;
    let children = node
        .children
        .iter()
        .map(|child| rebuild(child, spans, position))
        .collect();
    SectionNode {
        section_id: node.section_id.clone(),
        title: node.title.clone(),
        number: node.number.clone(),
        depth: node.depth,
        span,
        children,
    }
}
