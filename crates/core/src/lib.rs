//! Core library for specstruct
//!
//! This crate implements the **Functional Core** of specstruct, following the
//! Functional Core - Imperative Shell architectural pattern. It recovers the
//! heading hierarchy of a technical document from positioned text lines and
//! maps parsed content objects onto the resulting sections.
//!
//! # Architecture Overview
//!
//! - **`specstruct_core`** (this crate): Pure transformation functions with zero I/O
//! - **`specstruct`**: File loading, configuration and output (the Imperative Shell)
//!
//! Every function here takes its inputs and a [`StructureConfig`] explicitly
//! and returns a value; nothing reads files or global state. Diagnostics go
//! through the `log` facade and cost nothing unless the shell installs a
//! logger.
//!
//! # Pipeline
//!
//! 1. [`layout::stats`]: per-page font and indent baselines, table-of-contents
//!    pages and running headers/footers.
//! 2. [`layout::scorer`]: per-line heading score and rejection rules.
//! 3. [`tree`]: level inference and stack-based nesting of candidates.
//! 4. [`anchor`]: locate each detected section among parsed objects.
//! 5. [`spans`]: resolve section spans into per-section object chunks.
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use specstruct_core::{detect_headers, StructureConfig};
//!
//! let detection = detect_headers(&lines, &StructureConfig::default())?;
//! for item in &detection.headers {
//!     println!("{:?} {} (p. {})", item.number, item.title, item.page);
//! }
//! ```

pub mod anchor;
pub mod config;
pub mod layout;
pub mod spans;
pub mod tree;
pub mod types;

use std::fmt;

use serde::Serialize;
use thiserror::Error;

pub use anchor::anchor_sections;
pub use config::{OverlapPolicy, ScoreWeights, StructureConfig};
pub use layout::LineStatistics;
pub use spans::{chunk_map, resolve_sections};
pub use tree::{flatten_headers, to_section_tree};
pub use types::{
    ContentElement, HeaderItem, HeaderNode, HeadingLevel, ObjectId, ParsedObject, SectionChunk,
    SectionId, SectionNode, SectionSpan, TextLine,
};

/// Input a stage needs that the caller did not supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Precondition {
    LinesMissing,
    SectionsMissing,
    ParsedObjectsMissing,
}

impl Precondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Precondition::LinesMissing => "lines_missing",
            Precondition::SectionsMissing => "sections_missing",
            Precondition::ParsedObjectsMissing => "parsed_objects_missing",
        }
    }
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StructureError {
    #[error("missing precondition: {0}")]
    MissingPrecondition(Precondition),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result of heading detection over one document.
#[derive(Debug, Clone, Serialize)]
pub struct HeaderDetection {
    /// Pre-order flat list, 1-based pages.
    pub headers: Vec<HeaderItem>,
    pub tree: Vec<HeaderNode>,
    pub statistics: LineStatistics,
}

/// Detect the heading hierarchy of a document.
///
/// Lines may arrive in any order; candidates are processed in
/// `(page_number, line_index)` order. A document with no qualifying
/// heading yields an empty result rather than an error.
pub fn detect_headers(
    lines: &[TextLine],
    config: &StructureConfig,
) -> Result<HeaderDetection, StructureError> {
    if lines.is_empty() {
        return Err(StructureError::MissingPrecondition(Precondition::LinesMissing));
    }

    let statistics = LineStatistics::compute(lines, config);
    let candidates = layout::collect_candidates(lines, &statistics, config);
    let tree = tree::build_tree(&candidates);
    let headers = flatten_headers(&tree);

    log::debug!(
        "headers.summary lines={} pages={} toc_pages={} running_lines={} candidates={} headers={}",
        lines.len(),
        statistics.pages.len(),
        statistics.toc_pages.len(),
        statistics.running_lines.len(),
        candidates.len(),
        headers.len()
    );

    Ok(HeaderDetection {
        headers,
        tree,
        statistics,
    })
}

/// Detection, anchoring and span resolution in one pass.
#[derive(Debug, Clone, Serialize)]
pub struct StructureRecovery {
    pub detection: HeaderDetection,
    pub sections: SectionNode,
    pub chunks: Vec<SectionChunk>,
}

/// Run the whole pipeline: detect headings in `lines`, anchor the resulting
/// sections in `objects` and resolve one chunk per section.
pub fn recover_structure<T: ContentElement>(
    lines: &[TextLine],
    objects: &[T],
    title: &str,
    config: &StructureConfig,
) -> Result<StructureRecovery, StructureError> {
    let detection = detect_headers(lines, config)?;
    let sections = anchor_sections(&to_section_tree(&detection.tree, title), objects);
    let chunks = resolve_sections(&sections, objects, config)?;
    Ok(StructureRecovery {
        detection,
        sections,
        chunks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;

    fn line(page: usize, idx: usize, text: &str, size: f32) -> TextLine {
        TextLine {
            text: text.to_string(),
            bbox: BoundingBox::new(72.0, 100.0 + idx as f32 * 16.0, 500.0, 112.0 + idx as f32 * 16.0),
            font_family: Some("Times".to_string()),
            font_size: Some(size),
            is_bold: false,
            is_caps: false,
            page_number: page,
            line_index: idx,
            column_index: None,
            page_height: Some(842.0),
        }
    }

    fn nested_document() -> Vec<TextLine> {
        vec![
            line(0, 0, "1 Introduction", 18.0),
            line(0, 1, "This document covers the general requirements.", 10.0),
            line(0, 2, "1.1 Background", 14.0),
            line(0, 3, "Earlier revisions applied to a smaller scope.", 10.0),
            line(0, 4, "1.1.1 Scope", 12.0),
            line(0, 5, "Applies to all installations.", 10.0),
            line(0, 6, "Contractors shall comply in full.", 10.0),
            line(0, 7, "Deviations require written approval.", 10.0),
        ]
    }

    #[test]
    fn test_detect_headers_nested_chain() {
        let detection = detect_headers(&nested_document(), &StructureConfig::default()).unwrap();

        let numbers: Vec<Option<&str>> = detection.headers.iter().map(|h| h.number.as_deref()).collect();
        assert_eq!(numbers, vec![Some("1"), Some("1.1"), Some("1.1.1")]);

        assert_eq!(detection.tree.len(), 1);
        let intro = &detection.tree[0];
        assert_eq!(intro.children.len(), 1);
        assert_eq!(intro.children[0].children.len(), 1);
        assert_eq!(intro.children[0].children[0].title, "Scope");
        assert_eq!(detection.headers[0].page, 1);
    }

    #[test]
    fn test_detect_headers_skips_toc_page() {
        let mut lines = vec![
            line(0, 0, "Table of Contents", 14.0),
            line(0, 1, "1 Introduction ........ 3", 14.0),
            line(0, 2, "2 Requirements ........ 5", 14.0),
        ];
        lines.extend([
            line(1, 3, "1 Introduction", 16.0),
            line(1, 4, "Body text of the introduction.", 10.0),
            line(1, 5, "More body text.", 10.0),
        ]);
        let detection = detect_headers(&lines, &StructureConfig::default()).unwrap();

        assert_eq!(detection.headers.len(), 1);
        assert_eq!(detection.headers[0].title, "Introduction");
        assert_eq!(detection.headers[0].page, 2);
        assert!(detection.statistics.toc_pages.contains(&0));
    }

    fn document_with_running_header() -> Vec<TextLine> {
        let mut lines = Vec::new();
        for page in 0..3 {
            let mut header = line(page, lines.len(), "ACME DESIGN MANUAL", 16.0);
            header.bbox = BoundingBox::new(72.0, 30.0, 500.0, 46.0);
            header.is_bold = true;
            lines.push(header);
            lines.push(line(page, lines.len(), &format!("{} Section {}", page + 1, page), 14.0));
            for n in 0..3 {
                lines.push(line(page, lines.len(), &format!("Body line {n} of page {page}."), 10.0));
            }
        }
        lines
    }

    #[test]
    fn test_detect_headers_suppresses_running_header() {
        let lines = document_with_running_header();
        let config = StructureConfig::default();
        let detection = detect_headers(&lines, &config).unwrap();

        assert_eq!(detection.statistics.running_lines.len(), 1);
        assert_eq!(
            layout::evaluate_line(&lines[0], &detection.statistics, &config),
            Err(layout::Rejection::RunningLine)
        );
        let titles: Vec<&str> = detection.headers.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["Section 0", "Section 1", "Section 2"]);

        let config = StructureConfig {
            suppress_running: false,
            ..StructureConfig::default()
        };
        let detection = detect_headers(&lines, &config).unwrap();
        let running = detection
            .headers
            .iter()
            .filter(|h| h.title == "ACME DESIGN MANUAL")
            .count();
        assert_eq!(running, 3);
    }

    #[test]
    fn test_detect_headers_keeps_contents_of_heading() {
        let lines = vec![
            line(0, 0, "1 Scope", 16.0),
            line(0, 1, "This section defines the scope.", 10.0),
            line(0, 2, "2 Contents of submittals", 16.0),
            line(0, 3, "Submittals shall be bound.", 10.0),
            line(0, 4, "3 Design", 16.0),
            line(0, 5, "Design loads follow.", 10.0),
        ];
        let detection = detect_headers(&lines, &StructureConfig::default()).unwrap();

        assert!(detection.statistics.toc_pages.is_empty());
        let numbers: Vec<Option<&str>> = detection.headers.iter().map(|h| h.number.as_deref()).collect();
        assert_eq!(numbers, vec![Some("1"), Some("2"), Some("3")]);
    }

    #[test]
    fn test_detect_headers_no_candidates_is_empty() {
        let lines = vec![
            line(0, 0, "Plain text only.", 10.0),
            line(0, 1, "Nothing stands out here.", 10.0),
        ];
        let detection = detect_headers(&lines, &StructureConfig::default()).unwrap();
        assert!(detection.headers.is_empty());
        assert!(detection.tree.is_empty());
    }

    #[test]
    fn test_detect_headers_requires_lines() {
        let err = detect_headers(&[], &StructureConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            StructureError::MissingPrecondition(Precondition::LinesMissing)
        ));
        assert_eq!(err.to_string(), "missing precondition: lines_missing");
    }

    #[test]
    fn test_detect_headers_is_order_independent() {
        let mut shuffled = nested_document();
        shuffled.reverse();
        let config = StructureConfig::default();
        let forward = detect_headers(&nested_document(), &config).unwrap();
        let backward = detect_headers(&shuffled, &config).unwrap();
        assert_eq!(forward.headers, backward.headers);
    }

    #[test]
    fn test_recover_structure_end_to_end() {
        let lines = nested_document();
        let objects: Vec<ParsedObject> = lines
            .iter()
            .map(|l| ParsedObject::paragraph(format!("obj{}", l.line_index), Some(0), l.line_index, l.text.clone()))
            .collect();

        let recovery = recover_structure(&lines, &objects, "Sample", &StructureConfig::default()).unwrap();
        let chunk = |id: &str| {
            recovery
                .chunks
                .iter()
                .find(|c| c.section_id.as_str() == id)
                .map(|c| c.object_ids.iter().map(|o| o.as_str().to_string()).collect::<Vec<_>>())
                .unwrap()
        };

        // Headings are excluded; text before a subsection stays with its parent.
        assert_eq!(chunk("s-1-0::gap-000001-000001"), vec!["obj1"]);
        assert_eq!(chunk("s-2-0::gap-000003-000003"), vec!["obj3"]);
        assert_eq!(chunk("s-3-0"), vec!["obj5", "obj6", "obj7"]);
        assert_eq!(chunk("s-2-0"), vec!["obj3", "obj5", "obj6", "obj7"]);
        assert_eq!(chunk("s-1-0"), vec!["obj1", "obj3", "obj5", "obj6", "obj7"]);
        assert_eq!(chunk("root"), vec!["obj1", "obj3", "obj5", "obj6", "obj7"]);

        let order: Vec<&str> = recovery.chunks.iter().map(|c| c.section_id.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "root",
                "s-1-0",
                "s-1-0::gap-000001-000001",
                "s-2-0",
                "s-2-0::gap-000003-000003",
                "s-3-0"
            ]
        );

        let scope = recovery.chunks.iter().find(|c| c.section_id.as_str() == "s-3-0").unwrap();
        assert_eq!(scope.header_path, "1 Introduction > 1.1 Background");
        let intro_body = &recovery.chunks[2];
        assert!(intro_body.is_leaf);
        assert_eq!(intro_body.depth, 2);
        assert_eq!(intro_body.header_path, "1 Introduction");
    }

    #[test]
    fn test_recover_structure_keeps_parent_intro_text() {
        let lines = vec![
            line(0, 0, "1 Introduction", 18.0),
            line(0, 1, "This document covers the general requirements.", 10.0),
            line(0, 2, "1.1 Background", 14.0),
            line(0, 3, "Earlier revisions applied.", 10.0),
        ];
        let objects: Vec<ParsedObject> = lines
            .iter()
            .map(|l| ParsedObject::paragraph(format!("obj{}", l.line_index), Some(0), l.line_index, l.text.clone()))
            .collect();

        let recovery = recover_structure(&lines, &objects, "Sample", &StructureConfig::default()).unwrap();
        let intro = recovery.chunks.iter().find(|c| c.section_id.as_str() == "s-1-0").unwrap();
        assert_eq!(intro.object_ids, vec![ObjectId::new("obj1"), ObjectId::new("obj3")]);

        let leaves: Vec<&ObjectId> = recovery
            .chunks
            .iter()
            .filter(|c| c.is_leaf)
            .flat_map(|c| c.object_ids.iter())
            .collect();
        assert_eq!(leaves, vec![&ObjectId::new("obj1"), &ObjectId::new("obj3")]);
    }

    #[test]
    fn test_precondition_serializes_snake_case() {
        let json = serde_json::to_string(&Precondition::ParsedObjectsMissing).unwrap();
        assert_eq!(json, "\"parsed_objects_missing\"");
    }
}
