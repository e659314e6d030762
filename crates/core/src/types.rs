use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(String);

impl SectionId {
    pub fn new(id: impl Into<String>) -> Self {
        SectionId(id.into())
    }

    /// Generated id for a detected heading: `s-{level}-{index}`.
    pub fn numbered(level: u8, index: usize) -> Self {
        SectionId(format!("s-{}-{}", level, index))
    }

    /// Id of the synthetic node representing the whole document.
    pub fn root() -> Self {
        SectionId("root".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        ObjectId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct HeadingLevel(u8);

impl HeadingLevel {
    pub const MAX: u8 = 6;

    /// Clamp any depth into the valid `1..=6` range.
    pub fn clamped(value: usize) -> Self {
        HeadingLevel(value.clamp(1, Self::MAX as usize) as u8)
    }

    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for HeadingLevel {
    type Error = InvalidHeadingLevel;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (1..=Self::MAX).contains(&value) {
            Ok(HeadingLevel(value))
        } else {
            Err(InvalidHeadingLevel)
        }
    }
}

impl From<HeadingLevel> for u8 {
    fn from(level: HeadingLevel) -> Self {
        level.0
    }
}

// ---------------------------------------------------------------------------
// Positioned lines
// ---------------------------------------------------------------------------

/// Axis-aligned box `(x0, y0, x1, y1)` in page points, y growing downwards.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        BoundingBox { x0, y0, x1, y1 }
    }
}

/// One visually distinct line of text produced by an upstream layout
/// extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,
    pub bbox: BoundingBox,
    #[serde(default)]
    pub font_family: Option<String>,
    #[serde(default)]
    pub font_size: Option<f32>,
    #[serde(default)]
    pub is_bold: bool,
    #[serde(default)]
    pub is_caps: bool,
    /// 0-based page number.
    pub page_number: usize,
    /// Monotonic across the whole document.
    pub line_index: usize,
    #[serde(default)]
    pub column_index: Option<usize>,
    /// Height of the page the line sits on, when the extractor knows it.
    #[serde(default)]
    pub page_height: Option<f32>,
}

impl TextLine {
    pub fn indent(&self) -> f32 {
        self.bbox.x0
    }

    pub fn width(&self) -> f32 {
        self.bbox.x1 - self.bbox.x0
    }
}

// ---------------------------------------------------------------------------
// Headings
// ---------------------------------------------------------------------------

/// One node of the recovered heading tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderNode {
    pub id: String,
    pub title: String,
    pub level: HeadingLevel,
    /// 0-based page.
    pub page: usize,
    pub line_index: usize,
    pub number: Option<String>,
    pub score: f32,
    pub children: Vec<HeaderNode>,
}

/// Flat heading record handed to persistence and downstream extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderItem {
    pub number: Option<String>,
    pub title: String,
    /// 1-based page.
    pub page: usize,
    pub line_index: usize,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SectionSpan {
    #[serde(default, alias = "start_object_id")]
    pub start_object: Option<ObjectId>,
    #[serde(default, alias = "end_object_id")]
    pub end_object: Option<ObjectId>,
}

impl SectionSpan {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        SectionSpan {
            start_object: Some(ObjectId::new(start)),
            end_object: Some(ObjectId::new(end)),
        }
    }
}

/// Persisted structural record consumed by the span resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionNode {
    pub section_id: SectionId,
    pub title: String,
    #[serde(default)]
    pub number: Option<String>,
    pub depth: usize,
    #[serde(default)]
    pub span: Option<SectionSpan>,
    #[serde(default)]
    pub children: Vec<SectionNode>,
}

impl SectionNode {
    /// `"number title"`, or just the title for unnumbered sections.
    pub fn label(&self) -> String {
        match &self.number {
            Some(number) if !number.is_empty() => format!("{} {}", number, self.title),
            _ => self.title.clone(),
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(SectionNode::node_count).sum::<usize>()
    }
}

/// Ordered object ids assigned to one section, leaf or ancestor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionChunk {
    pub section_id: SectionId,
    pub header_path: String,
    pub depth: usize,
    pub is_leaf: bool,
    pub object_ids: Vec<ObjectId>,
}

// ---------------------------------------------------------------------------
// Parsed content objects
// ---------------------------------------------------------------------------

/// The fields every parsed content element carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectBase {
    pub object_id: ObjectId,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub page_index: Option<usize>,
    #[serde(default)]
    pub order_index: usize,
    #[serde(default)]
    pub bbox: Option<BoundingBox>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineObject {
    #[serde(flatten)]
    pub base: ObjectBase,
    #[serde(default)]
    pub line_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParagraphObject {
    #[serde(flatten)]
    pub base: ObjectBase,
    #[serde(default)]
    pub paragraph_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderObject {
    #[serde(flatten)]
    pub base: ObjectBase,
    pub level: u8,
    #[serde(default)]
    pub number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableObject {
    #[serde(flatten)]
    pub base: ObjectBase,
    #[serde(default)]
    pub n_rows: Option<usize>,
    #[serde(default)]
    pub n_cols: Option<usize>,
    #[serde(default)]
    pub markdown: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigureObject {
    #[serde(flatten)]
    pub base: ObjectBase,
    #[serde(default)]
    pub caption: Option<String>,
}

/// Content element produced by an upstream parser, one variant per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ParsedObject {
    Line(LineObject),
    #[serde(rename = "para")]
    Paragraph(ParagraphObject),
    Header(HeaderObject),
    Table(TableObject),
    Figure(FigureObject),
}

impl ParsedObject {
    /// Convenience constructor for a paragraph, the most common kind.
    pub fn paragraph(
        object_id: impl Into<String>,
        page_index: Option<usize>,
        order_index: usize,
        text: impl Into<String>,
    ) -> Self {
        ParsedObject::Paragraph(ParagraphObject {
            base: ObjectBase {
                object_id: ObjectId::new(object_id),
                text: Some(text.into()),
                page_index,
                order_index,
                bbox: None,
            },
            paragraph_index: Some(order_index),
        })
    }

    pub fn base(&self) -> &ObjectBase {
        match self {
            ParsedObject::Line(o) => &o.base,
            ParsedObject::Paragraph(o) => &o.base,
            ParsedObject::Header(o) => &o.base,
            ParsedObject::Table(o) => &o.base,
            ParsedObject::Figure(o) => &o.base,
        }
    }
}

/// The narrow view of a content element the span resolver works with.
pub trait ContentElement {
    fn object_id(&self) -> &ObjectId;
    fn page_index(&self) -> Option<usize>;
    fn order_index(&self) -> usize;
    fn text(&self) -> Option<&str>;
}

impl ContentElement for ParsedObject {
    fn object_id(&self) -> &ObjectId {
        &self.base().object_id
    }

    fn page_index(&self) -> Option<usize> {
        self.base().page_index
    }

    fn order_index(&self) -> usize {
        self.base().order_index
    }

    /// Tables fall back to their markdown, figures to their caption.
    fn text(&self) -> Option<&str> {
        let base = self.base().text.as_deref();
        match self {
            ParsedObject::Table(t) => base.or(t.markdown.as_deref()),
            ParsedObject::Figure(f) => base.or(f.caption.as_deref()),
            _ => base,
        }
    }
}

#[derive(Debug, Error)]
#[error("Heading level must be between 1 and 6")]
pub struct InvalidHeadingLevel;
