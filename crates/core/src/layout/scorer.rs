//! Heading-candidate scoring.
//!
//! Each line is judged on its own once the page statistics exist, so this
//! stage has no line-to-line dependency.

use std::fmt;

use serde::Serialize;

use super::numbering::{split_number, Numbering};
use super::stats::{is_toc_entry, LineStatistics, PageStatistics};
use crate::config::{ScoreWeights, StructureConfig};
use crate::types::TextLine;

/// A scored, provisional heading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderCandidate<'a> {
    pub line: &'a TextLine,
    pub score: f32,
    pub number: Option<Numbering>,
    pub title: String,
    /// Depth of the numbering prefix clamped to `1..=6`, or 0 when unnumbered.
    pub inferred_level: usize,
}

/// Why a line did not become a candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    Empty,
    TocPage,
    TocEntry,
    RunningLine,
    ProbableTable,
    BelowThreshold(f32),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Empty => write!(f, "empty"),
            Rejection::TocPage => write!(f, "toc_page"),
            Rejection::TocEntry => write!(f, "toc_entry"),
            Rejection::RunningLine => write!(f, "running_line"),
            Rejection::ProbableTable => write!(f, "probable_table"),
            Rejection::BelowThreshold(score) => write!(f, "below_threshold({score:.3})"),
        }
    }
}

/// Table and figure captions, or lines dominated by digits.
pub fn is_probable_table(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    if lowered.starts_with("table ") || lowered.starts_with("figure ") {
        return true;
    }
    let digits = text.chars().filter(|c| c.is_numeric()).count();
    let alpha = text.chars().filter(|c| c.is_alphabetic()).count();
    alpha >= 1 && digits > alpha
}

fn indent_term(indent_delta: f32, numbered: bool) -> f32 {
    if indent_delta > 12.0 {
        0.6
    } else if indent_delta > 6.0 {
        0.3
    } else if indent_delta > 2.0 {
        0.1
    } else if numbered && indent_delta < -12.0 {
        0.2
    } else if numbered && indent_delta < -6.0 {
        0.1
    } else {
        0.0
    }
}

fn length_penalty(text: &str) -> f32 {
    match text.trim().chars().count() {
        n if n > 120 => 0.4,
        n if n > 80 => 0.2,
        _ => 0.0,
    }
}

/// Heading score of one line against its page baseline, floored at 0.
///
/// Numbering dominates, then font-size deviation, then emphasis, then
/// indentation; long lines are penalized.
pub fn score_line(
    line: &TextLine,
    page: &PageStatistics,
    numbering: Option<&Numbering>,
    weights: &ScoreWeights,
) -> f32 {
    let size = line.font_size.unwrap_or(page.median_font_size);
    let z = ((size - page.median_font_size) / page.stdev_font_size.max(1.0)).max(0.0);
    let bold = if line.is_bold { 1.0 } else { 0.0 };
    let caps = if line.is_caps { 0.6 } else { 0.0 };
    let leading = match numbering {
        Some(n) => 0.9 + 0.1 * n.depth().saturating_sub(1) as f32,
        None => 0.0,
    };
    let indent = indent_term(page.median_indent - line.indent(), numbering.is_some());

    let score = weights.font_size * z
        + weights.bold * bold
        + weights.caps * caps
        + weights.numbering * leading
        + weights.indent * indent
        - length_penalty(&line.text);
    score.max(0.0)
}

/// Judge one line; rejection rules short-circuit in a fixed order.
pub fn evaluate_line<'a>(
    line: &'a TextLine,
    stats: &LineStatistics,
    config: &StructureConfig,
) -> Result<HeaderCandidate<'a>, Rejection> {
    let text = line.text.trim();
    if text.is_empty() {
        return Err(Rejection::Empty);
    }
    if config.suppress_toc && stats.is_toc_page(line.page_number) {
        return Err(Rejection::TocPage);
    }
    if config.suppress_toc && is_toc_entry(text) {
        return Err(Rejection::TocEntry);
    }
    if config.suppress_running && stats.is_running(line) {
        return Err(Rejection::RunningLine);
    }
    if is_probable_table(text) {
        return Err(Rejection::ProbableTable);
    }

    let (number, title) = split_number(text);
    let page = stats
        .page(line.page_number)
        .copied()
        .unwrap_or_else(|| PageStatistics::fallback(line.indent()));
    let score = score_line(line, &page, number.as_ref(), &config.weights);
    if score < config.score_threshold {
        return Err(Rejection::BelowThreshold(score));
    }

    let inferred_level = number.as_ref().map_or(0, |n| n.depth().clamp(1, 6));
    let title = if title.is_empty() {
        text.to_string()
    } else {
        title
    };

    Ok(HeaderCandidate {
        line,
        score,
        number,
        title,
        inferred_level,
    })
}

/// All surviving candidates of a document, in `(page, line)` order.
pub fn collect_candidates<'a>(
    lines: &'a [TextLine],
    stats: &LineStatistics,
    config: &StructureConfig,
) -> Vec<HeaderCandidate<'a>> {
    let mut candidates: Vec<HeaderCandidate<'a>> = lines
        .iter()
        .filter_map(|line| match evaluate_line(line, stats, config) {
            Ok(candidate) => Some(candidate),
            Err(reason) => {
                log::trace!(
                    "headers.reject page={} line={} reason={} text={:?}",
                    line.page_number,
                    line.line_index,
                    reason,
                    line.text
                );
                None
            }
        })
        .collect();
    candidates.sort_by_key(|c| (c.line.page_number, c.line.line_index));
    candidates
}
