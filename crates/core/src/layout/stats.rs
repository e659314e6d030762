//! Per-page baselines and document-wide signal detectors.
//!
//! Everything here needs a full pass over the document's lines before its
//! output is final: page statistics are a per-page reduce, TOC and running
//! line detection are a per-page map followed by one global reduce.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::config::StructureConfig;
use crate::types::TextLine;

/// Score a dot-leader TOC entry contributes to its page.
const TOC_ENTRY_SCORE: u32 = 2;
/// Score a "contents" heading contributes to its page.
const TOC_HEADING_SCORE: u32 = 4;
/// Pages at or above this score are TOC pages.
const TOC_PAGE_THRESHOLD: u32 = 4;
/// A running line has to repeat on at least this many pages.
const MIN_RUNNING_PAGES: usize = 2;
/// Occurrences of one text further apart than this are separate fingerprints.
const RUNNING_CLUSTER_GAP: f32 = 2.0;

/// Font-size and indentation baselines of one page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageStatistics {
    pub median_font_size: f32,
    /// Population standard deviation, floored at 1.0.
    pub stdev_font_size: f32,
    pub median_indent: f32,
}

impl PageStatistics {
    /// Baseline used when a page has no lines at all.
    pub fn fallback(indent: f32) -> Self {
        PageStatistics {
            median_font_size: 0.0,
            stdev_font_size: 1.0,
            median_indent: indent,
        }
    }
}

/// Suppression fingerprint of a running header or footer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RunningLine {
    /// Vertical position rounded to whole points.
    pub position: i32,
    /// Lower-cased, trimmed text.
    pub text: String,
}

/// Everything the candidate scorer needs to know about the document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LineStatistics {
    pub pages: BTreeMap<usize, PageStatistics>,
    pub toc_pages: BTreeSet<usize>,
    pub running_lines: BTreeSet<RunningLine>,
}

impl LineStatistics {
    /// Compute all statistics in one pass over `lines`.
    ///
    /// TOC and running-line detection only run when the matching suppression
    /// toggle is on; otherwise their sets stay empty.
    pub fn compute(lines: &[TextLine], config: &StructureConfig) -> Self {
        LineStatistics {
            pages: page_statistics(lines),
            toc_pages: if config.suppress_toc {
                detect_toc_pages(lines)
            } else {
                BTreeSet::new()
            },
            running_lines: if config.suppress_running {
                detect_running_lines(lines, config)
            } else {
                BTreeSet::new()
            },
        }
    }

    pub fn page(&self, page: usize) -> Option<&PageStatistics> {
        self.pages.get(&page)
    }

    pub fn is_toc_page(&self, page: usize) -> bool {
        self.toc_pages.contains(&page)
    }

    /// Whether `line` matches a running fingerprint.
    ///
    /// Neighbouring one-point bins also match so that per-page jitter of the
    /// baseline does not defeat suppression.
    pub fn is_running(&self, line: &TextLine) -> bool {
        if self.running_lines.is_empty() {
            return false;
        }
        let text = normalize_running_text(&line.text);
        if text.is_empty() {
            return false;
        }
        let position = line.bbox.y0.round() as i32;
        (position - 1..=position + 1).any(|p| {
            self.running_lines.contains(&RunningLine {
                position: p,
                text: text.clone(),
            })
        })
    }
}

// ---------------------------------------------------------------------------
// Page statistics
// ---------------------------------------------------------------------------

/// Median font size, population stdev and median indent for every page.
///
/// Font statistics only consider lines that carry a size; a page without
/// any size information gets median 0 and stdev 1, which makes the
/// font-size scoring term vanish instead of failing.
pub fn page_statistics(lines: &[TextLine]) -> BTreeMap<usize, PageStatistics> {
    let mut per_page: BTreeMap<usize, (Vec<f32>, Vec<f32>)> = BTreeMap::new();
    for line in lines {
        let (sizes, indents) = per_page.entry(line.page_number).or_default();
        if let Some(size) = line.font_size.filter(|s| s.is_finite() && *s > 0.0) {
            sizes.push(size);
        }
        indents.push(line.indent());
    }

    per_page
        .into_iter()
        .map(|(page, (mut sizes, mut indents))| {
            let stats = PageStatistics {
                median_font_size: median(&mut sizes).unwrap_or(0.0),
                stdev_font_size: population_stdev(&sizes).max(1.0),
                median_indent: median(&mut indents).unwrap_or(0.0),
            };
            (page, stats)
        })
        .collect()
}

fn median(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

fn population_stdev(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    variance.sqrt()
}

// ---------------------------------------------------------------------------
// Table of contents
// ---------------------------------------------------------------------------

/// Title, a run of leader glyphs, then an arabic or roman page number.
pub fn is_toc_entry(text: &str) -> bool {
    static RE_LEADER: OnceLock<Regex> = OnceLock::new();
    let re = RE_LEADER.get_or_init(|| {
        Regex::new(
            r"(?i)^[^\s.\x{2024}\x{2026}\x{22EF}\x{00B7}\x{2027}].*?(?:[.\x{2024}\x{00B7}\x{2027}]{3,}|[\x{2026}\x{22EF}]+)\s*(?:\d{1,4}|[ivxlcdm]{1,8})\s*$",
        )
        .unwrap()
    });
    re.is_match(text.trim())
}

/// A line that reads exactly "Contents" or "Table of contents".
pub fn is_toc_heading(text: &str) -> bool {
    static RE_HEADING: OnceLock<Regex> = OnceLock::new();
    let re = RE_HEADING.get_or_init(|| Regex::new(r"(?i)^(?:table\s+of\s+)?contents$").unwrap());
    re.is_match(text.trim())
}

/// Pages whose accumulated TOC score reaches [`TOC_PAGE_THRESHOLD`].
pub fn detect_toc_pages(lines: &[TextLine]) -> BTreeSet<usize> {
    let mut scores: HashMap<usize, u32> = HashMap::new();
    for line in lines {
        let text = line.text.trim();
        if text.is_empty() {
            continue;
        }
        if is_toc_entry(text) {
            *scores.entry(line.page_number).or_insert(0) += TOC_ENTRY_SCORE;
        }
        if is_toc_heading(text) {
            *scores.entry(line.page_number).or_insert(0) += TOC_HEADING_SCORE;
        }
    }
    scores
        .into_iter()
        .filter(|(_, score)| *score >= TOC_PAGE_THRESHOLD)
        .map(|(page, _)| page)
        .collect()
}

// ---------------------------------------------------------------------------
// Running headers and footers
// ---------------------------------------------------------------------------

fn normalize_running_text(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Short margin lines that repeat on at least `running_page_ratio` of pages
/// (and on two pages at minimum).
///
/// Lines inside the configured body band are ignored when the page height
/// is known; without a height every short line is considered.
pub fn detect_running_lines(lines: &[TextLine], config: &StructureConfig) -> BTreeSet<RunningLine> {
    let Some(last_page) = lines.iter().map(|l| l.page_number).max() else {
        return BTreeSet::new();
    };
    let total_pages = (last_page + 1) as f32;
    let (band_low, band_high) = config.margin_band;

    let mut occurrences: HashMap<String, Vec<(f32, usize)>> = HashMap::new();
    for line in lines {
        let text = line.text.trim();
        if text.is_empty() || text.chars().count() > config.running_max_chars {
            continue;
        }
        if let Some(height) = line.page_height.filter(|h| *h > 0.0) {
            let ratio = line.bbox.y0 / height;
            if band_low < ratio && ratio < band_high {
                continue;
            }
        }
        occurrences
            .entry(normalize_running_text(text))
            .or_default()
            .push((line.bbox.y0, line.page_number));
    }

    let mut running = BTreeSet::new();
    for (text, mut positions) in occurrences {
        positions.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        for cluster in position_clusters(&positions) {
            let pages: HashSet<usize> = cluster.iter().map(|(_, page)| *page).collect();
            if pages.len() < MIN_RUNNING_PAGES || (pages.len() as f32 / total_pages) < config.running_page_ratio {
                continue;
            }
            let mean = cluster.iter().map(|(y, _)| y).sum::<f32>() / cluster.len() as f32;
            running.insert(RunningLine {
                position: mean.round() as i32,
                text: text.clone(),
            });
        }
    }
    running
}

/// Split y-sorted occurrences wherever consecutive positions are further
/// apart than [`RUNNING_CLUSTER_GAP`], so a text repeated in both the header
/// and the footer band yields one cluster per band.
fn position_clusters(sorted: &[(f32, usize)]) -> Vec<&[(f32, usize)]> {
    let mut clusters = Vec::new();
    let mut start = 0;
    for i in 1..sorted.len() {
        if sorted[i].0 - sorted[i - 1].0 > RUNNING_CLUSTER_GAP {
            clusters.push(&sorted[start..i]);
            start = i;
        }
    }
    if start < sorted.len() {
        clusters.push(&sorted[start..]);
    }
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;

    fn line(page: usize, idx: usize, text: &str, x: f32, y: f32, size: Option<f32>) -> TextLine {
        TextLine {
            text: text.to_string(),
            bbox: BoundingBox::new(x, y, x + 200.0, y + 10.0),
            font_family: None,
            font_size: size,
            is_bold: false,
            is_caps: false,
            page_number: page,
            line_index: idx,
            column_index: None,
            page_height: Some(800.0),
        }
    }

    // --- page statistics ---

    #[test]
    fn test_page_statistics_median_and_stdev() {
        let lines = vec![
            line(0, 0, "a", 72.0, 100.0, Some(10.0)),
            line(0, 1, "b", 72.0, 120.0, Some(10.0)),
            line(0, 2, "c", 90.0, 140.0, Some(16.0)),
        ];
        let stats = page_statistics(&lines);
        let page = stats[&0];
        assert_eq!(page.median_font_size, 10.0);
        // pstdev of [10, 10, 16] = sqrt(8) ~ 2.83
        assert!((page.stdev_font_size - 8f32.sqrt()).abs() < 1e-4);
        assert_eq!(page.median_indent, 72.0);
    }

    #[test]
    fn test_page_statistics_even_median() {
        let lines = vec![
            line(0, 0, "a", 70.0, 100.0, Some(10.0)),
            line(0, 1, "b", 80.0, 120.0, Some(12.0)),
        ];
        let page = page_statistics(&lines)[&0];
        assert_eq!(page.median_font_size, 11.0);
        assert_eq!(page.median_indent, 75.0);
    }

    #[test]
    fn test_page_statistics_stdev_floor() {
        let lines = vec![
            line(0, 0, "a", 72.0, 100.0, Some(10.0)),
            line(0, 1, "b", 72.0, 120.0, Some(10.0)),
        ];
        assert_eq!(page_statistics(&lines)[&0].stdev_font_size, 1.0);
    }

    #[test]
    fn test_page_statistics_without_font_sizes() {
        let lines = vec![line(2, 0, "a", 50.0, 100.0, None)];
        let page = page_statistics(&lines)[&2];
        assert_eq!(page.median_font_size, 0.0);
        assert_eq!(page.stdev_font_size, 1.0);
        assert_eq!(page.median_indent, 50.0);
    }

    #[test]
    fn test_page_statistics_empty() {
        assert!(page_statistics(&[]).is_empty());
    }

    // --- TOC ---

    #[test]
    fn test_toc_entry_patterns() {
        assert!(is_toc_entry("1 Introduction ........ 3"));
        assert!(is_toc_entry("5.2 Transformer connections .........4"));
        assert!(is_toc_entry("Preface \u{2026} xv"));
        assert!(is_toc_entry("Annex A \u{00B7}\u{00B7}\u{00B7}\u{00B7} 32"));
        assert!(!is_toc_entry("1 Introduction"));
        assert!(!is_toc_entry("Summary ... details"));
        assert!(!is_toc_entry("........ 3"));
    }

    #[test]
    fn test_toc_heading_whole_line() {
        assert!(is_toc_heading("TABLE OF CONTENTS"));
        assert!(is_toc_heading("  Contents "));
        assert!(is_toc_heading("Table  of\tContents"));
        assert!(!is_toc_heading("Protocol overview"));
        assert!(!is_toc_heading("Contentsfoo"));
        assert!(!is_toc_heading("2 Contents of submittals"));
        assert!(!is_toc_heading("Contents of the operation manual"));
    }

    #[test]
    fn test_contents_heading_in_body_is_not_toc_page() {
        let lines = vec![
            line(0, 0, "1 Scope", 72.0, 100.0, Some(16.0)),
            line(0, 1, "Body text of the scope.", 72.0, 120.0, Some(10.0)),
            line(0, 2, "2 Contents of submittals", 72.0, 140.0, Some(16.0)),
            line(0, 3, "Body text of the submittals.", 72.0, 160.0, Some(10.0)),
            line(0, 4, "3 Design", 72.0, 180.0, Some(16.0)),
        ];
        assert!(detect_toc_pages(&lines).is_empty());
    }

    #[test]
    fn test_detect_toc_pages_heading_alone_suffices() {
        let lines = vec![
            line(0, 0, "Table of Contents", 72.0, 100.0, Some(18.0)),
            line(1, 1, "1 Introduction", 72.0, 100.0, Some(18.0)),
        ];
        assert_eq!(detect_toc_pages(&lines), BTreeSet::from([0]));
    }

    #[test]
    fn test_detect_toc_pages_needs_two_entries() {
        let single = vec![line(0, 0, "1 Introduction ........ 3", 72.0, 100.0, None)];
        assert!(detect_toc_pages(&single).is_empty());

        let double = vec![
            line(0, 0, "1 Introduction ........ 3", 72.0, 100.0, None),
            line(0, 1, "2 Scope ........ 5", 72.0, 120.0, None),
        ];
        assert_eq!(detect_toc_pages(&double), BTreeSet::from([0]));
    }

    // --- running lines ---

    fn three_pages_with_header() -> Vec<TextLine> {
        let mut lines = Vec::new();
        for page in 0..3 {
            lines.push(line(page, page * 3, "Sample Specification", 72.0, 40.0, Some(9.0)));
            lines.push(line(page, page * 3 + 1, "Body text", 72.0, 400.0, Some(10.0)));
            lines.push(line(page, page * 3 + 2, "Company Confidential", 72.0, 760.0, Some(9.0)));
        }
        lines
    }

    #[test]
    fn test_detect_running_lines_in_margins() {
        let running = detect_running_lines(&three_pages_with_header(), &StructureConfig::default());
        let texts: Vec<&str> = running.iter().map(|r| r.text.as_str()).collect();
        assert!(texts.contains(&"sample specification"));
        assert!(texts.contains(&"company confidential"));
        // Body text repeats too, but sits inside the body band.
        assert!(!texts.contains(&"body text"));
    }

    #[test]
    fn test_detect_running_lines_ratio() {
        let mut lines = three_pages_with_header();
        lines.push(line(3, 9, "Appendix note", 72.0, 40.0, Some(9.0)));
        lines.push(line(4, 10, "Other", 72.0, 400.0, Some(9.0)));
        // "sample specification" is on 3 of 5 pages = 0.6
        let running = detect_running_lines(&lines, &StructureConfig::default());
        assert!(running.iter().any(|r| r.text == "sample specification"));
        assert!(!running.iter().any(|r| r.text == "appendix note"));
    }

    #[test]
    fn test_detect_running_lines_skips_long_lines() {
        let long = "x".repeat(81);
        let lines: Vec<TextLine> = (0..3).map(|p| line(p, p, &long, 72.0, 20.0, None)).collect();
        assert!(detect_running_lines(&lines, &StructureConfig::default()).is_empty());
    }

    #[test]
    fn test_text_in_header_and_footer_gets_two_fingerprints() {
        let mut lines = Vec::new();
        for page in 0..3 {
            lines.push(line(page, page * 3, "ACME-DOC-001", 72.0, 40.0 + page as f32 * 0.4, None));
            lines.push(line(page, page * 3 + 1, "Body text", 72.0, 400.0, None));
            lines.push(line(page, page * 3 + 2, "ACME-DOC-001", 72.0, 790.0, None));
        }
        let running = detect_running_lines(&lines, &StructureConfig::default());
        let positions: Vec<i32> = running
            .iter()
            .filter(|r| r.text == "acme-doc-001")
            .map(|r| r.position)
            .collect();
        assert_eq!(positions, vec![40, 790]);

        let stats = LineStatistics::compute(&lines, &StructureConfig::default());
        assert!(stats.is_running(&line(1, 3, "ACME-DOC-001", 72.0, 40.4, None)));
        assert!(stats.is_running(&line(1, 5, "ACME-DOC-001", 72.0, 790.0, None)));
    }

    #[test]
    fn test_running_cluster_needs_enough_pages() {
        let mut lines = Vec::new();
        for page in 0..4 {
            lines.push(line(page, page * 2, "Draft", 72.0, 40.0, None));
            lines.push(line(page, page * 2 + 1, "Body text", 72.0, 400.0, None));
        }
        // Same text once in the footer band: too rare to count there.
        lines.push(line(0, 9, "Draft", 72.0, 780.0, None));
        let running = detect_running_lines(&lines, &StructureConfig::default());
        assert_eq!(
            running.into_iter().collect::<Vec<_>>(),
            vec![RunningLine {
                position: 40,
                text: "draft".to_string()
            }]
        );
    }

    #[test]
    fn test_single_page_has_no_running_lines() {
        let lines = vec![line(0, 0, "Sample Specification", 72.0, 40.0, None)];
        assert!(detect_running_lines(&lines, &StructureConfig::default()).is_empty());
    }

    #[test]
    fn test_is_running_tolerates_jitter() {
        let config = StructureConfig::default();
        let lines = three_pages_with_header();
        let stats = LineStatistics::compute(&lines, &config);

        assert!(stats.is_running(&line(0, 0, "Sample Specification", 72.0, 40.6, None)));
        assert!(stats.is_running(&line(0, 0, "  sample specification ", 72.0, 39.5, None)));
        assert!(!stats.is_running(&line(0, 0, "Sample Specification", 72.0, 300.0, None)));
        assert!(!stats.is_running(&line(0, 0, "Body text", 72.0, 400.0, None)));
    }

    #[test]
    fn test_compute_respects_toggles() {
        let mut lines = three_pages_with_header();
        lines.push(line(0, 99, "Contents", 72.0, 200.0, None));
        let config = StructureConfig {
            suppress_toc: false,
            suppress_running: false,
            ..StructureConfig::default()
        };
        let stats = LineStatistics::compute(&lines, &config);
        assert!(stats.toc_pages.is_empty());
        assert!(stats.running_lines.is_empty());
        assert_eq!(stats.pages.len(), 3);
    }
}
