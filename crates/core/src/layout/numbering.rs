//! Numbering prefixes: `1.2.3`, `IV`, `A.1` and friends.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberingScheme {
    Numeric,
    Roman,
    Letter,
}

/// A parsed numbering prefix with trailing `.`/`-` already stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Numbering {
    pub label: String,
    pub scheme: NumberingScheme,
}

impl Numbering {
    pub fn as_str(&self) -> &str {
        &self.label
    }

    /// Outline depth of the prefix.
    ///
    /// Numeric and roman prefixes count their dot-separated segments. A
    /// letter outline counts one more, so `A` sits at depth 2 and `A.1` at
    /// depth 3, below numeric top-level headings.
    pub fn depth(&self) -> usize {
        let segments = self.label.split('.').filter(|s| !s.is_empty()).count().max(1);
        match self.scheme {
            NumberingScheme::Numeric | NumberingScheme::Roman => segments,
            NumberingScheme::Letter => segments + 1,
        }
    }
}

fn numeric_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+(?:\.\d+){0,5}\b").unwrap())
}

fn roman_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^[ivxlcdm]+(?:\.[a-z0-9]+){0,4}\b").unwrap())
}

/// Well-formed roman numerals from 1 to 89.
fn valid_roman_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(?:XL|L?X{0,3})(?:IX|IV|V?I{0,3})$").unwrap())
}

fn letter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z](?:\.[A-Za-z0-9]+){0,4}\b").unwrap())
}

fn match_prefix(text: &str) -> Option<(usize, NumberingScheme)> {
    if let Some(m) = numeric_re().find(text) {
        return Some((m.end(), NumberingScheme::Numeric));
    }
    if let Some(m) = roman_re().find(text) {
        let head = m.as_str().split('.').next().unwrap_or_default();
        if !head.is_empty() && valid_roman_re().is_match(head) {
            return Some((m.end(), NumberingScheme::Roman));
        }
    }
    letter_re()
        .find(text)
        .map(|m| (m.end(), NumberingScheme::Letter))
}

/// Split a line into an optional numbering prefix and the remaining title.
///
/// Patterns are tried in order numeric, roman, letter; the first match
/// wins. Without a match the whole trimmed line is the title.
pub fn split_number(text: &str) -> (Option<Numbering>, String) {
    let stripped = text.trim();
    let Some((end, scheme)) = match_prefix(stripped) else {
        return (None, stripped.to_string());
    };

    let label = stripped[..end].trim_end_matches(['.', '-']).to_string();
    if label.is_empty() {
        return (None, stripped.to_string());
    }

    let rest = &stripped[end..];
    let title = rest.trim_start_matches([' ', ')', '-', '.']);
    let title = if title.is_empty() { rest.trim() } else { title };

    (Some(Numbering { label, scheme }), title.to_string())
}

/// Normalize heading text for fuzzy comparisons: drop any numbering prefix,
/// lower-case, keep only alphanumerics and single spaces.
pub fn normalize_heading_text(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let (_, title) = split_number(&collapsed);
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}
