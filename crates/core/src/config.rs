//! Read-only configuration shared by every stage of structure recovery.
//!
//! A [`StructureConfig`] is passed explicitly into each entry point; nothing
//! in this crate caches settings globally. All fields have defaults, so a
//! TOML file only needs to name what it overrides:
//!
//! ```toml
//! score_threshold = 0.3
//! overlap_policy = "trust"
//!
//! [weights]
//! bold = 0.3
//! ```

use serde::{Deserialize, Serialize};

use crate::StructureError;

/// Weights of the heading-score terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub font_size: f32,
    pub bold: f32,
    pub caps: f32,
    pub numbering: f32,
    pub indent: f32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            font_size: 0.45,
            bold: 0.25,
            caps: 0.15,
            numbering: 0.25,
            indent: 0.15,
        }
    }
}

/// How leaf ranges of neighbouring sections are bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Clamp every leaf end to the object before the next leaf anchor.
    #[default]
    Clamp,
    /// Use explicit span ends as given.
    Trust,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    /// Reject every line on a page classified as table of contents.
    pub suppress_toc: bool,
    /// Reject lines matching a running header/footer fingerprint.
    pub suppress_running: bool,
    /// Candidates scoring below this are discarded.
    pub score_threshold: f32,
    pub weights: ScoreWeights,
    /// Share of pages a margin line must appear on to count as running.
    pub running_page_ratio: f32,
    /// Lines longer than this never count as running lines.
    pub running_max_chars: usize,
    /// Vertical band (as page-height ratios) treated as body, not margin.
    pub margin_band: (f32, f32),
    pub overlap_policy: OverlapPolicy,
    /// Joins ancestor labels in a chunk's header path.
    pub path_separator: String,
    /// Give objects no leaf claimed to the root chunk.
    pub root_collects_orphans: bool,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            suppress_toc: true,
            suppress_running: true,
            score_threshold: 0.28,
            weights: ScoreWeights::default(),
            running_page_ratio: 0.6,
            running_max_chars: 80,
            margin_band: (0.1, 0.9),
            overlap_policy: OverlapPolicy::Clamp,
            path_separator: " > ".to_string(),
            root_collects_orphans: false,
        }
    }
}

impl StructureConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(input: &str) -> Result<Self, StructureError> {
        let config: StructureConfig =
            toml::from_str(input).map_err(|e| StructureError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), StructureError> {
        if !(0.0..=1.0).contains(&self.running_page_ratio) {
            return Err(StructureError::InvalidConfig(format!(
                "running_page_ratio must be within 0..=1, got {}",
                self.running_page_ratio
            )));
        }
        let (low, high) = self.margin_band;
        if !(0.0..=1.0).contains(&low) || !(0.0..=1.0).contains(&high) || low >= high {
            return Err(StructureError::InvalidConfig(format!(
                "margin_band must satisfy 0 <= low < high <= 1, got ({low}, {high})"
            )));
        }
        if self.score_threshold < 0.0 {
            return Err(StructureError::InvalidConfig(
                "score_threshold must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}
