//! Line-level layout analysis: page baselines, numbering prefixes and
//! heading-candidate scoring.

pub mod numbering;
pub mod scorer;
pub mod stats;

pub use numbering::{normalize_heading_text, split_number, Numbering, NumberingScheme};
pub use scorer::{collect_candidates, evaluate_line, score_line, HeaderCandidate, Rejection};
pub use stats::{LineStatistics, PageStatistics, RunningLine};
