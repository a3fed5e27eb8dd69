//! Tunable weights and thresholds for the outline pipeline.
//!
//! Every constant the heuristics depend on lives here so the stages stay pure
//! functions of `(input, &OutlineConfig)`. Defaults were tuned on mixed Latin
//! and CJK report-style documents; any subset can be overridden from TOML:
//!
//! ```toml
//! [merge]
//! merge_gap_ratio = 0.6
//!
//! [title]
//! title_min_score = 0.55
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::OutlineError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlineConfig {
    pub stats: StatsConfig,
    pub scoring: ScoringConfig,
    pub levels: LevelConfig,
    pub merge: MergeConfig,
    pub title: TitleConfig,
    pub assembly: AssemblyConfig,
}

impl OutlineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, OutlineError> {
        toml::from_str(s).map_err(|e| OutlineError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, OutlineError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// A size must exceed `body_size * min_heading_ratio` to form a heading
    /// cluster.
    pub min_heading_ratio: f32,
    /// Histogram bucket width in points.
    pub size_bucket: f32,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            min_heading_ratio: 1.1,
            size_bucket: 0.5,
        }
    }
}

/// Weights of the four scoring signals plus the gates around them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub size_weight: f32,
    pub weight_weight: f32,
    pub position_weight: f32,
    pub pattern_weight: f32,
    /// Weight-signal credit for all-caps text that is not bold.
    pub caps_credit: f32,
    /// Normalized score a line needs to become a candidate.
    pub candidate_threshold: f32,
    /// Fraction of the page height counted as "top of page".
    pub top_margin_ratio: f32,
    /// A gap above the line larger than this multiple of the page's median
    /// line gap counts as separating whitespace.
    pub gap_ratio: f32,
    /// Lines narrower than this fraction of the page width count as short.
    pub short_line_ratio: f32,
    /// A line whose midpoint lies within this fraction of the page width
    /// from the page center counts as centered.
    pub center_tolerance_ratio: f32,
    /// Position-signal credit for a centered line, on top of the vertical
    /// and horizontal halves. The position signal is capped at 1.
    pub center_credit: f32,
    pub max_heading_words: usize,
    pub min_heading_chars: usize,
    pub max_heading_chars: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            size_weight: 0.45,
            weight_weight: 0.25,
            position_weight: 0.2,
            pattern_weight: 0.1,
            caps_credit: 0.5,
            candidate_threshold: 0.4,
            top_margin_ratio: 0.15,
            gap_ratio: 1.5,
            short_line_ratio: 0.7,
            center_tolerance_ratio: 0.15,
            center_credit: 0.35,
            max_heading_words: 20,
            min_heading_chars: 2,
            max_heading_chars: 120,
        }
    }
}

impl ScoringConfig {
    pub(crate) fn total_weight(&self) -> f32 {
        self.size_weight + self.weight_weight + self.position_weight + self.pattern_weight
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Largest distance in points between a candidate and its size cluster.
    pub size_tolerance: f32,
    /// Extra indentation, as a fraction of the page width, that demotes a
    /// candidate within its cluster.
    pub indent_tolerance_ratio: f32,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            size_tolerance: 1.0,
            indent_tolerance_ratio: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Largest vertical gap, in multiples of the font size, between two lines
    /// of one heading.
    pub merge_gap_ratio: f32,
    pub max_merged_chars: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            merge_gap_ratio: 1.0,
            max_merged_chars: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleConfig {
    pub title_min_score: f32,
    /// Fraction of page 1, from the top, where title lines may start.
    pub title_region_ratio: f32,
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self {
            title_min_score: 0.45,
            title_region_ratio: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Distinct pages an entry must repeat on to count as a running
    /// header/footer.
    pub running_min_pages: usize,
    /// Allowed drift of `y0 / page_height` between repetitions.
    pub running_position_tolerance: f32,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            running_min_pages: 3,
            running_position_tolerance: 0.03,
        }
    }
}
