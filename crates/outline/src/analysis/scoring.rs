//! Heading-likelihood scoring.
//!
//! Every line gets four independent signals in `[0, 1]`:
//!
//! | Signal   | Source                                                   |
//! |----------|----------------------------------------------------------|
//! | size     | font size relative to body and largest size              |
//! | weight   | bold flag / font name, partial credit for all-caps       |
//! | position | top of page or whitespace above, short line, centered    |
//! | pattern  | leading enumeration (`1.2`, `IV.`, `Chapter 3`, `第3章`) |
//!
//! The score is their weighted sum divided by the total weight. Nothing here
//! looks at which alphabet a line is written in: only Unicode categories,
//! font and geometry.

use std::sync::OnceLock;

use log::{debug, trace};
use regex::Regex;

use super::lines::{DocumentLines, PageGeometry};
use super::stats::FontStatistics;
use crate::config::{OutlineConfig, ScoringConfig};
use crate::text::{enumeration_prefix, is_enumeration_marker, word_number_prefix};
use crate::types::{HeadingCandidate, TextLine};

/// Inter-line gaps are floored at this fraction of the font size so tightly
/// set pages do not turn every small gap into "whitespace above".
const MIN_LINE_GAP_RATIO: f32 = 0.25;

/// Per-line signal values, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LineSignals {
    pub size: f32,
    pub weight: f32,
    pub position: f32,
    pub pattern: f32,
}

impl LineSignals {
    /// Weighted sum normalized by the total weight.
    pub fn score(&self, cfg: &ScoringConfig) -> f32 {
        let total = cfg.total_weight();
        if total <= 0.0 {
            return 0.0;
        }
        (cfg.size_weight * self.size
            + cfg.weight_weight * self.weight
            + cfg.position_weight * self.position
            + cfg.pattern_weight * self.pattern)
            / total
    }
}

// ---------------------------------------------------------------------------
// Individual signals
// ---------------------------------------------------------------------------

/// `(font_size - body) / (max - body)`, clipped to `[0, 1]`.
pub fn size_signal(font_size: f32, stats: &FontStatistics) -> f32 {
    let range = stats.max_size - stats.body_size;
    if range <= 0.0 {
        return 0.0;
    }
    ((font_size - stats.body_size) / range).clamp(0.0, 1.0)
}

pub fn weight_signal(line: &TextLine, cfg: &ScoringConfig) -> f32 {
    if line.is_bold() {
        1.0
    } else if is_all_caps(&line.text) {
        cfg.caps_credit
    } else {
        0.0
    }
}

/// At least three cased letters and no lowercase ones. Scripts without case
/// never qualify.
pub fn is_all_caps(text: &str) -> bool {
    let mut cased = 0usize;
    for c in text.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            cased += 1;
        }
    }
    cased >= 3
}

pub fn pattern_signal(text: &str) -> f32 {
    if enumeration_prefix().is_match(text) {
        1.0
    } else if word_number_prefix().is_match(text) {
        0.5
    } else {
        0.0
    }
}

/// Whether the line starts a visual block: top of the page, or separated from
/// the previous line by more whitespace than the page usually has.
pub fn vertical_signal(
    line: &TextLine,
    gap_before: Option<f32>,
    median_gap: f32,
    geometry: PageGeometry,
    cfg: &ScoringConfig,
) -> f32 {
    if line.y0 <= geometry.height * cfg.top_margin_ratio {
        return 1.0;
    }
    let spacing = median_gap.max(line.font_size * MIN_LINE_GAP_RATIO);
    match gap_before {
        Some(gap) if gap > spacing * cfg.gap_ratio => 1.0,
        _ => 0.0,
    }
}

/// Headings are rarely full-width paragraphs.
pub fn horizontal_signal(line: &TextLine, geometry: PageGeometry, cfg: &ScoringConfig) -> f32 {
    let narrow = line.width() < geometry.width * cfg.short_line_ratio;
    let few_words = line.text.split_whitespace().count() <= cfg.max_heading_words;
    if narrow && few_words {
        1.0
    } else {
        0.0
    }
}

/// Whether the line's midpoint sits near the middle of the page.
pub fn centered_signal(line: &TextLine, geometry: PageGeometry, cfg: &ScoringConfig) -> f32 {
    let center = (line.x0 + line.x1) / 2.0;
    if (center - geometry.width / 2.0).abs() < cfg.center_tolerance_ratio * geometry.width {
        1.0
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Noise filters
// ---------------------------------------------------------------------------

fn dot_leader() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:(?:\.\s?){3,}|\u{2026}+|·{3,})\s*\p{N}+\s*$").unwrap())
}

fn form_field() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"_{3,}").unwrap())
}

/// An enumeration marker with punctuation or depth (`1.`, `2.3`, `(4)`). A
/// bare number is left out since it reads as a page number.
fn is_split_marker(text: &str) -> bool {
    is_enumeration_marker(text) && !text.trim().chars().all(char::is_numeric)
}

/// Lines that can never be headings regardless of typography: page numbers
/// and other letterless lines, table-of-contents entries, form fields, and
/// lines too short or too long to be a heading.
///
/// A bare enumeration marker (`1.`, `2.3`, `(4)`) set on its own line is not
/// noise: it can still merge with the heading text below it.
pub fn is_noise_line(text: &str, cfg: &ScoringConfig) -> bool {
    let chars = text.chars().count();
    let letterless = !text.chars().any(char::is_alphabetic) && !is_split_marker(text);
    chars < cfg.min_heading_chars
        || chars > cfg.max_heading_chars
        || letterless
        || dot_leader().is_match(text)
        || form_field().is_match(text)
}

// ---------------------------------------------------------------------------
// Document pass
// ---------------------------------------------------------------------------

/// Vertical gap above each line (`None` for the first line of a page) and the
/// median positive gap of each line's page.
fn vertical_context(doc: &DocumentLines) -> Vec<(Option<f32>, f32)> {
    let mut gaps: Vec<Option<f32>> = Vec::with_capacity(doc.lines.len());
    for (i, line) in doc.lines.iter().enumerate() {
        let gap = i
            .checked_sub(1)
            .map(|p| &doc.lines[p])
            .filter(|prev| prev.page == line.page)
            .map(|prev| (line.y0 - prev.y1).max(0.0));
        gaps.push(gap);
    }

    let mut result = Vec::with_capacity(doc.lines.len());
    let mut start = 0usize;
    while start < doc.lines.len() {
        let page = doc.lines[start].page;
        let end = doc.lines[start..]
            .iter()
            .position(|l| l.page != page)
            .map_or(doc.lines.len(), |n| start + n);

        let mut positive: Vec<f32> = gaps[start..end]
            .iter()
            .flatten()
            .copied()
            .filter(|g| *g > 0.0)
            .collect();
        positive.sort_by(f32::total_cmp);
        let median = positive.get(positive.len() / 2).copied().unwrap_or(0.0);

        result.extend(gaps[start..end].iter().map(|g| (*g, median)));
        start = end;
    }
    result
}

/// Signals for every line of the document, parallel to `doc.lines`.
pub fn line_signals(
    doc: &DocumentLines,
    stats: &FontStatistics,
    cfg: &ScoringConfig,
) -> Vec<LineSignals> {
    vertical_context(doc)
        .into_iter()
        .zip(&doc.lines)
        .map(|((gap_before, median_gap), line)| {
            let geometry = doc.geometry(line.page);
            let vertical = vertical_signal(line, gap_before, median_gap, geometry, cfg);
            let horizontal = horizontal_signal(line, geometry, cfg);
            let centered = centered_signal(line, geometry, cfg);
            let position = 0.5 * vertical + 0.5 * horizontal + cfg.center_credit * centered;
            LineSignals {
                size: size_signal(line.font_size, stats),
                weight: weight_signal(line, cfg),
                position: position.min(1.0),
                pattern: pattern_signal(&line.text),
            }
        })
        .collect()
}

/// Score every line and keep the ones that look like headings.
///
/// A line must be larger than `body_size * min_heading_ratio`, pass the noise
/// filters, and reach `candidate_threshold`. Candidates come back in reading
/// order with `level = None`.
pub fn score_lines(
    doc: &DocumentLines,
    stats: &FontStatistics,
    config: &OutlineConfig,
) -> Vec<HeadingCandidate> {
    let cfg = &config.scoring;
    let size_gate = stats.body_size * config.stats.min_heading_ratio;

    let candidates: Vec<HeadingCandidate> = line_signals(doc, stats, cfg)
        .into_iter()
        .zip(&doc.lines)
        .filter(|(_, line)| line.font_size > size_gate && !is_noise_line(&line.text, cfg))
        .filter_map(|(signals, line)| {
            let score = signals.score(cfg);
            trace!("score {:.3} {:?} {:?}", score, signals, line.text);
            (score >= cfg.candidate_threshold).then(|| HeadingCandidate::new(line.clone(), score))
        })
        .collect();

    debug!(
        "{} of {} lines scored as heading candidates",
        candidates.len(),
        doc.lines.len()
    );
    candidates
}
