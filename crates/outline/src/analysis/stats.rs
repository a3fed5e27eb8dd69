//! Document-wide font statistics.

use std::collections::BTreeMap;

use log::debug;

use crate::config::StatsConfig;
use crate::types::{HeadingLevel, TextLine};

/// Body size assumed for a document without any text.
const DEFAULT_BODY_SIZE: f32 = 12.0;

/// Aggregate font-size statistics computed across an entire document.
#[derive(Debug, Clone, PartialEq)]
pub struct FontStatistics {
    /// The most common font size (weighted by character count).
    pub body_size: f32,
    /// Largest bucketed size present in the document.
    pub max_size: f32,
    /// `(font_size, total_char_count)` pairs sorted by descending size.
    pub size_histogram: Vec<(f32, usize)>,
    /// Heading size clusters, largest first. Index `i` maps to `H(i+1)`.
    pub heading_sizes: Vec<f32>,
}

impl FontStatistics {
    pub fn has_heading_sizes(&self) -> bool {
        !self.heading_sizes.is_empty()
    }

    /// Nearest heading cluster within `tolerance` points, as
    /// `(rank, distance)`. Ties go to the larger cluster.
    pub fn nearest_cluster(&self, font_size: f32, tolerance: f32) -> Option<(usize, f32)> {
        self.heading_sizes
            .iter()
            .enumerate()
            .map(|(rank, &size)| (rank, (size - font_size).abs()))
            .filter(|(_, dist)| *dist <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
    }
}

/// Quantise a font size into a histogram bucket.
pub fn bucket(size: f32, width: f32) -> f32 {
    (size / width).round() * width
}

/// Build aggregate font-size statistics from all lines.
///
/// The histogram counts *characters* (not lines) at each quantised font size,
/// so a handful of large headings never outvote dense body text. `body_size`
/// is the bucket with the most characters; ties go to the smaller size.
pub fn build_font_statistics(lines: &[TextLine], config: &StatsConfig) -> FontStatistics {
    // Keyed by hundredths of a point so the map is ordered and hashable.
    let mut histogram: BTreeMap<i32, usize> = BTreeMap::new();

    for line in lines {
        if !line.font_size.is_finite() || line.font_size <= 0.0 {
            continue;
        }
        let key = (bucket(line.font_size, config.size_bucket) * 100.0).round() as i32;
        *histogram.entry(key).or_insert(0) += line.text.chars().count();
    }

    // BTreeMap iterates ascending, so `max_by_key` keeping the last maximum
    // would prefer larger sizes; compare explicitly to keep the smaller one.
    let body_key = histogram
        .iter()
        .fold(None::<(i32, usize)>, |best, (&k, &v)| match best {
            Some((_, bv)) if bv >= v => best,
            _ => Some((k, v)),
        })
        .map(|(k, _)| k);

    let body_size = body_key
        .map(|k| k as f32 / 100.0)
        .unwrap_or(DEFAULT_BODY_SIZE);

    let size_histogram: Vec<(f32, usize)> = histogram
        .iter()
        .rev()
        .map(|(&k, &v)| (k as f32 / 100.0, v))
        .collect();

    let max_size = size_histogram
        .first()
        .map(|(size, _)| *size)
        .unwrap_or(body_size);

    let threshold = body_size * config.min_heading_ratio;
    let heading_sizes: Vec<f32> = size_histogram
        .iter()
        .map(|(size, _)| *size)
        .filter(|size| *size > threshold)
        .take(HeadingLevel::ALL.len())
        .collect();

    debug!(
        "font statistics: body {:.1}pt, max {:.1}pt, heading clusters {:?}",
        body_size, max_size, heading_sizes
    );

    FontStatistics {
        body_size,
        max_size,
        size_histogram,
        heading_sizes,
    }
}
