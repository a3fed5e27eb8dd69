//! Discrete heading levels from size-cluster rank.

use std::collections::BTreeMap;

use log::debug;

use super::lines::DocumentLines;
use super::scoring::weight_signal;
use super::stats::FontStatistics;
use crate::config::OutlineConfig;
use crate::types::{HeadingCandidate, HeadingLevel, Level};

/// Weight signals closer than this are treated as equal.
const WEIGHT_EPSILON: f32 = 1e-3;

/// Assign a level to every candidate whose size matches a heading cluster.
///
/// The nearest cluster (within `size_tolerance`) gives the base level: rank
/// 0 is H1. Inside one cluster the strongest members keep the base level and
/// the rest go one level deeper: a lower weight signal loses first, then, at
/// equal weight, indentation beyond `indent_tolerance_ratio` of the page
/// width. Candidates that match no cluster are dropped.
pub fn assign_levels(
    candidates: Vec<HeadingCandidate>,
    stats: &FontStatistics,
    doc: &DocumentLines,
    config: &OutlineConfig,
) -> Vec<HeadingCandidate> {
    let tolerance = config.levels.size_tolerance;

    let ranked: Vec<(usize, HeadingCandidate)> = candidates
        .into_iter()
        .filter_map(|c| match stats.nearest_cluster(c.font_size(), tolerance) {
            Some((rank, _)) => Some((rank, c)),
            None => {
                debug!("no size cluster for {:?} at {:.1}pt", c.text(), c.font_size());
                None
            }
        })
        .collect();

    // Best (weight, indentation) seen in each cluster.
    let mut best: BTreeMap<usize, (f32, f32)> = BTreeMap::new();
    for (rank, c) in &ranked {
        let w = weight_signal(c.first(), &config.scoring);
        let x = c.first().x0;
        best.entry(*rank)
            .and_modify(|(bw, bx)| {
                *bw = bw.max(w);
                *bx = bx.min(x);
            })
            .or_insert((w, x));
    }

    ranked
        .into_iter()
        .map(|(rank, mut c)| {
            let (best_weight, best_x) = best[&rank];
            let w = weight_signal(c.first(), &config.scoring);
            let width = doc.geometry(c.page()).width;
            let lighter = w + WEIGHT_EPSILON < best_weight;
            let indented = (best_weight - w).abs() <= WEIGHT_EPSILON
                && c.first().x0 - best_x > width * config.levels.indent_tolerance_ratio;

            let base = HeadingLevel::from_rank(rank);
            let level = if lighter || indented {
                base.deeper()
            } else {
                base
            };
            c.level = Some(Level::Heading(level));
            c
        })
        .collect()
}
