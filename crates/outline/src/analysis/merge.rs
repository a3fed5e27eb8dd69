//! Multi-line heading merging.

use log::trace;

use super::lines::reading_order;
use crate::config::MergeConfig;
use crate::text::ends_sentence;
use crate::types::{HeadingCandidate, TextLine};

/// Whether `next` continues a heading run whose text so far is `run_text`
/// and whose last line is `last`.
///
/// All of the following must hold:
/// - both lines are on the same page;
/// - the gap between `last`'s bottom and `next`'s top lies within
///   `[-0.5, merge_gap_ratio]` times their mean font size;
/// - `run_text` does not end a sentence;
/// - the joined text stays within `max_merged_chars`.
pub fn continues_run(
    run_text: &str,
    last: &TextLine,
    next: &TextLine,
    next_chars: usize,
    cfg: &MergeConfig,
) -> bool {
    if last.page != next.page {
        return false;
    }

    let size = (last.font_size + next.font_size) / 2.0;
    let gap = next.y0 - last.y1;
    if gap < -0.5 * size || gap > cfg.merge_gap_ratio * size {
        return false;
    }

    if ends_sentence(run_text) {
        return false;
    }

    run_text.chars().count() + 1 + next_chars <= cfg.max_merged_chars
}

/// Collapse consecutive candidates that form one logical heading.
///
/// Candidates are visited in reading order. A candidate joins the run before
/// it when it has the same level and [`continues_run`] holds; chains of any
/// length collapse into one candidate. The merged candidate keeps the first
/// line's page and position, the run's best score, and the shared level.
/// Running the merge on its own output changes nothing.
pub fn merge_multiline(
    candidates: &[HeadingCandidate],
    cfg: &MergeConfig,
) -> Vec<HeadingCandidate> {
    let mut ordered: Vec<&HeadingCandidate> = candidates.iter().collect();
    ordered.sort_by(|a, b| reading_order(a.first(), b.first()));

    let mut merged: Vec<HeadingCandidate> = Vec::with_capacity(ordered.len());
    let mut current: Option<HeadingCandidate> = None;

    for next in ordered {
        current = match current.take() {
            Some(run)
                if run.level == next.level
                    && continues_run(
                        &run.text(),
                        run.last(),
                        next.first(),
                        next.char_count(),
                        cfg,
                    ) =>
            {
                trace!("merging {:?} + {:?}", run.text(), next.text());
                let mut lines = run.lines.clone();
                lines.extend(next.lines.iter().cloned());
                Some(HeadingCandidate {
                    lines,
                    score: run.score.max(next.score),
                    level: run.level,
                })
            }
            Some(run) => {
                merged.push(run);
                Some(next.clone())
            }
            None => Some(next.clone()),
        };
    }

    merged.extend(current);
    merged
}
