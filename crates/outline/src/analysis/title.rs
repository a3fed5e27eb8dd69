//! Document title selection from the first page.

use log::debug;

use super::lines::DocumentLines;
use super::merge::continues_run;
use super::scoring::{size_signal, weight_signal};
use super::stats::FontStatistics;
use crate::config::OutlineConfig;
use crate::types::{HeadingCandidate, Level, TextLine};

const TITLE_PAGE: u32 = 1;

/// Title score of one line: size and weight signals plus a relaxed position
/// signal (anywhere in the title region counts as "top").
pub fn title_score(
    line: &TextLine,
    stats: &FontStatistics,
    region_bottom: f32,
    config: &OutlineConfig,
) -> f32 {
    let cfg = &config.scoring;
    let total = cfg.size_weight + cfg.weight_weight + cfg.position_weight;
    if total <= 0.0 {
        return 0.0;
    }
    let top = if line.y0 <= region_bottom { 1.0 } else { 0.0 };
    (cfg.size_weight * size_signal(line.font_size, stats)
        + cfg.weight_weight * weight_signal(line, cfg)
        + cfg.position_weight * top)
        / total
}

/// Pick the title run from page 1.
///
/// The best-scoring line that starts inside the title region and reaches
/// `title_min_score` seeds the title; failing that, the largest line on the
/// page does. The seed then grows into neighbouring lines of the same size and
/// weight under the same contiguity rule the heading merger uses. Returns
/// `None` when page 1 has no text.
pub fn select_title(
    doc: &DocumentLines,
    stats: &FontStatistics,
    config: &OutlineConfig,
) -> Option<HeadingCandidate> {
    let page: Vec<&TextLine> = doc.page_lines(TITLE_PAGE).collect();
    if page.is_empty() {
        debug!("no text on page {TITLE_PAGE}, title left empty");
        return None;
    }

    let region_bottom = doc.geometry(TITLE_PAGE).height * config.title.title_region_ratio;
    let scores: Vec<f32> = page
        .iter()
        .map(|l| title_score(l, stats, region_bottom, config))
        .collect();

    // Earliest line wins ties in both passes.
    let seed = (0..page.len())
        .filter(|&i| page[i].y0 <= region_bottom && scores[i] >= config.title.title_min_score)
        .fold(None::<usize>, |best, i| match best {
            Some(b) if scores[b] >= scores[i] => best,
            _ => Some(i),
        })
        .or_else(|| {
            debug!("no line reached the title score, falling back to the largest line");
            (0..page.len()).fold(None::<usize>, |best, i| match best {
                Some(b) if page[b].font_size >= page[i].font_size => best,
                _ => Some(i),
            })
        })?;

    let (start, end) = grow_run(&page, seed, config);
    let lines: Vec<TextLine> = page[start..=end].iter().map(|l| (*l).clone()).collect();
    let title = HeadingCandidate {
        lines,
        score: scores[seed],
        level: Some(Level::Title),
    };
    debug!("title {:?} (score {:.3})", title.text(), title.score);
    Some(title)
}

/// Extend `seed` backward and forward into lines that continue it. Returns
/// inclusive bounds.
fn grow_run(page: &[&TextLine], seed: usize, config: &OutlineConfig) -> (usize, usize) {
    let tolerance = config.levels.size_tolerance;
    let alike = |a: &TextLine, b: &TextLine| {
        (a.font_size - b.font_size).abs() <= tolerance && a.is_bold() == b.is_bold()
    };
    let run_text = |from: usize, to: usize| {
        page[from..=to]
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    };

    let (mut start, mut end) = (seed, seed);

    while start > 0 {
        let prev = page[start - 1];
        let first = page[start];
        let chars = run_text(start, end).chars().count();
        if alike(prev, first) && continues_run(&prev.text, prev, first, chars, &config.merge) {
            start -= 1;
        } else {
            break;
        }
    }

    while end + 1 < page.len() {
        let next = page[end + 1];
        let text = run_text(start, end);
        if alike(page[end], next)
            && continues_run(&text, page[end], next, next.text.chars().count(), &config.merge)
        {
            end += 1;
        } else {
            break;
        }
    }

    (start, end)
}
