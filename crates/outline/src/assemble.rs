use std::collections::{BTreeMap, BTreeSet, HashSet};

use log::debug;

use crate::analysis::lines::DocumentLines;
use crate::config::AssemblyConfig;
use crate::text::{collapse_whitespace, fold_key, is_enumeration_marker, is_punctuation_only};
use crate::types::{HeadingCandidate, HeadingLevel, Level, Outline, OutlineEntry};

/// Internal entry carrying the position data needed for ordering and running
/// header detection.
#[derive(Debug, Clone)]
struct Placed {
    entry: OutlineEntry,
    key: String,
    y0: f32,
    order: usize,
    rel_y: f32,
}

/// Turn level-assigned, merged candidates into ordered outline entries.
///
/// Candidates without an H-level (unassigned or the title) are skipped, as are
/// texts that are empty or punctuation-only after whitespace normalization.
/// Entries repeating with the same level on the same page are kept once, and
/// running headers/footers are reduced to their first occurrence.
pub fn assemble_entries(
    candidates: &[HeadingCandidate],
    doc: &DocumentLines,
    cfg: &AssemblyConfig,
) -> Vec<OutlineEntry> {
    let mut placed: Vec<Placed> = candidates
        .iter()
        .filter_map(|c| {
            let level = c.level.as_ref().and_then(Level::heading)?;
            let text = collapse_whitespace(&c.text());
            // A marker that never found its heading text says nothing.
            if text.is_empty() || is_punctuation_only(&text) || is_enumeration_marker(&text) {
                return None;
            }
            let first = c.first();
            let height = doc.geometry(first.page).height;
            Some(Placed {
                key: fold_key(&text),
                entry: OutlineEntry {
                    level,
                    text,
                    page: first.page,
                },
                y0: first.y0,
                order: first.order_index,
                rel_y: if height > 0.0 { first.y0 / height } else { 0.0 },
            })
        })
        .collect();

    placed.sort_by(|a, b| {
        a.entry
            .page
            .cmp(&b.entry.page)
            .then(a.y0.total_cmp(&b.y0))
            .then(a.order.cmp(&b.order))
    });

    let mut seen: HashSet<(String, HeadingLevel, u32)> = HashSet::new();
    placed.retain(|p| seen.insert((p.key.clone(), p.entry.level, p.entry.page)));

    let running = running_repeats(&placed, cfg);
    if !running.is_empty() {
        debug!("suppressing {} running header/footer repeats", running.len());
    }

    placed
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !running.contains(i))
        .map(|(_, p)| p.entry)
        .collect()
}

/// Indices of entries that repeat an earlier entry as a running header or
/// footer: same folded text and level, same relative vertical position, on at
/// least `running_min_pages` distinct pages. The first occurrence is not
/// included.
fn running_repeats(placed: &[Placed], cfg: &AssemblyConfig) -> BTreeSet<usize> {
    let mut groups: BTreeMap<(&str, HeadingLevel), Vec<usize>> = BTreeMap::new();
    for (i, p) in placed.iter().enumerate() {
        groups
            .entry((p.key.as_str(), p.entry.level))
            .or_default()
            .push(i);
    }

    let mut drop = BTreeSet::new();
    for indices in groups.values() {
        // Clusters of indices anchored on their first member's position.
        let mut clusters: Vec<(f32, Vec<usize>)> = Vec::new();
        for &i in indices {
            let rel_y = placed[i].rel_y;
            match clusters
                .iter_mut()
                .find(|(anchor, _)| (anchor - rel_y).abs() <= cfg.running_position_tolerance)
            {
                Some((_, members)) => members.push(i),
                None => clusters.push((rel_y, vec![i])),
            }
        }

        for (_, members) in clusters {
            let pages: BTreeSet<u32> = members.iter().map(|&i| placed[i].entry.page).collect();
            if pages.len() >= cfg.running_min_pages {
                drop.extend(members.into_iter().skip(1));
            }
        }
    }
    drop
}

/// Final outline from an optional title run and the assembled entries.
pub fn build_outline(title: Option<&HeadingCandidate>, entries: Vec<OutlineEntry>) -> Outline {
    Outline {
        title: title
            .map(|t| collapse_whitespace(&t.text()))
            .unwrap_or_default(),
        entries,
    }
}
