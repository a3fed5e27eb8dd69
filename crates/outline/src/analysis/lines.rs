//! Line aggregation: normalize, deduplicate and order producer lines.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use log::{debug, trace};

use crate::text::normalize_line_text;
use crate::types::{Page, TextLine};

/// US Letter, used when neither the producer nor the lines say anything about
/// a page's size.
const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

/// Two lines on the same page with equal text whose origins are closer than
/// this (in points) are the same line drawn twice (fake bold, shadow text).
const DUPLICATE_TOLERANCE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            width: DEFAULT_PAGE_SIZE.0,
            height: DEFAULT_PAGE_SIZE.1,
        }
    }
}

/// Every line of a document in reading order, plus page geometry.
#[derive(Debug, Clone, Default)]
pub struct DocumentLines {
    pub lines: Vec<TextLine>,
    pub geometry: BTreeMap<u32, PageGeometry>,
}

impl DocumentLines {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn geometry(&self, page: u32) -> PageGeometry {
        self.geometry.get(&page).copied().unwrap_or_default()
    }

    /// Lines of one page, in reading order.
    pub fn page_lines(&self, page: u32) -> impl Iterator<Item = &TextLine> {
        self.lines.iter().filter(move |l| l.page == page)
    }
}

/// Reading order: page, then top edge, then left edge.
pub fn reading_order(a: &TextLine, b: &TextLine) -> Ordering {
    a.page
        .cmp(&b.page)
        .then(a.y0.total_cmp(&b.y0))
        .then(a.x0.total_cmp(&b.x0))
        .then(a.order_index.cmp(&b.order_index))
}

/// Flatten the producer's pages into a single ordered line list.
///
/// Text is normalized, lines with no text or no usable font size are dropped,
/// duplicates are removed and `order_index` is renumbered per page so that it
/// matches the final reading order.
pub fn aggregate_lines(pages: &[Page]) -> DocumentLines {
    let mut lines: Vec<TextLine> = Vec::new();
    let mut geometry: BTreeMap<u32, PageGeometry> = BTreeMap::new();

    for (idx, page) in pages.iter().enumerate() {
        let number = if page.number == 0 {
            idx as u32 + 1
        } else {
            page.number
        };

        let mut page_lines: Vec<TextLine> = page
            .lines
            .iter()
            .filter_map(|line| clean_line(line, number))
            .collect();

        geometry.insert(number, infer_geometry(page, &page_lines));
        lines.append(&mut page_lines);
    }

    lines.sort_by(reading_order);
    let before = lines.len();
    let mut lines = dedup_lines(lines);
    renumber(&mut lines);

    debug!(
        "aggregated {} lines over {} pages ({} duplicates dropped)",
        lines.len(),
        geometry.len(),
        before - lines.len()
    );

    DocumentLines { lines, geometry }
}

fn clean_line(line: &TextLine, page: u32) -> Option<TextLine> {
    let text = normalize_line_text(&line.text);
    if text.is_empty() {
        return None;
    }
    if !line.font_size.is_finite() || line.font_size <= 0.0 {
        trace!("dropping line without font size: {:?}", text);
        return None;
    }

    let (x0, x1) = if line.x1 < line.x0 {
        (line.x1, line.x0)
    } else {
        (line.x0, line.x1)
    };
    let (y0, y1) = if line.y1 < line.y0 {
        (line.y1, line.y0)
    } else {
        (line.y0, line.y1)
    };

    Some(TextLine {
        page,
        text,
        is_bold: line.is_bold(),
        x0,
        y0,
        x1,
        y1,
        ..line.clone()
    })
}

/// Page size from the producer, or from the extent of the page's lines
/// assuming symmetric margins.
fn infer_geometry(page: &Page, lines: &[TextLine]) -> PageGeometry {
    let fallback = PageGeometry::default();
    if lines.is_empty() {
        return PageGeometry {
            width: positive_or(page.width, fallback.width),
            height: positive_or(page.height, fallback.height),
        };
    }

    let min_x = lines.iter().map(|l| l.x0).fold(f32::INFINITY, f32::min).max(0.0);
    let max_x = lines.iter().map(|l| l.x1).fold(0.0, f32::max);
    let min_y = lines.iter().map(|l| l.y0).fold(f32::INFINITY, f32::min).max(0.0);
    let max_y = lines.iter().map(|l| l.y1).fold(0.0, f32::max);

    PageGeometry {
        width: positive_or(page.width, positive_or(max_x + min_x, fallback.width)),
        height: positive_or(page.height, positive_or(max_y + min_y, fallback.height)),
    }
}

fn positive_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

/// Drop repeated draws of the same line. `lines` must be in reading order.
fn dedup_lines(lines: Vec<TextLine>) -> Vec<TextLine> {
    let mut kept: Vec<TextLine> = Vec::with_capacity(lines.len());

    for line in lines {
        let duplicate = kept
            .iter()
            .rev()
            .take_while(|k| k.page == line.page && line.y0 - k.y0 <= DUPLICATE_TOLERANCE)
            .any(|k| k.text == line.text && (k.x0 - line.x0).abs() <= DUPLICATE_TOLERANCE);
        if !duplicate {
            kept.push(line);
        }
    }

    kept
}

fn renumber(lines: &mut [TextLine]) {
    let mut current_page = None;
    let mut next = 0usize;
    for line in lines.iter_mut() {
        if current_page != Some(line.page) {
            current_page = Some(line.page);
            next = 0;
        }
        line.order_index = next;
        next += 1;
    }
}
