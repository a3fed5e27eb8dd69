//! PDF text-layer producer.
//!
//! ```text
//! content ops -> Span[] -> TextLine[] (top-down coordinates) -> Page
//!   read_page_spans        group_spans
//! ```
//!
//! Glyph widths are not resolved; span widths are estimated from the
//! character count, which is enough for the line-level geometry the outline
//! heuristics use.

use std::path::Path;

use log::{debug, warn};

use super::backend::{FontResource, LopdfBackend, Operand, Operation, PageBox, PageId, PdfBackend};
use crate::types::{font_name_is_bold, Page, TextLine};
use crate::OutlineError;

/// Average glyph advance as a fraction of the font size.
const CHAR_WIDTH_RATIO: f32 = 0.5;
/// Spans whose baselines differ by less than this many points share a line.
const BASELINE_TOLERANCE: f32 = 1.5;
/// Horizontal gap (points) above which adjacent spans get a space between them.
const WORD_GAP: f32 = 1.5;
/// Ascent and descent as fractions of the font size, for the line bbox.
const ASCENT: f32 = 0.8;
const DESCENT: f32 = 0.2;

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// A run of glyphs drawn by one text-showing operator, in PDF user space.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub text: String,
    pub x: f32,
    /// Baseline, y up.
    pub baseline: f32,
    pub width: f32,
    pub font_size: f32,
    pub font_name: String,
}

#[derive(Debug, Clone)]
struct TextState {
    font_key: Vec<u8>,
    font_name: String,
    font_size: f32,
    matrix: [f32; 6],
    line_matrix: [f32; 6],
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    rise: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_name: String::new(),
            font_size: 0.0,
            matrix: IDENTITY,
            line_matrix: IDENTITY,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            rise: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    /// Rendered font size: `Tf` size scaled by the matrix's vertical axis.
    fn rendered_size(&self) -> f32 {
        (self.font_size * self.matrix[1].hypot(self.matrix[3])).abs()
    }

    fn origin(&self) -> (f32, f32) {
        (self.matrix[4], self.matrix[5] + self.rise)
    }

    fn glyph_advance(&self) -> f32 {
        self.font_size * CHAR_WIDTH_RATIO * self.horiz_scale
    }

    fn move_by(&mut self, dx: f32) {
        self.matrix[4] += dx * self.matrix[0];
        self.matrix[5] += dx * self.matrix[1];
    }

    fn next_line(&mut self, tx: f32, ty: f32) {
        let m = self.line_matrix;
        self.line_matrix[4] = m[0] * tx + m[2] * ty + m[4];
        self.line_matrix[5] = m[1] * tx + m[3] * ty + m[5];
        self.matrix = self.line_matrix;
    }

    /// Advance past `text` and return the user-space width it covered.
    fn advance_over(&mut self, text: &str) -> f32 {
        let dx: f32 = text
            .chars()
            .map(|c| {
                let word = if c == ' ' { self.word_spacing } else { 0.0 };
                self.glyph_advance() + self.char_spacing + word
            })
            .sum();
        self.move_by(dx);
        dx * self.matrix[0].hypot(self.matrix[1])
    }
}

/// Walk one page's text operators and return its spans in drawing order.
pub fn read_page_spans(backend: &dyn PdfBackend, page: PageId) -> Result<Vec<Span>, OutlineError> {
    let ops = backend.page_operations(page)?;
    let fonts = backend.page_fonts(page).unwrap_or_default();

    let mut state = TextState::default();
    let mut spans = Vec::new();
    let num = |op: &Operation, i: usize| op.operands.get(i).and_then(Operand::as_f32);

    for op in &ops {
        match op.operator.as_str() {
            "BT" => {
                state.matrix = IDENTITY;
                state.line_matrix = IDENTITY;
            }
            "Tf" => set_font(&op.operands, &fonts, &mut state),
            "Tm" => {
                let m: Vec<f32> = op.operands.iter().filter_map(Operand::as_f32).collect();
                if let [a, b, c, d, e, f] = m[..] {
                    state.matrix = [a, b, c, d, e, f];
                    state.line_matrix = state.matrix;
                }
            }
            "Td" | "TD" => {
                if let (Some(tx), Some(ty)) = (num(op, 0), num(op, 1)) {
                    if op.operator == "TD" {
                        state.leading = -ty;
                    }
                    state.next_line(tx, ty);
                }
            }
            "T*" => state.next_line(0.0, -state.leading),
            "TL" => state.leading = num(op, 0).unwrap_or(state.leading),
            "Tc" => state.char_spacing = num(op, 0).unwrap_or(state.char_spacing),
            "Tw" => state.word_spacing = num(op, 0).unwrap_or(state.word_spacing),
            "Tz" => state.horiz_scale = num(op, 0).map_or(state.horiz_scale, |v| v / 100.0),
            "Ts" => state.rise = num(op, 0).unwrap_or(state.rise),
            "Tj" => {
                if let Some(s) = op.operands.first() {
                    show(s, backend, page, &mut state, &mut spans);
                }
            }
            "'" => {
                state.next_line(0.0, -state.leading);
                if let Some(s) = op.operands.first() {
                    show(s, backend, page, &mut state, &mut spans);
                }
            }
            "\"" => {
                if let (Some(aw), Some(ac), Some(s)) =
                    (num(op, 0), num(op, 1), op.operands.get(2))
                {
                    state.word_spacing = aw;
                    state.char_spacing = ac;
                    state.next_line(0.0, -state.leading);
                    show(s, backend, page, &mut state, &mut spans);
                }
            }
            "TJ" => {
                if let Some(Operand::Array(items)) = op.operands.first() {
                    show_array(items, backend, page, &mut state, &mut spans);
                }
            }
            _ => {}
        }
    }

    Ok(spans)
}

fn set_font(operands: &[Operand], fonts: &[FontResource], state: &mut TextState) {
    let (Some(Operand::Name(key)), Some(size)) =
        (operands.first(), operands.get(1).and_then(Operand::as_f32))
    else {
        return;
    };
    state.font_name = fonts
        .iter()
        .find(|f| &f.key == key)
        .and_then(|f| f.base_font.clone())
        .unwrap_or_else(|| String::from_utf8_lossy(key).into_owned());
    state.font_key = key.clone();
    state.font_size = size;
}

fn decode(operand: &Operand, backend: &dyn PdfBackend, page: PageId, state: &TextState) -> String {
    match operand {
        Operand::Str(bytes) => backend.decode_text(page, &state.font_key, bytes),
        _ => String::new(),
    }
}

fn show(
    operand: &Operand,
    backend: &dyn PdfBackend,
    page: PageId,
    state: &mut TextState,
    spans: &mut Vec<Span>,
) {
    let text = decode(operand, backend, page, state);
    if text.is_empty() {
        return;
    }
    let (x, baseline) = state.origin();
    let width = state.advance_over(&text);
    spans.push(Span {
        text,
        x,
        baseline,
        width,
        font_size: state.rendered_size(),
        font_name: state.font_name.clone(),
    });
}

/// `TJ`: strings interleaved with kerning offsets in thousandths of text
/// space. Offsets wider than a third of a glyph read as word breaks.
fn show_array(
    items: &[Operand],
    backend: &dyn PdfBackend,
    page: PageId,
    state: &mut TextState,
    spans: &mut Vec<Span>,
) {
    let (x, baseline) = state.origin();
    let mut text = String::new();
    let mut width = 0.0;

    for item in items {
        if let Some(adjust) = item.as_f32() {
            let dx = -adjust / 1000.0 * state.font_size * state.horiz_scale;
            if dx > state.glyph_advance() * 0.3 && !text.is_empty() && !text.ends_with(' ') {
                text.push(' ');
            }
            state.move_by(dx);
            width += dx * state.matrix[0].hypot(state.matrix[1]);
        } else {
            let fragment = decode(item, backend, page, state);
            width += state.advance_over(&fragment);
            text.push_str(&fragment);
        }
    }

    let text = text.trim_end();
    if !text.is_empty() {
        spans.push(Span {
            text: text.to_string(),
            x,
            baseline,
            width: width.max(0.0),
            font_size: state.rendered_size(),
            font_name: state.font_name.clone(),
        });
    }
}

/// Scripts written without spaces between words.
fn is_spaceless(c: char) -> bool {
    matches!(c as u32,
        0x3000..=0x30FF     // CJK punctuation, kana
        | 0x31F0..=0x31FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xF900..=0xFAFF
        | 0xFF00..=0xFFEF
        | 0x20000..=0x2A6DF
        | 0x0E00..=0x0EFF   // Thai, Lao
        | 0x0F00..=0x0FFF   // Tibetan
        | 0x1000..=0x109F   // Myanmar
        | 0x1780..=0x17FF   // Khmer
    )
}

/// Group spans that share a baseline into top-down [`TextLine`]s.
///
/// Lines come back top to bottom with `order_index` set; the line's font size,
/// font name and boldness are those covering the most characters.
pub fn group_spans(mut spans: Vec<Span>, page: u32, page_box: PageBox) -> Vec<TextLine> {
    spans.retain(|s| s.font_size > 0.0 && !s.text.trim().is_empty());
    spans.sort_by(|a, b| b.baseline.total_cmp(&a.baseline).then(a.x.total_cmp(&b.x)));

    let mut groups: Vec<Vec<Span>> = Vec::new();
    for span in spans {
        match groups.last_mut() {
            Some(group) if (group[0].baseline - span.baseline).abs() <= BASELINE_TOLERANCE => {
                group.push(span)
            }
            _ => groups.push(vec![span]),
        }
    }

    groups
        .into_iter()
        .enumerate()
        .map(|(order_index, group)| build_line(group, page, order_index, page_box))
        .collect()
}

fn build_line(mut group: Vec<Span>, page: u32, order_index: usize, page_box: PageBox) -> TextLine {
    group.sort_by(|a, b| a.x.total_cmp(&b.x));

    let mut text = String::new();
    let mut right_edge: Option<f32> = None;
    for span in &group {
        if let Some(edge) = right_edge {
            let boundary_spaceless = text.chars().next_back().is_some_and(is_spaceless)
                && span.text.chars().next().is_some_and(is_spaceless);
            if span.x - edge > WORD_GAP && !boundary_spaceless && !text.ends_with(' ') {
                text.push(' ');
            }
        }
        text.push_str(&span.text);
        right_edge = Some(right_edge.map_or(span.x + span.width, |e| e.max(span.x + span.width)));
    }

    // Dominant span by character count; first one wins ties.
    let dominant = group
        .iter()
        .fold(None::<&Span>, |best, s| match best {
            Some(b) if b.text.chars().count() >= s.text.chars().count() => best,
            _ => Some(s),
        })
        .unwrap_or(&group[0]);

    let baseline = group[0].baseline;
    let font_size = dominant.font_size;
    let x0 = group[0].x - page_box.llx;
    let x1 = right_edge.unwrap_or(group[0].x) - page_box.llx;
    let top = page_box.ury - baseline - font_size * ASCENT;

    TextLine {
        page,
        text,
        font_size,
        font_name: dominant.font_name.clone(),
        is_bold: font_name_is_bold(&dominant.font_name),
        x0,
        y0: top,
        x1: x1.max(x0),
        y1: top + font_size * (ASCENT + DESCENT),
        order_index,
    }
}

/// Read every page of a PDF through `backend`.
///
/// A page whose content cannot be decoded is kept as an empty page and
/// logged; the document as a whole only fails when it cannot be opened.
pub fn read_pages(backend: &dyn PdfBackend) -> Vec<Page> {
    backend
        .pages()
        .into_iter()
        .map(|(number, id)| {
            let page_box = backend.page_box(id).unwrap_or_else(|e| {
                warn!("page {number}: {e}, assuming US Letter");
                PageBox::default()
            });
            let lines = match read_page_spans(backend, id) {
                Ok(spans) => group_spans(spans, number, page_box),
                Err(e) => {
                    warn!("page {number}: {e}, no text extracted");
                    Vec::new()
                }
            };
            Page {
                number,
                width: page_box.width(),
                height: page_box.height(),
                lines,
            }
        })
        .collect()
}

pub fn read_pdf_bytes(bytes: &[u8]) -> Result<Vec<Page>, OutlineError> {
    let backend = LopdfBackend::load_bytes(bytes)?;
    let pages = read_pages(&backend);
    debug!(
        "read {} pages, {} lines",
        pages.len(),
        pages.iter().map(|p| p.lines.len()).sum::<usize>()
    );
    Ok(pages)
}

pub fn read_pdf(path: &Path) -> Result<Vec<Page>, OutlineError> {
    read_pdf_bytes(&std::fs::read(path)?)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::source::backend::decode_text_simple;

    /// Scripted backend: one operation list per page.
    struct MockBackend {
        pages: Vec<Vec<Operation>>,
        fonts: Vec<FontResource>,
    }

    impl PdfBackend for MockBackend {
        fn pages(&self) -> BTreeMap<u32, PageId> {
            (1..=self.pages.len() as u32).map(|n| (n, (n + 10, 0))).collect()
        }

        fn page_fonts(&self, _page: PageId) -> Result<Vec<FontResource>, OutlineError> {
            Ok(self.fonts.clone())
        }

        fn page_box(&self, _page: PageId) -> Result<PageBox, OutlineError> {
            Ok(PageBox::default())
        }

        fn page_operations(&self, page: PageId) -> Result<Vec<Operation>, OutlineError> {
            self.pages
                .get((page.0 - 11) as usize)
                .cloned()
                .ok_or_else(|| OutlineError::Parse("no such page".into()))
        }

        fn decode_text(&self, _page: PageId, _font_key: &[u8], bytes: &[u8]) -> String {
            decode_text_simple(bytes)
        }
    }

    fn op(operator: &str, operands: Vec<Operand>) -> Operation {
        Operation {
            operator: operator.to_string(),
            operands,
        }
    }

    fn fonts() -> Vec<FontResource> {
        vec![
            FontResource {
                key: b"F1".to_vec(),
                base_font: Some("Helvetica".to_string()),
            },
            FontResource {
                key: b"F2".to_vec(),
                base_font: Some("ABCDEF+Helvetica-Bold".to_string()),
            },
        ]
    }

    fn tf(key: &[u8], size: f32) -> Operation {
        op("Tf", vec![Operand::Name(key.to_vec()), Operand::Real(size)])
    }

    fn tm(x: f32, y: f32) -> Operation {
        op(
            "Tm",
            [1.0, 0.0, 0.0, 1.0, x, y].into_iter().map(Operand::Real).collect(),
        )
    }

    fn tj(text: &str) -> Operation {
        op("Tj", vec![Operand::Str(text.as_bytes().to_vec())])
    }

    fn spans_of(ops: Vec<Operation>) -> Vec<Span> {
        let backend = MockBackend {
            pages: vec![ops],
            fonts: fonts(),
        };
        read_page_spans(&backend, (11, 0)).unwrap()
    }

    #[test]
    fn test_tj_span_position_and_font() {
        let spans = spans_of(vec![
            op("BT", vec![]),
            tf(b"F2", 18.0),
            tm(72.0, 700.0),
            tj("Overview"),
            op("ET", vec![]),
        ]);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Overview");
        assert_eq!(spans[0].x, 72.0);
        assert_eq!(spans[0].baseline, 700.0);
        assert_eq!(spans[0].font_size, 18.0);
        assert_eq!(spans[0].font_name, "ABCDEF+Helvetica-Bold");
    }

    #[test]
    fn test_matrix_scale_sets_rendered_size() {
        let spans = spans_of(vec![
            op("BT", vec![]),
            tf(b"F1", 1.0),
            op("Tm", [24.0, 0.0, 0.0, 24.0, 50.0, 600.0].into_iter().map(Operand::Real).collect()),
            tj("Scaled"),
        ]);
        assert_eq!(spans[0].font_size, 24.0);
    }

    #[test]
    fn test_td_and_t_star_move_down() {
        let spans = spans_of(vec![
            op("BT", vec![]),
            tf(b"F1", 12.0),
            op("TD", vec![Operand::Integer(72), Operand::Integer(-14)]),
            tj("first"),
            op("T*", vec![]),
            tj("second"),
        ]);
        assert_eq!(spans[0].baseline, -14.0);
        assert_eq!(spans[1].baseline, -28.0);
        assert_eq!(spans[1].x, 72.0);
    }

    #[test]
    fn test_tj_array_kerning_inserts_space() {
        let spans = spans_of(vec![
            op("BT", vec![]),
            tf(b"F1", 10.0),
            tm(0.0, 500.0),
            op(
                "TJ",
                vec![Operand::Array(vec![
                    Operand::Str(b"Hel".to_vec()),
                    Operand::Integer(-20),
                    Operand::Str(b"lo".to_vec()),
                    Operand::Integer(-600),
                    Operand::Str(b"world".to_vec()),
                ])],
            ),
        ]);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Hello world");
    }

    #[test]
    fn test_quote_operators() {
        let spans = spans_of(vec![
            op("BT", vec![]),
            tf(b"F1", 10.0),
            op("TL", vec![Operand::Integer(12)]),
            tm(0.0, 100.0),
            op("'", vec![Operand::Str(b"one".to_vec())]),
            op(
                "\"",
                vec![Operand::Integer(1), Operand::Integer(0), Operand::Str(b"two".to_vec())],
            ),
        ]);
        assert_eq!(spans[0].baseline, 88.0);
        assert_eq!(spans[1].baseline, 76.0);
    }

    #[test]
    fn test_unknown_font_key_used_as_name() {
        let spans = spans_of(vec![op("BT", vec![]), tf(b"F9", 10.0), tj("x")]);
        assert_eq!(spans[0].font_name, "F9");
    }

    #[test]
    fn test_group_spans_into_top_down_lines() {
        let span = |text: &str, x: f32, baseline: f32, size: f32, font: &str| Span {
            text: text.to_string(),
            x,
            baseline,
            width: text.chars().count() as f32 * size * CHAR_WIDTH_RATIO,
            font_size: size,
            font_name: font.to_string(),
        };
        let lines = group_spans(
            vec![
                span("body", 72.0, 600.0, 11.0, "Times"),
                span("Chapter", 72.0, 700.0, 18.0, "Times-Bold"),
                span("One", 150.0, 700.5, 18.0, "Times-Bold"),
            ],
            1,
            PageBox::default(),
        );
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "Chapter One");
        assert!(lines[0].is_bold);
        assert_eq!(lines[0].order_index, 0);
        assert!((lines[0].y0 - (792.0 - 700.0 - 18.0 * ASCENT)).abs() < 1e-3);
        assert!(lines[0].y0 < lines[1].y0);
        assert!(!lines[1].is_bold);
    }

    #[test]
    fn test_group_spans_no_space_between_cjk() {
        let span = |text: &str, x: f32| Span {
            text: text.to_string(),
            x,
            baseline: 700.0,
            width: 12.0,
            font_size: 12.0,
            font_name: "MS-Mincho".to_string(),
        };
        let lines = group_spans(vec![span("概", 72.0), span("要", 90.0)], 1, PageBox::default());
        assert_eq!(lines[0].text, "概要");
    }

    #[test]
    fn test_read_pages_builds_pages() {
        let backend = MockBackend {
            pages: vec![vec![op("BT", vec![]), tf(b"F1", 12.0), tm(72.0, 700.0), tj("Hello")]],
            fonts: fonts(),
        };
        let pages = read_pages(&backend);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].number, 1);
        assert_eq!(pages[0].lines[0].text, "Hello");
        assert_eq!(pages[0].height, 792.0);
    }
}
