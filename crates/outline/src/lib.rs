use std::collections::HashSet;
use std::path::Path;

use log::debug;
use thiserror::Error;

use analysis::lines::{aggregate_lines, DocumentLines};
use analysis::stats::{build_font_statistics, FontStatistics};

pub mod analysis;
pub mod assemble;
pub mod config;
pub mod source;
pub mod text;
pub mod types;

pub use config::OutlineConfig;
pub use types::*;

#[derive(Debug, Error)]
pub enum OutlineError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("Document has no readable text: {0}")]
    Unreadable(String),
    #[error("Invalid line dump: {0}")]
    InvalidInput(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Unsupported document type: {0}")]
    Unsupported(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Every intermediate result of one pipeline run.
///
/// Built by [`Analysis::run`]. The `outline` field is what gets serialized;
/// the rest is kept for inspection and diagnostics.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub lines: DocumentLines,
    pub stats: FontStatistics,
    /// Title run, or `None` when the document has no usable title.
    pub title: Option<HeadingCandidate>,
    /// Levelled and merged heading candidates, title lines excluded.
    pub headings: Vec<HeadingCandidate>,
    pub outline: Outline,
}

impl Analysis {
    /// Run the whole pipeline over producer pages.
    pub fn run(pages: &[Page], config: &OutlineConfig) -> Self {
        let lines = aggregate_lines(pages);
        let stats = build_font_statistics(&lines.lines, &config.stats);
        debug!(
            "body size {:.1}pt, heading sizes {:?}",
            stats.body_size, stats.heading_sizes
        );

        let title = analysis::title::select_title(&lines, &stats, config);
        let candidates = analysis::scoring::score_lines(&lines, &stats, config);
        let levelled = analysis::levels::assign_levels(candidates, &stats, &lines, config);

        let title_keys: HashSet<(u32, usize)> = title
            .iter()
            .flat_map(|t| t.lines.iter().map(TextLine::key))
            .collect();
        let (overlapping, pool): (Vec<_>, Vec<_>) = levelled
            .iter()
            .cloned()
            .partition(|c| c.lines.iter().any(|l| title_keys.contains(&l.key())));

        let headings = analysis::merge::merge_multiline(&pool, &config.merge);
        let entries = assemble::assemble_entries(&headings, &lines, &config.assembly);

        // A document whose only heading-grade text is the title run gets that
        // run as its outline instead.
        if entries.is_empty() && !overlapping.is_empty() {
            let headings = analysis::merge::merge_multiline(&levelled, &config.merge);
            let entries = assemble::assemble_entries(&headings, &lines, &config.assembly);
            if !entries.is_empty() {
                debug!("lone heading run kept in the outline, title cleared");
                return Self {
                    outline: assemble::build_outline(None, entries),
                    lines,
                    stats,
                    title: None,
                    headings,
                };
            }
        }

        Self {
            outline: assemble::build_outline(title.as_ref(), entries),
            lines,
            stats,
            title,
            headings,
        }
    }
}

/// Extract the outline of already-produced pages.
pub fn extract_outline(pages: &[Page], config: &OutlineConfig) -> Outline {
    Analysis::run(pages, config).outline
}

/// Load a `.pdf` or `.json` document and extract its outline.
///
/// A document that loads but carries no text at all is reported as
/// [`OutlineError::Unreadable`]; callers that need the empty outline for it
/// can fall back to `Outline::default()`.
pub fn extract_file(path: &Path, config: &OutlineConfig) -> Result<Outline, OutlineError> {
    let pages = source::load_document(path)?;
    if pages.iter().all(|p| p.lines.is_empty()) {
        return Err(OutlineError::Unreadable(path.display().to_string()));
    }
    Ok(extract_outline(&pages, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_line(page: u32, text: &str, y0: f32, font_size: f32, bold: bool) -> TextLine {
        TextLine {
            page,
            text: text.to_string(),
            font_size,
            font_name: String::new(),
            is_bold: bold,
            x0: 72.0,
            y0,
            x1: 72.0 + text.chars().count() as f32 * font_size * 0.5,
            y1: y0 + font_size,
            order_index: 0,
        }
    }

    fn body(page: u32, from: f32, count: usize) -> Vec<TextLine> {
        (0..count)
            .map(|i| {
                make_line(
                    page,
                    "Body text keeps going across most of the usable page width here.",
                    from + i as f32 * 15.0,
                    12.0,
                    false,
                )
            })
            .collect()
    }

    fn page(number: u32, lines: Vec<TextLine>) -> Page {
        Page {
            number,
            width: 612.0,
            height: 792.0,
            lines,
        }
    }

    #[test]
    fn test_empty_document() {
        let outline = extract_outline(&[], &OutlineConfig::default());
        assert_eq!(outline, Outline::default());
        assert_eq!(
            outline.to_json().unwrap().replace([' ', '\n'], ""),
            r#"{"title":"","outline":[]}"#
        );
    }

    #[test]
    fn test_lone_heading_stays_in_outline() {
        let mut lines = vec![make_line(1, "Introduction", 80.0, 24.0, true)];
        lines.extend(body(1, 130.0, 20));
        let analysis = Analysis::run(&[page(1, lines)], &OutlineConfig::default());
        assert_eq!(analysis.outline.title, "");
        assert_eq!(
            analysis.outline.entries,
            vec![OutlineEntry {
                level: HeadingLevel::H1,
                text: "Introduction".to_string(),
                page: 1,
            }]
        );
        assert!(analysis.title.is_none());
    }

    #[test]
    fn test_title_excluded_from_outline() {
        let mut p1 = vec![
            make_line(1, "Field Report", 60.0, 28.0, true),
            make_line(1, "1. Background", 140.0, 18.0, true),
        ];
        p1.extend(body(1, 170.0, 20));
        let mut p2 = vec![make_line(2, "2. Method", 60.0, 18.0, true)];
        p2.extend(body(2, 90.0, 20));

        let outline = extract_outline(&[page(1, p1), page(2, p2)], &OutlineConfig::default());
        assert_eq!(outline.title, "Field Report");
        let texts: Vec<&str> = outline.entries.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["1. Background", "2. Method"]);
        assert!(outline.entries.iter().all(|e| e.text != outline.title));
    }

    #[test]
    fn test_uniform_font_is_title_only() {
        let mut lines = vec![make_line(1, "Meeting Notes", 60.0, 12.0, true)];
        lines.extend(body(1, 90.0, 20));
        let analysis = Analysis::run(&[page(1, lines)], &OutlineConfig::default());
        assert!(!analysis.stats.has_heading_sizes());
        assert!(analysis.outline.entries.is_empty());
        assert_eq!(analysis.outline.title, "Meeting Notes");
    }

    #[test]
    fn test_extract_file_reports_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.json");
        std::fs::write(&path, r#"{"pages":[{"number":1,"lines":[]}]}"#).unwrap();
        let err = extract_file(&path, &OutlineConfig::default()).unwrap_err();
        assert!(matches!(err, OutlineError::Unreadable(_)));
    }
}
