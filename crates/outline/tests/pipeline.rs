//! End-to-end outline extraction over synthetic documents.

use std::collections::HashSet;

use outline::{
    extract_file, extract_outline, Analysis, HeadingLevel, OutlineConfig, OutlineEntry, Page,
    TextLine,
};

const BODY: &str = "Regular paragraph text fills most of the measure on every page.";

/// Small document builder: lines are appended top to bottom per page.
#[derive(Default)]
struct Doc {
    pages: Vec<Page>,
}

impl Doc {
    fn page(mut self) -> Self {
        let number = self.pages.len() as u32 + 1;
        self.pages.push(Page {
            number,
            width: 612.0,
            height: 792.0,
            lines: Vec::new(),
        });
        self
    }

    fn line(mut self, text: &str, y0: f32, font_size: f32, bold: bool) -> Self {
        let page = self.pages.last_mut().expect("call page() first");
        page.lines.push(TextLine {
            page: page.number,
            text: text.to_string(),
            font_size,
            font_name: if bold { "Inter-Bold" } else { "Inter-Regular" }.to_string(),
            is_bold: bold,
            x0: 72.0,
            y0,
            x1: 72.0 + text.chars().count() as f32 * font_size * 0.5,
            y1: y0 + font_size,
            order_index: page.lines.len(),
        });
        self
    }

    fn body(mut self, from: f32, count: usize) -> Self {
        for i in 0..count {
            self = self.line(BODY, from + i as f32 * 15.0, 12.0, false);
        }
        self
    }

    fn pages(&self) -> &[Page] {
        &self.pages
    }
}

fn entry(level: HeadingLevel, text: &str, page: u32) -> OutlineEntry {
    OutlineEntry {
        level,
        text: text.to_string(),
        page,
    }
}

#[test]
fn test_single_introduction_heading() {
    let doc = Doc::default()
        .page()
        .line("Introduction", 72.0, 24.0, true)
        .body(120.0, 25);
    let outline = extract_outline(doc.pages(), &OutlineConfig::default());
    assert_eq!(outline.entries, vec![entry(HeadingLevel::H1, "Introduction", 1)]);

    let json: serde_json::Value = serde_json::from_str(&outline.to_json().unwrap()).unwrap();
    assert_eq!(
        json["outline"],
        serde_json::json!([{"level": "H1", "text": "Introduction", "page": 1}])
    );
}

#[test]
fn test_two_line_heading_merged() {
    let doc = Doc::default()
        .page()
        .line("Project Handbook", 60.0, 12.0, true)
        .body(100.0, 30)
        .page()
        .line("Chapter One:", 100.0, 18.0, true)
        .line("Overview of the System", 122.0, 18.0, true)
        .body(170.0, 30);
    let outline = extract_outline(doc.pages(), &OutlineConfig::default());
    assert_eq!(outline.title, "Project Handbook");
    assert_eq!(
        outline.entries,
        vec![entry(HeadingLevel::H1, "Chapter One: Overview of the System", 2)]
    );
}

#[test]
fn test_number_on_its_own_line_joins_heading() {
    let doc = Doc::default()
        .page()
        .line("Technical Manual", 60.0, 28.0, true)
        .line("1.", 140.0, 18.0, true)
        .line("Introduction", 162.0, 18.0, true)
        .body(200.0, 30);
    let outline = extract_outline(doc.pages(), &OutlineConfig::default());
    assert_eq!(outline.title, "Technical Manual");
    assert_eq!(outline.entries, vec![entry(HeadingLevel::H2, "1. Introduction", 1)]);
}

#[test]
fn test_running_header_appears_at_most_once() {
    let mut doc = Doc::default();
    for n in 1..=10 {
        doc = doc.page().line("Confidential — Draft", 20.0, 14.0, true);
        if n == 1 {
            doc = doc.line("Quarterly Review", 100.0, 28.0, true);
        }
        if n % 3 == 0 {
            doc = doc.line(&format!("{}. Findings part {}", n / 3, n / 3), 160.0, 18.0, true);
        }
        doc = doc.body(200.0, 30);
    }

    let outline = extract_outline(doc.pages(), &OutlineConfig::default());
    assert_eq!(outline.title, "Quarterly Review");
    let headers = outline
        .entries
        .iter()
        .filter(|e| e.text == "Confidential — Draft")
        .count();
    assert!(headers <= 1, "running header kept {headers} times");

    let sections: Vec<&str> = outline
        .entries
        .iter()
        .filter(|e| e.text.contains("Findings"))
        .map(|e| e.text.as_str())
        .collect();
    assert_eq!(sections, vec!["1. Findings part 1", "2. Findings part 2", "3. Findings part 3"]);
}

#[test]
fn test_empty_document() {
    let outline = extract_outline(&[], &OutlineConfig::default());
    let json: serde_json::Value = serde_json::from_str(&outline.to_json().unwrap()).unwrap();
    assert_eq!(json, serde_json::json!({"title": "", "outline": []}));

    let blank_pages = Doc::default().page().page();
    assert_eq!(
        extract_outline(blank_pages.pages(), &OutlineConfig::default()),
        outline
    );
}

#[test]
fn test_uniform_font_yields_no_entries() {
    let doc = Doc::default()
        .page()
        .line("1. Plain numbered line", 72.0, 12.0, true)
        .body(100.0, 20)
        .page()
        .body(72.0, 20);
    let analysis = Analysis::run(doc.pages(), &OutlineConfig::default());
    assert!(analysis.stats.heading_sizes.is_empty());
    assert!(analysis.outline.entries.is_empty());
}

#[test]
fn test_levels_follow_size_rank() {
    let doc = Doc::default()
        .page()
        .line("Systems Design Notes", 60.0, 30.0, true)
        .line("1. Architecture", 120.0, 20.0, true)
        .body(150.0, 10)
        .line("1.1 Storage layer", 310.0, 16.0, true)
        .body(340.0, 10)
        .line("1.1.1 Write path", 500.0, 14.0, true)
        .body(530.0, 10)
        .page()
        .line("2. Operations", 72.0, 20.0, true)
        .body(110.0, 30);
    let outline = extract_outline(doc.pages(), &OutlineConfig::default());
    assert_eq!(outline.title, "Systems Design Notes");
    assert_eq!(
        outline.entries,
        vec![
            entry(HeadingLevel::H2, "1. Architecture", 1),
            entry(HeadingLevel::H3, "1.1 Storage layer", 1),
            entry(HeadingLevel::H4, "1.1.1 Write path", 1),
            entry(HeadingLevel::H2, "2. Operations", 2),
        ]
    );
}

#[test]
fn test_title_lines_never_in_outline() {
    let doc = Doc::default()
        .page()
        .line("Understanding Heading", 60.0, 26.0, true)
        .line("Detection", 90.0, 26.0, true)
        .line("Background", 160.0, 18.0, true)
        .body(190.0, 20)
        .page()
        .line("Understanding Heading", 72.0, 26.0, true)
        .body(110.0, 20);
    let analysis = Analysis::run(doc.pages(), &OutlineConfig::default());
    let title = analysis.title.as_ref().expect("title selected");
    assert_eq!(analysis.outline.title, "Understanding Heading Detection");

    let title_keys: HashSet<(u32, usize)> = title.lines.iter().map(TextLine::key).collect();
    for heading in &analysis.headings {
        for line in &heading.lines {
            assert!(!title_keys.contains(&line.key()), "{:?} is part of the title", line.text);
        }
    }
    assert!(analysis.outline.entries.iter().all(|e| e.page != 1 || e.text == "Background"));
}

#[test]
fn test_cjk_headings_detected() {
    let doc = Doc::default()
        .page()
        .line("年次報告書", 60.0, 26.0, true)
        .line("第1章 概要", 130.0, 18.0, true)
        .body(160.0, 15)
        .line("３．結果", 420.0, 18.0, true)
        .body(450.0, 15);
    let outline = extract_outline(doc.pages(), &OutlineConfig::default());
    assert_eq!(outline.title, "年次報告書");
    let texts: Vec<&str> = outline.entries.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["第1章 概要", "３．結果"]);
    assert!(outline.to_json().unwrap().contains("第1章 概要"));
}

#[test]
fn test_pipeline_is_deterministic() {
    let mut doc = Doc::default();
    for n in 1..=4 {
        doc = doc
            .page()
            .line("Field Manual", 20.0, 14.0, true)
            .line(&format!("Part {n}"), 80.0, 22.0, true)
            .body(120.0, 12)
            .line(&format!("{n}.1 Details"), 320.0, 16.0, true)
            .body(350.0, 12);
    }
    let config = OutlineConfig::default();
    let first = extract_outline(doc.pages(), &config).to_json().unwrap();
    let second = extract_outline(doc.pages(), &config).to_json().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_extract_file_from_json_dump() {
    let doc = Doc::default()
        .page()
        .line("Release Notes", 60.0, 24.0, true)
        .line("Fixes", 140.0, 16.0, true)
        .body(170.0, 20);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.json");
    let dump = serde_json::json!({ "pages": doc.pages() });
    std::fs::write(&path, dump.to_string()).unwrap();

    let outline = extract_file(&path, &OutlineConfig::default()).unwrap();
    assert_eq!(outline.title, "Release Notes");
    assert_eq!(outline.entries, vec![entry(HeadingLevel::H2, "Fixes", 1)]);
}
