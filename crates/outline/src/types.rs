use std::fmt;

use serde::{Deserialize, Serialize};

/// One line of text as delivered by a producer.
///
/// Coordinates are top-down: `y0` is the top edge of the line and grows toward
/// the bottom of the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub page: u32,
    pub text: String,
    pub font_size: f32,
    #[serde(default)]
    pub font_name: String,
    #[serde(default)]
    pub is_bold: bool,
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    #[serde(default)]
    pub order_index: usize,
}

impl TextLine {
    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }

    /// Bold either by explicit flag or by the font name.
    pub fn is_bold(&self) -> bool {
        self.is_bold || font_name_is_bold(&self.font_name)
    }

    /// Identity of a line inside one document: `(page, order_index)`.
    pub fn key(&self) -> (u32, usize) {
        (self.page, self.order_index)
    }
}

/// Font names such as `Arial-BoldMT` or `NotoSansCJK-Black` carry weight in
/// their name even when the producer does not flag them.
pub fn font_name_is_bold(font_name: &str) -> bool {
    let lower = font_name.to_lowercase();
    ["bold", "black", "heavy", "semibold", "demi"]
        .iter()
        .any(|w| lower.contains(w))
}

/// A page of text lines. A zero `width`/`height` means the producer did not
/// know the page geometry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub number: u32,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
    #[serde(default)]
    pub lines: Vec<TextLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
    H4,
}

impl HeadingLevel {
    pub const ALL: [HeadingLevel; 4] = [
        HeadingLevel::H1,
        HeadingLevel::H2,
        HeadingLevel::H3,
        HeadingLevel::H4,
    ];

    /// Level for a zero-based size-cluster rank. Ranks past the last level
    /// clamp to H4.
    pub fn from_rank(rank: usize) -> Self {
        Self::ALL[rank.min(Self::ALL.len() - 1)]
    }

    /// One level deeper, saturating at H4.
    pub fn deeper(self) -> Self {
        Self::from_rank(self.as_u8() as usize)
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            HeadingLevel::H1 => 1,
            HeadingLevel::H2 => 2,
            HeadingLevel::H3 => 3,
            HeadingLevel::H4 => 4,
        }
    }
}

impl fmt::Display for HeadingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H{}", self.as_u8())
    }
}

/// Classification a heading candidate can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Title,
    Heading(HeadingLevel),
}

impl Level {
    pub fn heading(&self) -> Option<HeadingLevel> {
        match self {
            Level::Title => None,
            Level::Heading(h) => Some(*h),
        }
    }
}

/// A line, or a contiguous run of lines, that may be part of the outline.
///
/// `lines` is never empty: candidates start from one line and only grow by
/// merging. The accessors below rely on that and panic on an empty run.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadingCandidate {
    pub lines: Vec<TextLine>,
    pub score: f32,
    pub level: Option<Level>,
}

impl HeadingCandidate {
    pub fn new(line: TextLine, score: f32) -> Self {
        Self {
            lines: vec![line],
            score,
            level: None,
        }
    }

    /// Lines joined by a single space.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn first(&self) -> &TextLine {
        &self.lines[0]
    }

    pub fn last(&self) -> &TextLine {
        &self.lines[self.lines.len() - 1]
    }

    pub fn page(&self) -> u32 {
        self.first().page
    }

    /// Mean font size across the constituent lines.
    pub fn font_size(&self) -> f32 {
        self.lines.iter().map(|l| l.font_size).sum::<f32>() / self.lines.len() as f32
    }

    pub fn char_count(&self) -> usize {
        let chars: usize = self.lines.iter().map(|l| l.text.chars().count()).sum();
        chars + self.lines.len().saturating_sub(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    pub level: HeadingLevel,
    pub text: String,
    pub page: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    pub title: String,
    #[serde(rename = "outline")]
    pub entries: Vec<OutlineEntry>,
}

impl Outline {
    /// Pretty-printed JSON in the output schema.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> TextLine {
        TextLine {
            page: 1,
            text: text.to_string(),
            font_size: 12.0,
            font_name: "Helvetica".to_string(),
            is_bold: false,
            x0: 72.0,
            y0: 100.0,
            x1: 200.0,
            y1: 112.0,
            order_index: 0,
        }
    }

    #[test]
    fn test_heading_level_from_rank_clamps() {
        assert_eq!(HeadingLevel::from_rank(0), HeadingLevel::H1);
        assert_eq!(HeadingLevel::from_rank(3), HeadingLevel::H4);
        assert_eq!(HeadingLevel::from_rank(7), HeadingLevel::H4);
    }

    #[test]
    fn test_heading_level_deeper_saturates() {
        assert_eq!(HeadingLevel::H1.deeper(), HeadingLevel::H2);
        assert_eq!(HeadingLevel::H4.deeper(), HeadingLevel::H4);
        assert_eq!(HeadingLevel::from_rank(9), HeadingLevel::H4);
    }

    #[test]
    fn test_heading_level_serializes_as_tag() {
        let json = serde_json::to_string(&HeadingLevel::H3).unwrap();
        assert_eq!(json, "\"H3\"");
        assert_eq!(HeadingLevel::H2.to_string(), "H2");
    }

    #[test]
    fn test_font_name_bold_detection() {
        assert!(font_name_is_bold("Arial-BoldMT"));
        assert!(font_name_is_bold("NotoSansCJKjp-Black"));
        assert!(!font_name_is_bold("TimesNewRomanPSMT"));
    }

    #[test]
    fn test_line_bold_from_font_name() {
        let mut l = line("Heading");
        assert!(!l.is_bold());
        l.font_name = "Helvetica-Bold".to_string();
        assert!(l.is_bold());
    }

    #[test]
    fn test_candidate_text_joins_with_space() {
        let mut c = HeadingCandidate::new(line("Chapter One:"), 0.8);
        c.lines.push(line("Overview"));
        assert_eq!(c.text(), "Chapter One: Overview");
        assert_eq!(c.char_count(), "Chapter One: Overview".chars().count());
    }

    #[test]
    fn test_char_count_of_empty_run_is_zero() {
        let mut c = HeadingCandidate::new(line("Scope"), 0.8);
        c.lines.clear();
        assert_eq!(c.char_count(), 0);
        assert_eq!(c.text(), "");
    }

    #[test]
    fn test_outline_json_shape() {
        let outline = Outline {
            title: "Doc".to_string(),
            entries: vec![OutlineEntry {
                level: HeadingLevel::H1,
                text: "Intro".to_string(),
                page: 1,
            }],
        };
        let value: serde_json::Value = serde_json::from_str(&outline.to_json().unwrap()).unwrap();
        assert_eq!(value["title"], "Doc");
        assert_eq!(value["outline"][0]["level"], "H1");
        assert_eq!(value["outline"][0]["page"], 1);
    }

    #[test]
    fn test_text_line_deserializes_with_defaults() {
        let l: TextLine = serde_json::from_str(
            r#"{"page":2,"text":"x","font_size":10,"x0":0,"y0":0,"x1":5,"y1":10}"#,
        )
        .unwrap();
        assert_eq!(l.page, 2);
        assert!(!l.is_bold);
        assert_eq!(l.order_index, 0);
    }
}
