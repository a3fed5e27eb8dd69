use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Normalize the text of one extracted line.
///
/// Applies NFC normalization, ligature expansion, removal of replacement and
/// control characters, and collapses every whitespace run to a single space.
pub fn normalize_line_text(text: &str) -> String {
    let mut result: String = text.nfc().collect();

    let ligatures = [
        ("\u{FB00}", "ff"),
        ("\u{FB01}", "fi"),
        ("\u{FB02}", "fl"),
        ("\u{FB03}", "ffi"),
        ("\u{FB04}", "ffl"),
    ];
    for (lig, replacement) in &ligatures {
        result = result.replace(lig, replacement);
    }

    result.retain(|c| c != '\u{FFFD}' && (!c.is_control() || c.is_whitespace()));

    collapse_whitespace(&result)
}

/// Trim and collapse whitespace runs to single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case- and whitespace-folded comparison key.
pub fn fold_key(text: &str) -> String {
    collapse_whitespace(&text.to_lowercase())
}

/// True when the text has no letter and no digit.
pub fn is_punctuation_only(text: &str) -> bool {
    !text.chars().any(|c| c.is_alphanumeric())
}

/// Sentence-final punctuation across scripts.
pub fn is_sentence_terminal(c: char) -> bool {
    matches!(
        c,
        '.' | '!'
            | '?'
            | '\u{3002}' // ideographic full stop
            | '\u{FF0E}' // fullwidth full stop
            | '\u{FF01}' // fullwidth exclamation
            | '\u{FF1F}' // fullwidth question mark
            | '\u{0964}' // devanagari danda
            | '\u{0965}' // devanagari double danda
            | '\u{061F}' // arabic question mark
            | '\u{06D4}' // arabic full stop
            | '\u{2026}' // ellipsis
    )
}

/// Whether the text reads as a finished sentence. A bare enumeration marker
/// such as `1.` or `IV.` does not.
pub fn ends_sentence(text: &str) -> bool {
    let trimmed = text.trim_end();
    match trimmed.chars().next_back() {
        Some(c) if is_sentence_terminal(c) => !is_enumeration_marker(trimmed),
        _ => false,
    }
}

/// A leading enumeration: `1.`, `1.2.3`, `2)`, `(4)`, `IV.`, `a)`.
/// Digits are any Unicode number, so `١.` and `３.` qualify.
pub fn enumeration_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"^(?:(?:\p{N}+(?:[.\-\u{2010}\u{2013}]\p{N}+)*[.):]?|\(\p{N}+\)",
            r"|[IVXLCDM]+[.)]|[ivxlcdm]+[.)]|\p{L}[.)])(?:\s|$)",
            r"|\p{N}+[\u{FF0E}\u{3001}])",
        ))
        .unwrap()
    })
}

/// A short leading word followed by a number: `Chapter 3`, `Section 2.1`,
/// `第3章`, `Appendix 1:`.
pub fn word_number_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\p{L}{1,15}\s?\p{N}+(?:\.\p{N}+)*(?:[.:)\-]|\s|\p{L}|$)").unwrap()
    })
}

/// The whole text is only an enumeration marker.
pub fn is_enumeration_marker(text: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^(?:\p{N}+(?:\.\p{N}+)*[.)]?|\(\p{N}+\)|[IVXLCDMivxlcdm]+[.)]|\p{L}[.)])$")
            .unwrap()
    });
    re.is_match(text.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough() {
        assert_eq!(normalize_line_text("Hello world."), "Hello world.");
    }

    #[test]
    fn test_ligature_fix() {
        assert_eq!(normalize_line_text("\u{FB01}nd"), "find");
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(normalize_line_text("  a \t  b\u{00A0} c  "), "a b c");
    }

    #[test]
    fn test_replacement_and_control_removed() {
        assert_eq!(normalize_line_text("Hel\u{FFFD}lo\u{0007}"), "Hello");
    }

    #[test]
    fn test_nfc_normalization() {
        let result = normalize_line_text("caf\u{0065}\u{0301}");
        assert_eq!(result, "caf\u{00E9}");
    }

    #[test]
    fn test_fold_key() {
        assert_eq!(fold_key("  Confidential   DRAFT "), "confidential draft");
    }

    #[test]
    fn test_punctuation_only() {
        assert!(is_punctuation_only("— * —"));
        assert!(!is_punctuation_only("- 3 -"));
        assert!(!is_punctuation_only("概要"));
    }

    #[test]
    fn test_ends_sentence() {
        assert!(ends_sentence("This is a sentence."));
        assert!(ends_sentence("これは文です。"));
        assert!(!ends_sentence("Chapter One:"));
        assert!(!ends_sentence("1."));
        assert!(!ends_sentence("IV."));
    }

    #[test]
    fn test_enumeration_prefix() {
        let re = enumeration_prefix();
        assert!(re.is_match("1. Introduction"));
        assert!(re.is_match("2.3.1 Scope"));
        assert!(re.is_match("4) Results"));
        assert!(re.is_match("(2) Terms"));
        assert!(re.is_match("IV. Discussion"));
        assert!(re.is_match("b) Goals"));
        assert!(re.is_match("３．概要"));
        assert!(re.is_match("१. परिचय"));
        assert!(!re.is_match("Introduction"));
        assert!(!re.is_match("概要"));
    }

    #[test]
    fn test_word_number_prefix() {
        let re = word_number_prefix();
        assert!(re.is_match("Chapter 3"));
        assert!(re.is_match("Section 2.1 Methods"));
        assert!(re.is_match("第3章 概要"));
        assert!(!re.is_match("Overview of the System"));
    }

    #[test]
    fn test_enumeration_marker() {
        assert!(is_enumeration_marker("1."));
        assert!(is_enumeration_marker("2.1"));
        assert!(is_enumeration_marker("(3)"));
        assert!(!is_enumeration_marker("1. Introduction"));
    }
}
