//! JSON line dumps, as written by external span extractors.
//!
//! Two shapes are accepted:
//!
//! ```json
//! {"pages": [{"number": 1, "width": 612, "height": 792, "lines": [...]}]}
//! ```
//!
//! or a bare array of lines, each carrying its own `page`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::types::{Page, TextLine};
use crate::OutlineError;

#[derive(Debug, Deserialize)]
struct PageDump {
    pages: Vec<Page>,
}

pub fn parse_dump(raw: &str) -> Result<Vec<Page>, OutlineError> {
    let invalid = |e: serde_json::Error| OutlineError::InvalidInput(e.to_string());
    let value: Value = serde_json::from_str(raw).map_err(invalid)?;

    let pages = match value {
        Value::Array(_) => {
            let lines: Vec<TextLine> = serde_json::from_value(value).map_err(invalid)?;
            pages_from_lines(lines)?
        }
        Value::Object(_) => serde_json::from_value::<PageDump>(value).map_err(invalid)?.pages,
        other => {
            return Err(OutlineError::InvalidInput(format!(
                "expected an object or an array, found {other}"
            )))
        }
    };

    let mut seen = BTreeMap::new();
    for page in &pages {
        if page.number != 0 && seen.insert(page.number, ()).is_some() {
            return Err(OutlineError::InvalidInput(format!(
                "page {} appears more than once",
                page.number
            )));
        }
    }
    Ok(pages)
}

/// Group loose lines into pages, keeping each page's lines in input order.
fn pages_from_lines(lines: Vec<TextLine>) -> Result<Vec<Page>, OutlineError> {
    let mut pages: BTreeMap<u32, Vec<TextLine>> = BTreeMap::new();
    for line in lines {
        if line.page == 0 {
            return Err(OutlineError::InvalidInput(format!(
                "line {:?} has page 0, pages are numbered from 1",
                line.text
            )));
        }
        pages.entry(line.page).or_default().push(line);
    }
    Ok(pages
        .into_iter()
        .map(|(number, lines)| Page {
            number,
            lines,
            ..Page::default()
        })
        .collect())
}

pub fn read_json(path: &Path) -> Result<Vec<Page>, OutlineError> {
    parse_dump(&std::fs::read_to_string(path)?)
}
