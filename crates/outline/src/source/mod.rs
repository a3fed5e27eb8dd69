//! Producers that turn a document file into [`Page`]s of text lines.

use std::path::Path;

use crate::types::Page;
use crate::OutlineError;

pub mod backend;
pub mod json;
pub mod pdf;

/// File extensions [`load_document`] understands, lowercase.
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["pdf", "json"];

pub fn is_supported(path: &Path) -> bool {
    extension(path).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// Read a document, picking the producer from the file extension.
pub fn load_document(path: &Path) -> Result<Vec<Page>, OutlineError> {
    match extension(path).as_deref() {
        Some("pdf") => pdf::read_pdf(path),
        Some("json") => json::read_json(path),
        _ => Err(OutlineError::Unsupported(path.display().to_string())),
    }
}
