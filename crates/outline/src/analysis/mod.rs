//! Heading detection stages.
//!
//! ```text
//! Page[] -> DocumentLines -> FontStatistics -> title + candidates
//!           aggregate_lines  build_font_statistics  select_title / score_lines
//!        -> levelled candidates -> merged candidates
//!           assign_levels          merge_multiline
//! ```
//!
//! Each stage reads the previous stage's output and returns a fresh value.

pub mod levels;
pub mod lines;
pub mod merge;
pub mod scoring;
pub mod stats;
pub mod title;
