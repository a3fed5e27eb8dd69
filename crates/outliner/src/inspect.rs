use std::path::PathBuf;

use colored::Colorize;
use outline::analysis::stats::FontStatistics;
use outline::{Analysis, HeadingCandidate, HeadingLevel, Level};

use crate::prelude::{println, *};

#[derive(Debug, Clone, clap::Args)]
pub struct Options {
    /// Path to a `.pdf` document or a `.json` line dump
    path: PathBuf,
}

pub async fn run(options: Options, global: crate::Global) -> Result<()> {
    let config = global.outline_config()?;

    let analysis = tokio::task::spawn_blocking({
        let path = options.path.clone();
        move || outline::source::load_document(&path).map(|pages| Analysis::run(&pages, &config))
    })
    .await?
    .map_err(Error::from)
    .wrap_err_with(|| f!("failed to read {}", options.path.display()))?;

    let title = analysis
        .title
        .as_ref()
        .map(HeadingCandidate::text)
        .unwrap_or_default();
    println!("{} {}", "Title:".bold(), title);
    println!(
        "{} {} lines on {} pages",
        "Lines:".bold(),
        analysis.lines.lines.len(),
        analysis.lines.geometry.len()
    );
    println!();

    stats_table(&analysis.stats).printstd();
    println!();

    if analysis.headings.is_empty() {
        println!("{}", "No heading candidates".yellow());
        return Ok(());
    }
    headings_table(&analysis.headings).printstd();
    Ok(())
}

fn stats_table(stats: &FontStatistics) -> prettytable::Table {
    let mut table = new_table();
    table.add_row(prettytable::row!["Body size", f!("{:.1}pt", stats.body_size)]);
    table.add_row(prettytable::row!["Max size", f!("{:.1}pt", stats.max_size)]);
    for (rank, size) in stats.heading_sizes.iter().enumerate() {
        table.add_row(prettytable::row![HeadingLevel::from_rank(rank), f!("{size:.1}pt")]);
    }
    table
}

fn headings_table(headings: &[HeadingCandidate]) -> prettytable::Table {
    let mut table = new_table();
    table.add_row(prettytable::row!["Page", "Level", "Score", "Size", "Text"]);
    for heading in headings {
        let level = match heading.level {
            Some(Level::Heading(h)) => h.to_string(),
            Some(Level::Title) => "title".to_string(),
            None => "-".to_string(),
        };
        table.add_row(prettytable::row![
            heading.page(),
            level,
            f!("{:.2}", heading.score),
            f!("{:.1}", heading.font_size()),
            heading.text()
        ]);
    }
    table
}
