use std::path::PathBuf;

use crate::prelude::{println, *};

#[derive(Debug, Clone, clap::Args)]
pub struct Options {
    /// Path to a `.pdf` document or a `.json` line dump
    path: PathBuf,

    /// Write the outline to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub async fn run(options: Options, global: crate::Global) -> Result<()> {
    let config = global.outline_config()?;

    // Extraction is synchronous and CPU bound.
    let outline = tokio::task::spawn_blocking({
        let path = options.path.clone();
        move || outline::extract_file(&path, &config)
    })
    .await?
    .map_err(Error::from)
    .wrap_err_with(|| f!("failed to extract {}", options.path.display()))?;

    let json = outline.to_json()?;
    match options.output {
        Some(out) => std::fs::write(&out, json + "\n")
            .wrap_err_with(|| f!("failed to write {}", out.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}
