use std::path::PathBuf;

use crate::prelude::*;
use clap::Parser;
use outline::OutlineConfig;

mod batch;
mod error;
mod extract;
mod inspect;
mod prelude;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Extract a document's title and H1-H4 heading outline as JSON"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, Default, clap::Args)]
pub struct Global {
    /// TOML file overriding the heuristic weights and thresholds
    #[clap(long, env = "OUTLINER_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Whether to display additional information.
    #[clap(long, env = "OUTLINER_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

impl Global {
    /// Heuristics configuration: the `--config` file when given, defaults
    /// otherwise.
    pub fn outline_config(&self) -> Result<OutlineConfig> {
        match &self.config {
            Some(path) => OutlineConfig::load(path)
                .wrap_err_with(|| f!("failed to load config from {}", path.display())),
            None => Ok(OutlineConfig::default()),
        }
    }
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Print the outline of one document
    Extract(crate::extract::Options),

    /// Write one outline per document in a directory
    Batch(crate::batch::Options),

    /// Show font statistics and scored headings of one document
    Inspect(crate::inspect::Options),
}

#[tokio::main]
async fn main() -> Result<()> {
    let app = App::parse();

    let default_filter = if app.global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
    color_eyre::install()?;

    match app.command {
        SubCommands::Extract(options) => crate::extract::run(options, app.global).await,
        SubCommands::Batch(options) => crate::batch::run(options, app.global).await,
        SubCommands::Inspect(options) => crate::inspect::run(options, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
