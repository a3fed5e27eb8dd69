use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, warn};
use outline::{Outline, OutlineConfig, OutlineError};
use tokio::sync::{oneshot, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

use crate::prelude::{println, *};

#[derive(Debug, Clone, clap::Args)]
pub struct Options {
    /// Directory holding `.pdf` documents and/or `.json` line dumps
    input_dir: PathBuf,

    /// Directory receiving one `<name>.json` outline per document
    output_dir: PathBuf,

    /// Documents processed at the same time (defaults to the number of CPUs)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Per-document time limit in seconds
    #[arg(long, default_value = "10")]
    timeout_secs: u64,
}

/// Outcome of one document.
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Done { entries: usize },
    Failed(String),
    TimedOut,
}

impl Status {
    pub fn is_success(&self) -> bool {
        matches!(self, Status::Done { .. })
    }
}

#[derive(Debug, Clone)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub status: Status,
}

pub async fn run(options: Options, global: crate::Global) -> Result<()> {
    let config = Arc::new(global.outline_config()?);
    let jobs = options.jobs.unwrap_or_else(default_jobs).max(1);
    let timeout = Duration::from_secs(options.timeout_secs);

    let reports =
        process_dir(&options.input_dir, &options.output_dir, config, jobs, timeout).await?;
    print_summary(&reports, timeout);
    Ok(())
}

fn default_jobs() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

/// Supported documents directly inside `dir`, sorted by file name.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::NotADirectory(dir.to_path_buf()).into());
    }
    let mut inputs = Vec::new();
    for entry in std::fs::read_dir(dir).wrap_err_with(|| f!("failed to read {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && outline::source::is_supported(&path) {
            inputs.push(path);
        }
    }
    inputs.sort();
    Ok(inputs)
}

/// Output file for every input: `<stem>.json`, or `<file name>.json` for
/// inputs whose stems collide (`report.pdf` and `report.json`).
pub fn output_paths(output_dir: &Path, inputs: &[PathBuf]) -> Vec<PathBuf> {
    let stem = |p: &Path| {
        p.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    };

    let mut counts: HashMap<String, usize> = HashMap::new();
    for input in inputs {
        *counts.entry(stem(input)).or_default() += 1;
    }

    inputs
        .iter()
        .map(|input| {
            let s = stem(input);
            let name = if counts[&s] > 1 {
                input.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or(s)
            } else {
                s
            };
            output_dir.join(f!("{name}.json"))
        })
        .collect()
}

/// Extract every supported document of `input_dir` into `output_dir`.
///
/// Documents run independently with at most `jobs` in flight. A document
/// that fails or times out still gets the empty outline written and is
/// reported in the returned list; only an unreadable input directory or an
/// uncreatable output directory fails the whole run.
pub async fn process_dir(
    input_dir: &Path,
    output_dir: &Path,
    config: Arc<OutlineConfig>,
    jobs: usize,
    timeout: Duration,
) -> Result<Vec<FileReport>> {
    let inputs = discover(input_dir)?;
    std::fs::create_dir_all(output_dir)
        .wrap_err_with(|| f!("failed to create {}", output_dir.display()))?;
    let outputs = output_paths(output_dir, &inputs);
    debug!("{} documents, {} at a time", inputs.len(), jobs);

    let progress = ProgressBar::new(inputs.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let semaphore = Arc::new(Semaphore::new(jobs.max(1)));
    let mut set = JoinSet::new();
    for (index, (input, output)) in inputs.into_iter().zip(outputs).enumerate() {
        let semaphore = semaphore.clone();
        let config = config.clone();
        let progress = progress.clone();
        set.spawn(async move {
            let status = match semaphore.acquire_owned().await {
                Ok(permit) => {
                    let job = {
                        let input = input.clone();
                        move || outline::extract_file(&input, &config)
                    };
                    let status = process_file(job, Some(permit), &output, timeout).await;
                    progress.set_message(display_name(&input));
                    progress.inc(1);
                    status
                }
                Err(e) => Status::Failed(e.to_string()),
            };
            (index, FileReport { input, output, status })
        });
    }

    let mut reports = Vec::with_capacity(set.len());
    while let Some(joined) = set.join_next().await {
        reports.push(joined.map_err(|e| Error::Worker(e.to_string()))?);
    }
    progress.finish_and_clear();

    reports.sort_by_key(|(index, _)| *index);
    Ok(reports.into_iter().map(|(_, report)| report).collect())
}

/// Run `job` on a named, detached thread and hand its result back over a
/// oneshot channel. The thread owns `permit`, so the slot is released when
/// extraction actually returns, not when the caller stops waiting.
fn spawn_worker<F>(
    job: F,
    permit: Option<OwnedSemaphorePermit>,
) -> std::io::Result<oneshot::Receiver<Result<Outline, OutlineError>>>
where
    F: FnOnce() -> Result<Outline, OutlineError> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    std::thread::Builder::new()
        .name("outline-worker".to_string())
        .spawn(move || {
            let result = job();
            drop(permit);
            // The receiver is gone once the document timed out.
            let _ = tx.send(result);
        })?;
    Ok(rx)
}

/// Run one extraction job under `timeout` and write its outline to `output`.
///
/// Failures and timeouts write `{"title": "", "outline": []}`. A timed-out
/// job is abandoned: its thread is detached and does not keep the runtime or
/// the process alive, but it keeps `permit` until it returns.
pub async fn process_file<F>(
    job: F,
    permit: Option<OwnedSemaphorePermit>,
    output: &Path,
    timeout: Duration,
) -> Status
where
    F: FnOnce() -> Result<Outline, OutlineError> + Send + 'static,
{
    let (outline, status) = match spawn_worker(job, permit) {
        Err(e) => (Outline::default(), Status::Failed(Error::Worker(e.to_string()).to_string())),
        Ok(rx) => match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(Ok(outline))) => {
                let entries = outline.entries.len();
                (outline, Status::Done { entries })
            }
            Ok(Ok(Err(e))) => (Outline::default(), Status::Failed(e.to_string())),
            Ok(Err(_)) => {
                let reason = Error::Worker("extraction thread panicked".to_string());
                (Outline::default(), Status::Failed(reason.to_string()))
            }
            Err(_) => (Outline::default(), Status::TimedOut),
        },
    };

    if let Status::Failed(reason) = &status {
        warn!("{}: {reason}", output.display());
    }

    let written = outline
        .to_json()
        .map_err(|e| e.to_string())
        .and_then(|json| std::fs::write(output, json + "\n").map_err(|e| e.to_string()));
    match written {
        Ok(()) => status,
        Err(e) => Status::Failed(f!("cannot write {}: {e}", output.display())),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_summary(reports: &[FileReport], timeout: Duration) {
    let failed: Vec<&FileReport> = reports.iter().filter(|r| !r.status.is_success()).collect();
    let done = reports.len() - failed.len();

    println!(
        "{} {} of {} documents",
        "Outlined".green().bold(),
        done,
        reports.len()
    );
    if failed.is_empty() {
        return;
    }

    println!("{}", f!("{} failed:", failed.len()).red().bold());
    let mut table = new_table();
    table.add_row(prettytable::row!["Document", "Status", "Reason"]);
    for report in failed {
        let (status, reason) = match &report.status {
            Status::TimedOut => ("timeout", Error::Timeout(timeout.as_secs()).to_string()),
            Status::Failed(reason) => ("failed", reason.clone()),
            Status::Done { .. } => continue,
        };
        table.add_row(prettytable::row![display_name(&report.input), status, reason]);
    }
    table.printstd();
}
