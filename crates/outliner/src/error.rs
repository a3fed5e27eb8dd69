use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("Worker failed: {0}")]
    Worker(String),

    #[error(transparent)]
    Outline(#[from] outline::OutlineError),
}
