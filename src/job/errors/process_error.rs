use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Unable to launch `{}`:\n\t{}", .0.display(), .1)]
    LaunchError(PathBuf, std::io::Error),
    #[error("Unable to create console output file `{}`:\n\t{}", .0.display(), .1)]
    ConsoleOutputError(PathBuf, std::io::Error),
    #[error("Error while waiting for `{}`:\n\t{}", .0.display(), .1)]
    WaitError(PathBuf, std::io::Error),
    /// The tool exited unsuccessfully.
    /// Contains the last error line of the console output if there is one.
    #[error("{tool} failed (segment {segment}){}", .diagnostic.as_ref().map(|diag| format!(": {}", diag)).unwrap_or_default())]
    ProcessFailed {
        tool: String,
        segment: usize,
        diagnostic: Option<String>,
    },
    #[error("Unable to split `{}` into segments:\n\t{}", .0.display(), .1)]
    SegmentationError(PathBuf, anyhow::Error),
    #[error("Unable to combine segment results into `{}`:\n\t{}", .0.display(), .1)]
    CombineError(PathBuf, anyhow::Error),
    #[error("Tool produced no result file `{}`", .0.display())]
    MissingResultFile(PathBuf),
}
