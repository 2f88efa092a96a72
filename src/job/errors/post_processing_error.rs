use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PostProcessingError {
    #[error("Column `{}` not found in the header of `{}`", .0, .1.display())]
    MissingColumn(&'static str, PathBuf),
    #[error("{count} of {total} rows report a precursor mass mismatch")]
    ExcessivePrecursorMassErrors { count: usize, total: usize },
    #[error("{count} of {total} MGF indices could not be resolved to a scan number")]
    ExcessiveMgfLookupFailures { count: usize, total: usize },
    #[error("Unable to replace `{}` with the normalized result file:\n\t{}", .0.display(), .1)]
    ResultFileSwapFailed(PathBuf, std::io::Error),
    #[error("Unable to read `{}`:\n\t{}", .0.display(), .1)]
    ReadError(PathBuf, anyhow::Error),
    #[error("Unable to write `{}`:\n\t{}", .0.display(), .1)]
    WriteError(PathBuf, anyhow::Error),
}
