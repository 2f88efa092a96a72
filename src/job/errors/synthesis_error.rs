use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SynthesisError {
    /// Neither the synopsis nor the first-hits file exists
    #[error("Missing input file, neither `{}` nor `{}` exists", .0.display(), .1.display())]
    MissingInputFile(PathBuf, PathBuf),
    #[error("No spectra found in MGF file `{}`", .0.display())]
    NoSpectraFound(PathBuf),
    #[error("No MSGF input was produced, neither the synopsis nor the first-hits file could be read")]
    NoInputProduced,
    #[error("Unable to index MGF file `{}`:\n\t{}", .0.display(), .1)]
    MgfIndexError(PathBuf, anyhow::Error),
    #[error("Unable to read PSMs from `{}`:\n\t{}", .0.display(), .1)]
    ReadError(PathBuf, anyhow::Error),
    #[error("Unable to write MSGF input file `{}`:\n\t{}", .0.display(), .1)]
    WriteError(PathBuf, anyhow::Error),
}
