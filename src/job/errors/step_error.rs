use thiserror::Error;

use super::{
    post_processing_error::PostProcessingError, process_error::ProcessError,
    reporting_error::ReportingError, synthesis_error::SynthesisError,
};

/// Merges all component errors into a single error type
/// including some shared errors
///
#[derive(Error, Debug)]
pub enum StepError {
    // Component errors
    #[error("Synthesis error: {0}")]
    SynthesisError(#[from] SynthesisError),
    #[error("Process error: {0}")]
    ProcessError(#[from] ProcessError),
    #[error("Post-processing error: {0}")]
    PostProcessingError(#[from] PostProcessingError),
    #[error("Reporting failure: {0}")]
    ReportingFailure(#[from] ReportingError),
    // Common errors
    #[error("Unknown result type `{0}`")]
    UnknownResultType(String),
    #[error("Missing job parameter `{0}`")]
    MissingParameter(&'static str),
    #[error("Invalid job parameter `{0}`: `{1}`")]
    InvalidParameter(&'static str, String),
    #[error("Required file `{}` not found", .0.display())]
    MissingFile(std::path::PathBuf),
    #[error("Unable to read file: `{0}`:\n\t{1}")]
    FileReadError(String, std::io::Error),
    #[error("Unable to deserialize `{0}`:\n\t{1}")]
    ConfigDeserializationError(String, toml::de::Error),
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl StepError {
    /// Returns true if the error must fail the step.
    /// Reporting failures are downgraded to warnings unless configured otherwise.
    ///
    /// # Arguments
    /// * `reporting_failure_is_fatal` - Treat reporting failures as fatal
    ///
    pub fn is_fatal(&self, reporting_failure_is_fatal: bool) -> bool {
        match self {
            Self::ReportingFailure(_) => reporting_failure_is_fatal,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reporting_failure_is_not_fatal_by_default() {
        let error: StepError = ReportingError::ProcedureReturnCode(3).into();
        assert!(!error.is_fatal(false));
        assert!(error.is_fatal(true));

        let error: StepError = SynthesisError::NoInputProduced.into();
        assert!(error.is_fatal(false));
    }

    #[test]
    fn test_process_failed_message_contains_diagnostic() {
        let error = ProcessError::ProcessFailed {
            tool: "MSGF".to_string(),
            segment: 2,
            diagnostic: Some("Error: out of memory".to_string()),
        };
        assert_eq!(error.to_string(), "MSGF failed (segment 2): Error: out of memory");

        let error = ProcessError::ProcessFailed {
            tool: "MSGF".to_string(),
            segment: 1,
            diagnostic: None,
        };
        assert_eq!(error.to_string(), "MSGF failed (segment 1)");
    }
}
