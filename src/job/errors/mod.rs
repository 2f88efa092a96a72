/// Errors of the post-processing of the MSGF result file
pub mod post_processing_error;
/// Errors related to external process invocation and segmentation
pub mod process_error;
/// Errors related to the submission of run summaries
pub mod reporting_error;
/// Merges all component errors into a single step error
pub mod step_error;
/// Errors of the MSGF input file synthesis
pub mod synthesis_error;
