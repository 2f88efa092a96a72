/// Archival of the working files of failed job steps
pub mod archive;
/// Runner configuration and job description files
pub mod configuration;
/// Identity of the processed job step
pub mod context;
/// Error types
pub mod errors;
/// Job parameters handed over by the host
pub mod parameters;
/// Orchestration of the MSGF step
pub mod step;
