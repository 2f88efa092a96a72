// Include readme in doc
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/Readme.md"))]

/// Constants shared by all components
pub mod constants;
/// Refinement of parent ion masses with DTA-Refinery
pub mod dta_refinery;
/// Small helper functions
pub mod functions;
/// Readers and writers for the files touched by the runner
pub mod io;
/// Job context, parameters, configuration and step orchestration
pub mod job;
/// Normalization of the MSGF output
pub mod post_processing;
/// Invocation and supervision of external tools
pub mod process;
/// Run summaries stored in the database
pub mod summary;
/// Synthesis of the MSGF input from upstream search results
pub mod synthesis;
/// Progress display
pub mod ui;
