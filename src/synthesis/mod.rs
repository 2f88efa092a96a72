/// Upstream result formats and their filter predicates
pub mod result_format;
/// Creation of the MSGF input file from synopsis and first-hits files
pub mod synthesizer;
