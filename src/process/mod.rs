/// Command line of the MSGF invocation
pub mod command;
/// Segmented and dual-mode MSGF invocation
pub mod driver;
/// Progress estimation of a running invocation
pub mod progress;
/// Splitting and recombination of the MSGF input file
pub mod segmentation;
/// Launch and monitoring of external tools
pub mod supervisor;
