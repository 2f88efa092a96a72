/// Parser of the DTA-Refinery log
pub mod log_parser;
/// Invocation of DTA-Refinery
pub mod step;
