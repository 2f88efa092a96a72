/// Tail parsing of captured console output
pub mod console_output;
/// Protein modification annotation rewrite
pub mod protein_mods;
/// Normalized MSGF result file
pub mod result_file;
/// Synthesized MSGF input file
pub mod synthesized_input;
