/// Streaming MGF indexing
pub mod mgf;
/// Files read and written around the MSGF invocation
pub mod msgf;
/// Peptide-spectrum matches of upstream search results
pub mod psm;
