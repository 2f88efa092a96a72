/// Dynamic modification symbols from PHRP `_ModSummary.txt` files
pub mod mod_summary;
/// Peptide-spectrum match as yielded by result readers
pub mod psm_record;
/// Tab delimited PHRP result reader
pub mod reader;
