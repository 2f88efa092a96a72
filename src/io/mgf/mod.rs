/// Bidirectional scan/charge to spectrum index map of an MGF file
pub mod index;
/// Creates the index by streaming through an MGF file
pub mod indexer;
