/// Rendering of precomputed MS-GF+ spectral probabilities as MSGF output
pub mod cached_scores;
/// Normalization of the MSGF output
pub mod reconciler;
