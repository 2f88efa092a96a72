/// Submission of run summaries through a stored procedure
pub mod reporter;
/// Threshold based statistics of normalized MSGF results
pub mod statistics;
/// XML payload of the stored procedure call
pub mod xml_payload;
