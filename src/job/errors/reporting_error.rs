use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportingError {
    #[error("Dataset `{0}` not found in database")]
    DatasetNotFound(String),
    #[error("Database error:\n\t{0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("Stored procedure returned {0}")]
    ProcedureReturnCode(i32),
    #[error("Unable to compute summary statistics:\n\t{0}")]
    StatisticsError(anyhow::Error),
    #[error("Unable to build XML payload:\n\t{0}")]
    PayloadError(anyhow::Error),
    #[error("Giving up after {0} attempts, last error:\n\t{1}")]
    RetriesExhausted(usize, Box<ReportingError>),
}
