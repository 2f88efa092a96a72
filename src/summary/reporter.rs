// std imports
use std::future::Future;
use std::path::Path;
use std::time::Duration;

// 3rd party imports
use metrics::counter;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info, warn};

// internal imports
use super::statistics::SummaryStatistics;
use super::xml_payload::build_payload;
use crate::io::msgf::result_file::read_normalized_results;
use crate::job::configuration::SummaryConfiguration;
use crate::job::context::JobContext;
use crate::job::errors::reporting_error::ReportingError;

/// Relational store receiving run summaries
///
pub trait SummaryStore {
    /// Looks up the ID of a dataset
    ///
    /// # Arguments
    /// * `dataset` - Dataset name
    ///
    fn dataset_id(&self, dataset: &str) -> impl Future<Output = Result<i32, ReportingError>> + Send;

    /// Calls the stored procedure and returns its return code, 0 on success
    ///
    /// # Arguments
    /// * `procedure` - Name of the stored procedure
    /// * `dataset_id` - Dataset ID
    /// * `payload` - XML payload
    ///
    fn call_procedure(
        &self,
        procedure: &str,
        dataset_id: i32,
        payload: &str,
    ) -> impl Future<Output = Result<i32, ReportingError>> + Send;
}

impl<S: SummaryStore + Sync> SummaryStore for &S {
    async fn dataset_id(&self, dataset: &str) -> Result<i32, ReportingError> {
        (**self).dataset_id(dataset).await
    }

    async fn call_procedure(
        &self,
        procedure: &str,
        dataset_id: i32,
        payload: &str,
    ) -> Result<i32, ReportingError> {
        (**self).call_procedure(procedure, dataset_id, payload).await
    }
}

/// PostgreSQL backed summary store
///
pub struct PostgresSummaryStore {
    pool: PgPool,
}

impl PostgresSummaryStore {
    /// Connects to the database
    ///
    /// # Arguments
    /// * `connection_string` - Database URL
    ///
    pub async fn connect(connection_string: &str) -> Result<Self, ReportingError> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(30))
            .connect(connection_string)
            .await?;
        Ok(Self { pool })
    }

    /// Procedure names are interpolated into the query, so only identifiers are accepted
    ///
    fn is_valid_procedure_name(procedure: &str) -> bool {
        !procedure.is_empty()
            && procedure
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    }
}

impl SummaryStore for PostgresSummaryStore {
    async fn dataset_id(&self, dataset: &str) -> Result<i32, ReportingError> {
        let dataset_id: Option<i32> =
            sqlx::query_scalar("SELECT dataset_id FROM t_dataset WHERE dataset = $1")
                .bind(dataset)
                .fetch_optional(&self.pool)
                .await?;
        dataset_id.ok_or_else(|| ReportingError::DatasetNotFound(dataset.to_string()))
    }

    async fn call_procedure(
        &self,
        procedure: &str,
        dataset_id: i32,
        payload: &str,
    ) -> Result<i32, ReportingError> {
        if !Self::is_valid_procedure_name(procedure) {
            return Err(ReportingError::PayloadError(anyhow::anyhow!(
                "Invalid procedure name `{}`",
                procedure
            )));
        }
        let query = format!("SELECT {}($1, $2)", procedure);
        let return_code: i32 = sqlx::query_scalar(&query)
            .bind(dataset_id)
            .bind(payload)
            .fetch_one(&self.pool)
            .await?;
        Ok(return_code)
    }
}

/// Computes run statistics and submits them to the [SummaryStore]
///
pub struct RunSummaryReporter<'a, S: SummaryStore> {
    store: S,
    config: &'a SummaryConfiguration,
}

impl<'a, S: SummaryStore> RunSummaryReporter<'a, S> {
    pub fn new(store: S, config: &'a SummaryConfiguration) -> Self {
        Self { store, config }
    }

    /// Computes the pass-rate statistics of the normalized MSGF results and submits them
    ///
    /// # Arguments
    /// * `result_format_tag` - Upstream result format
    /// * `context` - Job context
    /// * `result_path` - Normalized synopsis results
    /// * `dataset_id` - Dataset ID, looked up if not given
    ///
    pub async fn summarize(
        &self,
        result_format_tag: &str,
        context: &JobContext,
        result_path: &Path,
        dataset_id: Option<i32>,
    ) -> Result<SummaryStatistics, ReportingError> {
        let rows = read_normalized_results(result_path).map_err(ReportingError::StatisticsError)?;
        let statistics = SummaryStatistics::compute(&rows, self.config.spec_prob_threshold);
        info!(
            "{} {} of {} {} PSMs pass SpecProb <= {:e} ({:.2}%)",
            context.log_prefix(),
            statistics.passing_psms,
            statistics.total_psms,
            result_format_tag,
            self.config.spec_prob_threshold,
            statistics.percent_passing
        );
        self.submit(
            &self.config.msgf_summary_root,
            &self.config.msgf_procedure,
            context,
            dataset_id,
            &statistics.measurements(),
        )
        .await?;
        Ok(statistics)
    }

    /// Builds the payload and calls the stored procedure.
    /// Failed calls are retried, a non-zero return code is not.
    ///
    /// # Arguments
    /// * `root` - Root tag of the payload
    /// * `procedure` - Stored procedure
    /// * `context` - Job context
    /// * `dataset_id` - Dataset ID, looked up if not given
    /// * `measurements` - Named values
    ///
    pub async fn submit(
        &self,
        root: &str,
        procedure: &str,
        context: &JobContext,
        dataset_id: Option<i32>,
        measurements: &[(&str, String)],
    ) -> Result<(), ReportingError> {
        let payload = build_payload(root, &context.dataset_name, context.job, measurements)
            .map_err(ReportingError::PayloadError)?;
        debug!("{} Payload: {}", context.log_prefix(), payload);

        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = None;
        for attempt in 1..=max_attempts {
            let result = match dataset_id {
                Some(dataset_id) => Ok(dataset_id),
                None => self.store.dataset_id(&context.dataset_name).await,
            };
            let result = match result {
                Ok(dataset_id) => {
                    self.store
                        .call_procedure(procedure, dataset_id, &payload)
                        .await
                }
                Err(err) => Err(err),
            };
            match result {
                Ok(0) => {
                    counter!("msgf_runner_summary_submissions", "result" => "success").increment(1);
                    info!("{} Summary stored by `{}`", context.log_prefix(), procedure);
                    return Ok(());
                }
                Ok(return_code) => {
                    counter!("msgf_runner_summary_submissions", "result" => "rejected")
                        .increment(1);
                    return Err(ReportingError::ProcedureReturnCode(return_code));
                }
                // a missing dataset will not appear by retrying
                Err(ReportingError::DatasetNotFound(dataset)) => {
                    return Err(ReportingError::DatasetNotFound(dataset));
                }
                Err(err) => {
                    warn!(
                        "{} Attempt {}/{} to call `{}` failed: {}",
                        context.log_prefix(),
                        attempt,
                        max_attempts,
                        procedure,
                        err
                    );
                    last_error = Some(err);
                    if attempt < max_attempts {
                        tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                    }
                }
            }
        }
        counter!("msgf_runner_summary_submissions", "result" => "failed").increment(1);
        Err(ReportingError::RetriesExhausted(
            max_attempts,
            Box::new(last_error.unwrap_or(ReportingError::ProcedureReturnCode(-1))),
        ))
    }
}
