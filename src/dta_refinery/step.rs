// std imports
use std::path::PathBuf;
use std::time::Duration;

// 3rd party imports
use tracing::{error, info, warn, Instrument};

// internal imports
use super::log_parser::DtaRefineryLog;
use crate::job::archive::archive_step_failure;
use crate::job::configuration::StepConfiguration;
use crate::job::context::JobContext;
use crate::job::errors::process_error::ProcessError;
use crate::job::errors::step_error::StepError;
use crate::job::parameters::{
    JobParameters, DTA_REFINERY_POST_RESULTS_TO_DB, GENERATED_FASTA_NAME,
    PARAM_FILE_NAME,
};
use crate::process::supervisor::ExternalProcessSupervisor;
use crate::summary::reporter::{RunSummaryReporter, SummaryStore};
use crate::ui::step_progress::StepProgressView;

/// Name of the DTA-Refinery tool in logs, command script and console output file
///
pub const DTA_REFINERY_TOOL_NAME: &str = "DTA_Refinery";

/// Suffix of the concatenated DTA file refined by DTA-Refinery
///
const DTA_FILE_SUFFIX: &str = "_dta.txt";

/// Suffix of the DTA-Refinery log
///
const LOG_FILE_SUFFIX: &str = "_dta_DtaRefineryLog.txt";

/// Suffix of the refined DTA file
///
const FIXED_DTA_FILE_SUFFIX: &str = "_dta_FIXED.txt";

/// Refines the parent ion masses of a concatenated DTA file with DTA-Refinery
/// and reports the mass errors before and after refinement.
///
pub struct DtaRefineryStep<'a> {
    context: &'a JobContext,
    parameters: &'a JobParameters,
    config: &'a StepConfiguration,
}

impl<'a> DtaRefineryStep<'a> {
    /// Creates a new step
    ///
    /// # Arguments
    /// * `context` - Job context
    /// * `parameters` - Job parameters
    /// * `config` - Runner configuration
    ///
    pub fn new(
        context: &'a JobContext,
        parameters: &'a JobParameters,
        config: &'a StepConfiguration,
    ) -> Self {
        Self {
            context,
            parameters,
            config,
        }
    }

    /// Path of the refined DTA file
    ///
    pub fn fixed_dta_path(&self) -> PathBuf {
        self.context.dataset_file(FIXED_DTA_FILE_SUFFIX)
    }

    /// Runs DTA-Refinery, checks its log and submits the mass error statistics if requested.
    /// On failure the working files are archived before the error is returned.
    ///
    /// # Arguments
    /// * `store` - Store receiving the mass error statistics
    ///
    pub async fn run<S: SummaryStore + Sync>(
        &self,
        store: Option<&S>,
    ) -> Result<DtaRefineryLog, StepError> {
        match self.execute(store).await {
            Ok(log) => Ok(log),
            Err(err) => {
                error!(
                    "{} {} step failed: {}",
                    self.context.log_prefix(),
                    DTA_REFINERY_TOOL_NAME,
                    err
                );
                archive_step_failure(self.context, self.config.failed_results_dir.as_deref());
                Err(err)
            }
        }
    }

    async fn execute<S: SummaryStore + Sync>(
        &self,
        store: Option<&S>,
    ) -> Result<DtaRefineryLog, StepError> {
        let param_file = self.require_file(self.parameters.require_str(PARAM_FILE_NAME)?)?;
        let dta_file = self.require_file(&format!(
            "{}{}",
            self.context.dataset_name, DTA_FILE_SUFFIX
        ))?;
        let fasta_file = self.require_file(self.parameters.require_str(GENERATED_FASTA_NAME)?)?;

        let tools = &self.config.tools;
        let supervisor = ExternalProcessSupervisor::new(
            Duration::from_millis(tools.poll_interval_ms),
            tools.console_tail_lines,
            &tools.dta_refinery_version_prefix,
        );
        let arguments = [param_file, dta_file, fasta_file]
            .iter()
            .map(|path| path.to_string_lossy().to_string())
            .collect::<Vec<String>>();

        info!(
            "{} Refining parent ion masses with {}",
            self.context.log_prefix(),
            DTA_REFINERY_TOOL_NAME
        );
        // DTA-Refinery writes no progress, the bar only shows elapsed time
        let view = StepProgressView::new(DTA_REFINERY_TOOL_NAME);
        let outcome = supervisor
            .launch(
                DTA_REFINERY_TOOL_NAME,
                &tools.dta_refinery_path,
                &arguments,
                &self.context.work_dir,
                |sample| {
                    view.set_message(&format!(
                        "{} {:.0} MB",
                        DTA_REFINERY_TOOL_NAME, sample.memory_mb
                    ))
                },
            )
            .instrument(view.span().clone())
            .await?;

        let log_path = self.context.dataset_file(LOG_FILE_SUFFIX);
        let log = if log_path.is_file() {
            DtaRefineryLog::from_file(&log_path)?
        } else {
            warn!(
                "{} DTA-Refinery log `{}` not found",
                self.context.log_prefix(),
                log_path.display()
            );
            DtaRefineryLog::default()
        };

        for line in log.errors.iter() {
            error!("{} {}", self.context.log_prefix(), line);
        }
        if !outcome.success || !log.errors.is_empty() {
            let diagnostic = log
                .errors
                .last()
                .cloned()
                .or(outcome.console.last_error.clone());
            return Err(ProcessError::ProcessFailed {
                tool: DTA_REFINERY_TOOL_NAME.to_string(),
                segment: 1,
                diagnostic,
            }
            .into());
        }

        let fixed_path = self.fixed_dta_path();
        if !fixed_path.is_file() {
            return Err(ProcessError::MissingResultFile(fixed_path).into());
        }
        info!(
            "{} Refined {} spectra, median mass error {:?} ppm -> {:?} ppm",
            self.context.log_prefix(),
            log.spectra_count.unwrap_or_default(),
            log.original.median,
            log.refined.median
        );

        if self
            .parameters
            .get_bool(DTA_REFINERY_POST_RESULTS_TO_DB, false)
        {
            self.report(&log, store).await?;
        }
        Ok(log)
    }

    /// Submits the mass error statistics. Failures are only fatal if configured.
    ///
    async fn report<S: SummaryStore + Sync>(
        &self,
        log: &DtaRefineryLog,
        store: Option<&S>,
    ) -> Result<(), StepError> {
        let store = match store {
            Some(store) => store,
            None => {
                warn!(
                    "{} No database configured, mass error statistics are not stored",
                    self.context.log_prefix()
                );
                return Ok(());
            }
        };
        if !log.has_mass_errors() {
            warn!(
                "{} DTA-Refinery log contains no mass error statistics",
                self.context.log_prefix()
            );
            return Ok(());
        }
        let reporter = RunSummaryReporter::new(store, &self.config.summary);
        let result = reporter
            .submit(
                &self.config.summary.dta_refinery_summary_root,
                &self.config.summary.dta_refinery_procedure,
                self.context,
                self.parameters.dataset_id(),
                &log.measurements(),
            )
            .await;
        match result {
            Ok(()) => Ok(()),
            Err(err) => {
                let err = StepError::from(err);
                if err.is_fatal(self.config.summary.reporting_failure_is_fatal) {
                    return Err(err);
                }
                warn!("{} {}", self.context.log_prefix(), err);
                Ok(())
            }
        }
    }

    /// Resolves a file in the working directory which must exist
    ///
    fn require_file(&self, file_name: &str) -> Result<PathBuf, StepError> {
        let path = self.context.work_dir.join(file_name);
        if !path.is_file() {
            return Err(StepError::MissingFile(path));
        }
        Ok(path)
    }
}
