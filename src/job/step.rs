// std imports
use std::fs::remove_file;
use std::path::{Path, PathBuf};
use std::time::Duration;

// 3rd party imports
use tracing::{error, info, warn};

// internal imports
use super::archive::archive_step_failure;
use crate::constants::{MGF_INDEX_CACHE_FILE_NAME, MSGF_RESULT_FILE_SUFFIX};
use crate::io::psm::mod_summary::ModificationSymbols;
use crate::io::psm::reader::PhrpTsvReader;
use crate::job::configuration::StepConfiguration;
use crate::job::context::JobContext;
use crate::job::errors::step_error::StepError;
use crate::job::parameters::{
    JobParameters, DEFAULT_ENTRIES_PER_SEGMENT, DEFAULT_ENZYME, DEFAULT_JAVA_MEMORY_SIZE,
    KEEP_MSGF_INPUT_FILES, MGF_INSTRUMENT_DATA, MSGF_ENTRIES_PER_SEGMENT, MSGF_ENZYME,
    MSGF_IGNORE_FILTERS, MSGF_JAVA_MEMORY_SIZE, MSGF_POST_RESULTS_TO_DB, MSGF_USE_CACHED_SCORES,
    RESULT_TYPE,
};
use crate::post_processing::cached_scores::render_cached_scores;
use crate::post_processing::reconciler::{ReconcileOutcome, ResultPostProcessor};
use crate::process::driver::{MsgfToolRunner, SegmentedProcessDriver};
use crate::process::supervisor::ExternalProcessSupervisor;
use crate::summary::reporter::{RunSummaryReporter, SummaryStore};
use crate::summary::statistics::SummaryStatistics;
use crate::synthesis::result_format::ResultFormat;
use crate::synthesis::synthesizer::{InputFileSynthesizer, SynthesisOptions, SynthesisSession};

/// Result of a successful MSGF step
///
#[derive(Debug, Clone)]
pub struct MsgfStepOutcome {
    pub format: ResultFormat,
    /// Lines of the synthesized input, including the header
    pub input_line_count: usize,
    /// True if the results were rendered from precomputed spectral probabilities
    pub used_cached_scores: bool,
    pub reconciled: ReconcileOutcome,
    /// Submitted statistics, if the summary was stored
    pub statistics: Option<SummaryStatistics>,
}

/// Rescores the results of an upstream search with MSGF:
/// synthesis, tool invocation, reconciliation, summary and cleanup.
///
pub struct MsgfStep<'a> {
    context: &'a JobContext,
    parameters: &'a JobParameters,
    config: &'a StepConfiguration,
}

impl<'a> MsgfStep<'a> {
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

    /// Result format of the upstream search
    ///
    pub fn result_format(&self) -> Result<ResultFormat, StepError> {
        let result_type = self.parameters.require_str(RESULT_TYPE)?;
        ResultFormat::from_result_type(result_type)
            .ok_or_else(|| StepError::UnknownResultType(result_type.to_string()))
    }

    /// Path of the MSGF result file, normalized after a successful run
    ///
    pub fn result_path(&self) -> PathBuf {
        self.context.dataset_file(MSGF_RESULT_FILE_SUFFIX)
    }

    /// Runs the step. On failure the working files are archived before the error is returned.
    ///
    /// # Arguments
    /// * `store` - Store receiving the run summary
    ///
    pub async fn run<S: SummaryStore + Sync>(
        &self,
        store: Option<&S>,
    ) -> Result<MsgfStepOutcome, StepError> {
        match self.execute(store).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                error!("{} MSGF step failed: {}", self.context.log_prefix(), err);
                self.archive();
                Err(err)
            }
        }
    }

    async fn execute<S: SummaryStore + Sync>(
        &self,
        store: Option<&S>,
    ) -> Result<MsgfStepOutcome, StepError> {
        let format = self.result_format()?;
        let mut session = SynthesisSession::new(format);
        let (input_path, input_line_count) = self.synthesize(&mut session)?;

        let cached_scores_requested = self.use_cached_scores(format);
        let used_cached_scores = cached_scores_requested && session.has_complete_cached_scores();
        let raw_output = if used_cached_scores {
            let output_path = self.result_path();
            render_cached_scores(&session, &input_path, &output_path)?;
            output_path
        } else {
            if cached_scores_requested {
                warn!(
                    "{} Precomputed spectral probabilities are incomplete, running MSGF",
                    self.context.log_prefix()
                );
            }
            self.run_tool(format, &input_path, input_line_count).await?
        };

        let protein_mods_path = format
            .strategy()
            .protein_mods_file_path(&self.context.work_dir, &self.context.dataset_name);
        let reconciled = ResultPostProcessor::new(self.context, &session, protein_mods_path)
            .reconcile(&input_path, &raw_output)?;
        info!(
            "{} {} normalized MSGF results in `{}`",
            self.context.log_prefix(),
            reconciled.synopsis_rows,
            reconciled.synopsis_path.display()
        );

        let statistics = if self.parameters.get_bool(MSGF_POST_RESULTS_TO_DB, false) {
            self.report(format, store).await?
        } else {
            None
        };

        self.cleanup(&input_path);
        Ok(MsgfStepOutcome {
            format,
            input_line_count,
            used_cached_scores,
            reconciled,
            statistics,
        })
    }

    /// Writes the MSGF input file from the upstream synopsis and first-hits files
    ///
    /// # Arguments
    /// * `session` - Session receiving skip list, cached scores and MGF index
    ///
    pub fn synthesize(
        &self,
        session: &mut SynthesisSession,
    ) -> Result<(PathBuf, usize), StepError> {
        let format = session.format();
        let strategy = format.strategy();
        let work_dir = &self.context.work_dir;
        let dataset = &self.context.dataset_name;

        let mod_summary_path = strategy.mod_summary_file_path(work_dir, dataset);
        let modifications = if mod_summary_path.is_file() {
            ModificationSymbols::from_mod_summary(&mod_summary_path)?
        } else {
            warn!(
                "{} `{}` not found, peptides are written without modification masses",
                self.context.log_prefix(),
                mod_summary_path.display()
            );
            ModificationSymbols::new()
        };

        let synopsis_path = work_dir.join(strategy.synopsis_file_name(dataset));
        let first_hits_path = strategy
            .first_hits_file_name(dataset)
            .map(|file_name| work_dir.join(file_name));
        let mgf_path = if self.parameters.get_bool(MGF_INSTRUMENT_DATA, false) {
            Some(self.context.dataset_file(".mgf"))
        } else {
            None
        };

        let options = SynthesisOptions {
            ignore_filters: self.parameters.get_bool(MSGF_IGNORE_FILTERS, false),
            use_cached_scores: self.use_cached_scores(format),
        };
        let synthesizer = InputFileSynthesizer::new(
            self.context,
            PhrpTsvReader::new(strategy.columns, modifications),
            options,
        );
        Ok(synthesizer.synthesize(
            session,
            &synopsis_path,
            first_hits_path.as_deref(),
            mgf_path.as_deref(),
        )?)
    }

    /// Computes and submits the run summary of the normalized results
    ///
    /// # Arguments
    /// * `store` - Store receiving the summary
    ///
    pub async fn summarize<S: SummaryStore + Sync>(
        &self,
        store: &S,
    ) -> Result<SummaryStatistics, StepError> {
        let format = self.result_format()?;
        let result_path = self.result_path();
        if !result_path.is_file() {
            return Err(StepError::MissingFile(result_path));
        }
        let reporter = RunSummaryReporter::new(store, &self.config.summary);
        Ok(reporter
            .summarize(
                format.strategy().tag,
                self.context,
                &result_path,
                self.parameters.dataset_id(),
            )
            .await?)
    }

    /// Submits the summary, failures are only fatal if configured
    ///
    async fn report<S: SummaryStore + Sync>(
        &self,
        format: ResultFormat,
        store: Option<&S>,
    ) -> Result<Option<SummaryStatistics>, StepError> {
        let store = match store {
            Some(store) => store,
            None => {
                warn!(
                    "{} No database configured, the {} summary is not stored",
                    self.context.log_prefix(),
                    format
                );
                return Ok(None);
            }
        };
        match self.summarize(store).await {
            Ok(statistics) => Ok(Some(statistics)),
            Err(err) if !err.is_fatal(self.config.summary.reporting_failure_is_fatal) => {
                warn!("{} {}", self.context.log_prefix(), err);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Runs MSGF over the input file, in two passes for MS-GF+ results with mixed fragmentation
    ///
    async fn run_tool(
        &self,
        format: ResultFormat,
        input_path: &Path,
        line_count: usize,
    ) -> Result<PathBuf, StepError> {
        let tools = &self.config.tools;
        let supervisor = ExternalProcessSupervisor::new(
            Duration::from_millis(tools.poll_interval_ms),
            tools.console_tail_lines,
            &tools.msgf_version_prefix,
        );
        let java_memory_mb = self
            .parameters
            .get_int(MSGF_JAVA_MEMORY_SIZE, DEFAULT_JAVA_MEMORY_SIZE);
        let enzyme = self.parameters.get_int(MSGF_ENZYME, DEFAULT_ENZYME);
        let entries_per_segment = self
            .parameters
            .get_int(MSGF_ENTRIES_PER_SEGMENT, DEFAULT_ENTRIES_PER_SEGMENT);

        let runner = MsgfToolRunner::new(
            self.context,
            supervisor,
            &tools.java_path,
            &tools.msgf_jar_path,
            u32::try_from(java_memory_mb).map_err(|_| {
                StepError::InvalidParameter(MSGF_JAVA_MEMORY_SIZE, java_memory_mb.to_string())
            })?,
            u32::try_from(enzyme)
                .map_err(|_| StepError::InvalidParameter(MSGF_ENZYME, enzyme.to_string()))?,
        );
        let driver = SegmentedProcessDriver::new(
            self.context,
            runner,
            // zero or negative disables segmentation
            usize::try_from(entries_per_segment).unwrap_or(0),
            self.keep_input_files(),
            Duration::from_secs(tools.progress_interval_secs),
        );

        let output_path = if format == ResultFormat::MsgfPlus {
            driver.run_dual_mode(input_path).await?
        } else {
            driver.run(input_path, line_count).await?
        };
        Ok(output_path)
    }

    fn use_cached_scores(&self, format: ResultFormat) -> bool {
        format == ResultFormat::MsgfPlus && self.parameters.get_bool(MSGF_USE_CACHED_SCORES, false)
    }

    fn keep_input_files(&self) -> bool {
        self.parameters.get_bool(KEEP_MSGF_INPUT_FILES, false) || self.context.debug_level > 1
    }

    /// Removes the synthesized input and the MGF index cache unless they are kept
    ///
    fn cleanup(&self, input_path: &Path) {
        if self.keep_input_files() {
            return;
        }
        for path in [
            input_path.to_path_buf(),
            self.context.work_dir.join(MGF_INDEX_CACHE_FILE_NAME),
        ] {
            if path.exists() {
                if let Err(err) = remove_file(&path) {
                    warn!(
                        "{} Unable to remove `{}`: {}",
                        self.context.log_prefix(),
                        path.display(),
                        err
                    );
                }
            }
        }
    }

    fn archive(&self) {
        archive_step_failure(self.context, self.config.failed_results_dir.as_deref());
    }
}
