// std imports
use std::fs::{remove_file, File};
use std::future::Future;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

// 3rd party imports
use anyhow::Context;
use metrics::counter;
use tracing::{debug, info, Instrument};

// internal imports
use super::command::MsgfCommand;
use super::progress::{DualModePass, ProgressTracker};
use super::segmentation::{combine, plan_segments, remove_files, split};
use super::supervisor::ExternalProcessSupervisor;
use crate::constants::{
    FRAGMENTATION_MODE_AS_WRITTEN, FRAGMENTATION_MODE_ETD, MSGF_RESULT_FILE_SUFFIX,
};
use crate::io::msgf::synthesized_input::{column_index, COLLISION_MODE_COLUMN};
use crate::job::context::JobContext;
use crate::job::errors::process_error::ProcessError;
use crate::ui::step_progress::StepProgressView;

/// Name of the MSGF tool in logs, command script and console output file
///
pub const MSGF_TOOL_NAME: &str = "MSGF";

/// Runs MSGF on one input file. Implementations must not return before the tool exited.
///
pub trait SegmentRunner {
    /// Runs the tool
    ///
    /// # Arguments
    /// * `input_path` - Input file
    /// * `output_path` - Result file to create
    /// * `fragmentation_mode` - Fragmentation mode code
    /// * `segment` - 1-based segment number, used in error messages
    /// * `progress` - Progress tracker to feed while the tool runs
    ///
    fn run_segment(
        &self,
        input_path: &Path,
        output_path: &Path,
        fragmentation_mode: u8,
        segment: usize,
        progress: &mut ProgressTracker,
    ) -> impl Future<Output = Result<(), ProcessError>> + Send;
}

/// Runs MSGF as Java process through the [ExternalProcessSupervisor]
///
pub struct MsgfToolRunner<'a> {
    context: &'a JobContext,
    supervisor: ExternalProcessSupervisor,
    java_path: PathBuf,
    jar_path: PathBuf,
    java_memory_mb: u32,
    enzyme: u32,
}

impl<'a> MsgfToolRunner<'a> {
    /// Creates a new runner
    ///
    /// # Arguments
    /// * `context` - Job context
    /// * `supervisor` - Supervisor launching the Java process
    /// * `java_path` - Java executable
    /// * `jar_path` - MSGF jar
    /// * `java_memory_mb` - Java heap size in MB
    /// * `enzyme` - Enzyme code
    ///
    pub fn new(
        context: &'a JobContext,
        supervisor: ExternalProcessSupervisor,
        java_path: &Path,
        jar_path: &Path,
        java_memory_mb: u32,
        enzyme: u32,
    ) -> Self {
        Self {
            context,
            supervisor,
            java_path: java_path.to_path_buf(),
            jar_path: jar_path.to_path_buf(),
            java_memory_mb,
            enzyme,
        }
    }
}

impl SegmentRunner for MsgfToolRunner<'_> {
    async fn run_segment(
        &self,
        input_path: &Path,
        output_path: &Path,
        fragmentation_mode: u8,
        segment: usize,
        progress: &mut ProgressTracker,
    ) -> Result<(), ProcessError> {
        let command = MsgfCommand {
            java_memory_mb: self.java_memory_mb,
            jar_path: self.jar_path.clone(),
            input_path: input_path.to_path_buf(),
            spectrum_dir: self.context.work_dir.clone(),
            output_path: output_path.to_path_buf(),
            fragmentation_mode,
            enzyme: self.enzyme,
        };
        let outcome = self
            .supervisor
            .launch(
                MSGF_TOOL_NAME,
                &self.java_path,
                &command.to_arguments(),
                &self.context.work_dir,
                |sample| progress.on_sample(sample),
            )
            .await?;
        counter!("msgf_runner_segments_run").increment(1);

        if !outcome.success {
            return Err(ProcessError::ProcessFailed {
                tool: MSGF_TOOL_NAME.to_string(),
                segment,
                diagnostic: outcome.console.last_error,
            });
        }
        if !output_path.is_file() {
            return Err(ProcessError::MissingResultFile(output_path.to_path_buf()));
        }
        Ok(())
    }
}

/// Drives MSGF over a synthesized input file: single invocation, size bounded segments
/// or separate passes for non-ETD and ETD spectra. Segments run strictly sequentially.
///
pub struct SegmentedProcessDriver<'a, R: SegmentRunner> {
    context: &'a JobContext,
    runner: R,
    entries_per_segment: usize,
    keep_input_files: bool,
    progress_interval: Duration,
}

impl<'a, R: SegmentRunner> SegmentedProcessDriver<'a, R> {
    /// Creates a new driver
    ///
    /// # Arguments
    /// * `context` - Job context
    /// * `runner` - Tool runner
    /// * `entries_per_segment` - Nominal rows per invocation
    /// * `keep_input_files` - Keep segment and bucket input files
    /// * `progress_interval` - Interval between two line counts of the running output file
    ///
    pub fn new(
        context: &'a JobContext,
        runner: R,
        entries_per_segment: usize,
        keep_input_files: bool,
        progress_interval: Duration,
    ) -> Self {
        Self {
            context,
            runner,
            entries_per_segment,
            keep_input_files,
            progress_interval,
        }
    }

    /// Path of the combined MSGF result file
    ///
    pub fn output_path(&self) -> PathBuf {
        self.context.dataset_file(MSGF_RESULT_FILE_SUFFIX)
    }

    /// Runs MSGF over the input file, segmenting it if necessary.
    /// Returns the path of the combined result file.
    ///
    /// # Arguments
    /// * `input_path` - Synthesized input file
    /// * `line_count` - Lines of the input file, including the header
    ///
    pub async fn run(&self, input_path: &Path, line_count: usize) -> Result<PathBuf, ProcessError> {
        let output_path = self.output_path();
        let view = StepProgressView::new(MSGF_TOOL_NAME);
        let mut tracker = ProgressTracker::new(
            line_count.saturating_sub(1),
            self.progress_interval,
            view.clone(),
        );
        self.run_bucket(
            input_path,
            line_count,
            &output_path,
            FRAGMENTATION_MODE_AS_WRITTEN,
            &mut tracker,
        )
        .instrument(view.span().clone())
        .await?;
        Ok(output_path)
    }

    /// Runs MSGF separately over non-ETD and ETD rows of the input file and appends
    /// both results into one file. Falls back to a single pass if one bucket is empty.
    /// If the second pass fails the results of the first pass are left in the result file.
    ///
    /// # Arguments
    /// * `input_path` - Synthesized input file
    ///
    pub async fn run_dual_mode(&self, input_path: &Path) -> Result<PathBuf, ProcessError> {
        let output_path = self.output_path();
        let buckets = self
            .split_by_collision_mode(input_path)
            .map_err(|err| ProcessError::SegmentationError(input_path.to_path_buf(), err))?;
        let view = StepProgressView::new(MSGF_TOOL_NAME);

        let result = if buckets.other_rows == 0 || buckets.etd_rows == 0 {
            let mode = if buckets.etd_rows > 0 {
                FRAGMENTATION_MODE_ETD
            } else {
                FRAGMENTATION_MODE_AS_WRITTEN
            };
            info!(
                "{} Single fragmentation mode {}, no dual-mode run necessary",
                self.context.log_prefix(),
                mode
            );
            let data_rows = buckets.other_rows + buckets.etd_rows;
            let mut tracker = ProgressTracker::new(data_rows, self.progress_interval, view.clone());
            self.run_bucket(input_path, data_rows + 1, &output_path, mode, &mut tracker)
                .instrument(view.span().clone())
                .await
        } else {
            let mut tracker = ProgressTracker::new(0, self.progress_interval, view.clone());
            self.run_dual_passes(&buckets, &output_path, &mut tracker)
                .instrument(view.span().clone())
                .await
        };

        if !self.keep_input_files {
            remove_files([&buckets.other_path, &buckets.etd_path]);
        }
        result?;
        Ok(output_path)
    }

    /// Runs the non-ETD bucket, then the ETD bucket, appending each result to the output file
    ///
    async fn run_dual_passes(
        &self,
        buckets: &CollisionModeBuckets,
        output_path: &Path,
        tracker: &mut ProgressTracker,
    ) -> Result<(), ProcessError> {
        Self::remove_if_exists(output_path)?;
        let passes = [
            (
                DualModePass::First,
                &buckets.other_path,
                buckets.other_rows,
                FRAGMENTATION_MODE_AS_WRITTEN,
            ),
            (
                DualModePass::Second,
                &buckets.etd_path,
                buckets.etd_rows,
                FRAGMENTATION_MODE_ETD,
            ),
        ];
        for (pass, bucket_input, rows, mode) in passes {
            tracker.start_dual_mode_pass(pass, rows);
            let bucket_output = Self::with_stem_suffix(bucket_input, "_MSGF");
            self.run_bucket(bucket_input, rows + 1, &bucket_output, mode, tracker)
                .await?;
            combine(
                std::slice::from_ref(&bucket_output),
                output_path,
                pass == DualModePass::First,
            )
            .map_err(|err| ProcessError::CombineError(output_path.to_path_buf(), err))?;
            remove_files([&bucket_output]);
        }
        Ok(())
    }

    /// Runs one input file into `output_path`, segmented if it is too large
    ///
    async fn run_bucket(
        &self,
        input_path: &Path,
        line_count: usize,
        output_path: &Path,
        fragmentation_mode: u8,
        tracker: &mut ProgressTracker,
    ) -> Result<(), ProcessError> {
        let data_rows = line_count.saturating_sub(1);
        let segment_sizes = plan_segments(data_rows, self.entries_per_segment);

        if segment_sizes.len() == 1 {
            debug!(
                "{} Running MSGF on `{}` without segmentation",
                self.context.log_prefix(),
                input_path.display()
            );
            Self::remove_if_exists(output_path)?;
            tracker.start_segment(output_path);
            self.runner
                .run_segment(input_path, output_path, fragmentation_mode, 1, tracker)
                .await?;
            tracker.finish_segment(data_rows);
            return Ok(());
        }

        info!(
            "{} Splitting {} rows into {} segments",
            self.context.log_prefix(),
            data_rows,
            segment_sizes.len()
        );
        let descriptors = split(input_path, &segment_sizes)
            .map_err(|err| ProcessError::SegmentationError(input_path.to_path_buf(), err))?;
        let mut segment_outputs = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors.iter() {
            let segment_output =
                Self::with_stem_suffix(output_path, &format!("_Part{}", descriptor.index));
            Self::remove_if_exists(&segment_output)?;
            tracker.start_segment(&segment_output);
            // abort on failure, partial segment results are not combined
            self.runner
                .run_segment(
                    &descriptor.path,
                    &segment_output,
                    fragmentation_mode,
                    descriptor.index,
                    tracker,
                )
                .await?;
            tracker.finish_segment(descriptor.entry_count);
            segment_outputs.push(segment_output);
        }

        Self::remove_if_exists(output_path)?;
        let combined_rows = combine(&segment_outputs, output_path, true)
            .map_err(|err| ProcessError::CombineError(output_path.to_path_buf(), err))?;
        debug!(
            "{} Combined {} result rows into `{}`",
            self.context.log_prefix(),
            combined_rows,
            output_path.display()
        );

        remove_files(&segment_outputs);
        if !self.keep_input_files {
            remove_files(descriptors.iter().map(|descriptor| &descriptor.path));
        }
        Ok(())
    }

    /// Writes the non-ETD and ETD rows into separate files, each with the header
    ///
    fn split_by_collision_mode(&self, input_path: &Path) -> anyhow::Result<CollisionModeBuckets> {
        let other_path = Self::with_stem_suffix(input_path, "_NonETD");
        let etd_path = Self::with_stem_suffix(input_path, "_ETD");

        let mut reader = BufReader::new(
            File::open(input_path)
                .with_context(|| format!("Error when opening `{}`", input_path.display()))?,
        );
        let mut header = String::new();
        reader.read_line(&mut header)?;
        let mode_idx = column_index(&header, COLLISION_MODE_COLUMN)
            .with_context(|| format!("Column `{}` not found", COLLISION_MODE_COLUMN))?;
        if !header.ends_with('\n') {
            header.push('\n');
        }

        let mut other_writer = BufWriter::new(File::create(&other_path)?);
        let mut etd_writer = BufWriter::new(File::create(&etd_path)?);
        other_writer.write_all(header.as_bytes())?;
        etd_writer.write_all(header.as_bytes())?;

        let mut other_rows = 0;
        let mut etd_rows = 0;
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let is_etd = line
                .split('\t')
                .nth(mode_idx)
                .map(|mode| mode.trim().eq_ignore_ascii_case("ETD"))
                .unwrap_or(false);
            if is_etd {
                writeln!(etd_writer, "{}", line)?;
                etd_rows += 1;
            } else {
                writeln!(other_writer, "{}", line)?;
                other_rows += 1;
            }
        }
        other_writer.flush()?;
        etd_writer.flush()?;
        info!(
            "{} {} non-ETD and {} ETD rows",
            self.context.log_prefix(),
            other_rows,
            etd_rows
        );
        Ok(CollisionModeBuckets {
            other_path,
            other_rows,
            etd_path,
            etd_rows,
        })
    }

    fn with_stem_suffix(path: &Path, suffix: &str) -> PathBuf {
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|extension| format!(".{}", extension.to_string_lossy()))
            .unwrap_or_default();
        path.with_file_name(format!("{}{}{}", stem, suffix, extension))
    }

    fn remove_if_exists(path: &Path) -> Result<(), ProcessError> {
        if path.exists() {
            remove_file(path).map_err(|err| {
                ProcessError::CombineError(path.to_path_buf(), anyhow::Error::new(err))
            })?;
        }
        Ok(())
    }
}

/// Input files of a dual-mode run
///
struct CollisionModeBuckets {
    other_path: PathBuf,
    other_rows: usize,
    etd_path: PathBuf,
    etd_rows: usize,
}
