// std imports
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

// 3rd party imports
use tracing::{debug, trace};

// internal imports
use super::supervisor::ProcessSample;
use crate::constants::MIN_PROGRESS_LINE_COUNT_INTERVAL;
use crate::functions::count_lines;
use crate::ui::step_progress::StepProgressView;

/// Pass of a dual-mode run
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DualModePass {
    /// Non-ETD spectra
    First,
    /// ETD spectra
    Second,
}

/// Estimates the progress of MSGF by counting the lines already written to the
/// output file of the running segment.
///
pub struct ProgressTracker {
    total_lines: usize,
    completed_lines: usize,
    current_output: Option<PathBuf>,
    min_interval: Duration,
    last_count: Option<Instant>,
    dual_mode_pass: Option<DualModePass>,
    fraction: f64,
    view: StepProgressView,
}

impl ProgressTracker {
    /// Creates a new tracker
    ///
    /// # Arguments
    /// * `total_lines` - Line count of the (bucket) input file
    /// * `interval` - Requested interval between two line counts, at least 20 seconds are enforced
    /// * `view` - Progress bar
    ///
    pub fn new(total_lines: usize, interval: Duration, view: StepProgressView) -> Self {
        Self {
            total_lines,
            completed_lines: 0,
            current_output: None,
            min_interval: interval.max(Duration::from_secs(MIN_PROGRESS_LINE_COUNT_INTERVAL)),
            last_count: None,
            dual_mode_pass: None,
            fraction: 0.0,
            view,
        }
    }

    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    /// Switches to a dual-mode pass. The line counts restart for the pass' bucket.
    ///
    /// # Arguments
    /// * `pass` - Pass
    /// * `total_lines` - Line count of the pass' input file
    ///
    pub fn start_dual_mode_pass(&mut self, pass: DualModePass, total_lines: usize) {
        self.dual_mode_pass = Some(pass);
        self.total_lines = total_lines;
        self.completed_lines = 0;
        self.current_output = None;
        self.set_lines_written(0);
    }

    /// Registers the output file of the segment which is about to run
    ///
    pub fn start_segment(&mut self, output_path: &Path) {
        self.current_output = Some(output_path.to_path_buf());
        self.last_count = None;
    }

    /// Adds the lines of a finished segment to the completed lines
    ///
    pub fn finish_segment(&mut self, line_count: usize) {
        self.completed_lines += line_count;
        self.current_output = None;
        self.set_lines_written(0);
    }

    /// Polling callback, counts the lines of the current output file once the interval elapsed
    ///
    pub fn on_sample(&mut self, sample: &ProcessSample) {
        trace!(
            "pid {:?}: {:.1}% CPU, {:.1} MB after {:.0}s",
            sample.pid,
            sample.cpu_usage,
            sample.memory_mb,
            sample.elapsed.as_secs_f64()
        );
        let due = self
            .last_count
            .map(|last_count| last_count.elapsed() >= self.min_interval)
            .unwrap_or(true);
        if due {
            self.last_count = Some(Instant::now());
            self.update_from_output();
        }
    }

    /// Counts the lines of the current output file and updates the progress
    ///
    pub fn update_from_output(&mut self) {
        let lines_written = match self.current_output.as_ref() {
            // the tool may not have created the file yet
            Some(path) if path.is_file() => count_lines(path).unwrap_or(0),
            _ => 0,
        };
        self.set_lines_written(lines_written);
        debug!("MSGF progress: {:.1}%", self.fraction * 100.0);
    }

    fn set_lines_written(&mut self, lines_written: usize) {
        let fraction = if self.total_lines == 0 {
            0.0
        } else {
            ((lines_written + self.completed_lines) as f64 / self.total_lines as f64).min(1.0)
        };
        self.fraction = match self.dual_mode_pass {
            None => fraction,
            Some(DualModePass::First) => fraction / 2.0,
            Some(DualModePass::Second) => fraction / 2.0 + 0.5,
        };
        self.view.set_fraction(self.fraction);
    }
}
