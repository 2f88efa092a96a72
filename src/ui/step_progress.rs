// 3rd party imports
use indicatif::ProgressStyle;
use tracing::{info_span, Span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

/// Resolution of the progress bar, progress is shown in per mille
///
const PROGRESS_BAR_LENGTH: u64 = 1000;

/// Progress bar style
///
const PROGRESS_BAR_STYLE: &str = "        {msg} {wide_bar} {percent}% {elapsed} ";

/// Progress bar of a running step, rendered by the indicatif layer if installed.
/// Futures must be instrumented with [StepProgressView::span] to display the bar.
///
#[derive(Debug, Clone)]
pub struct StepProgressView {
    span: Span,
}

impl StepProgressView {
    /// Creates a new progress bar
    ///
    /// # Arguments
    /// * `title` - Message shown in front of the bar
    ///
    pub fn new(title: &str) -> Self {
        let span = info_span!("step_progress");
        if let Ok(style) = ProgressStyle::with_template(PROGRESS_BAR_STYLE) {
            span.pb_set_style(&style);
        }
        span.pb_set_length(PROGRESS_BAR_LENGTH);
        span.pb_set_message(title);
        Self { span }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Sets the progress
    ///
    /// # Arguments
    /// * `fraction` - Progress between 0 and 1
    ///
    pub fn set_fraction(&self, fraction: f64) {
        let position = (fraction.clamp(0.0, 1.0) * PROGRESS_BAR_LENGTH as f64).round() as u64;
        self.span.pb_set_position(position);
    }

    pub fn set_message(&self, message: &str) {
        self.span.pb_set_message(message);
    }
}
