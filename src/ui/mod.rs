/// Progress bar of a running step
pub mod step_progress;
