//! Terminal spinner reporting processor stages

use crate::{
    services::{ProcessingStage, ProgressReporter, ProgressUpdate},
    types::ProcessingTimings,
};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Progress reporter drawing an indicatif spinner on stderr
pub struct SpinnerProgressReporter {
    spinner: ProgressBar,
    verbose: bool,
}

impl SpinnerProgressReporter {
    /// Create a spinner; `visible = false` draws nothing (e.g. non-TTY stderr)
    #[must_use]
    pub fn new(visible: bool, verbose: bool) -> Self {
        let target = if visible {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        };
        let spinner = ProgressBar::with_draw_target(None, target);
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}") {
            spinner.set_style(style);
        }
        Self { spinner, verbose }
    }
}

impl ProgressReporter for SpinnerProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        match update.stage {
            ProcessingStage::Completed => self.spinner.finish_and_clear(),
            _ => {
                self.spinner.enable_steady_tick(Duration::from_millis(100));
                self.spinner
                    .set_message(format!("[{}%] {}", update.progress, update.description));
            },
        }
        log::debug!("[{}%] {} ({}ms elapsed)", update.progress, update.description, update.elapsed_ms);
    }

    fn report_completion(&self, timings: &ProcessingTimings) {
        if self.verbose {
            log::info!(
                "Segmentation {}ms, compositing {}ms",
                timings.segmentation_ms,
                timings.compositing_ms
            );
        }
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        self.spinner.abandon_with_message(format!("failed: {}", stage.description()));
        log::error!("❌ Error during {}: {}", stage.description(), error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use instant::Instant;

    #[test]
    fn test_hidden_spinner_runs_through_stages() {
        let reporter = SpinnerProgressReporter::new(false, true);
        reporter.report_progress(ProgressUpdate::new(ProcessingStage::Segmentation, Instant::now()));
        reporter.report_progress(ProgressUpdate::new(ProcessingStage::Compositing, Instant::now()));
        reporter.report_progress(ProgressUpdate::new(ProcessingStage::Completed, Instant::now()));
        reporter.report_completion(&ProcessingTimings::default());
        assert!(reporter.spinner.is_finished());
    }
}
