//! Live progress reporting
//!
//! Display-only: sinks hold no timing-sensitive state and have no effect
//! on persisted data, so non-interactive contexts can plug [`NullProgress`].

use crate::config::BenchmarkConfig;
use crate::record::RoundRow;
use crate::session::SessionState;
use crate::stats::RoundSummary;
use indicatif::{ProgressBar, ProgressStyle};

/// Receives progress events from the engine
pub trait ProgressSink: Send + Sync {
    /// A session entered a new lifecycle phase
    fn session_phase(&self, _kernel: &str, _phase: SessionState) {}

    /// A measured run finished (`completed` out of `total` for this session)
    fn run_complete(&self, _kernel: &str, _completed: usize, _total: usize) {}

    /// A row was completed and handed to the writer
    fn row_complete(&self, _row: &RoundRow, _summary: &RoundSummary) {}
}

/// Sink that discards all events
#[derive(Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {}

/// Terminal progress bar over all measured runs of the benchmark
pub struct ConsoleProgress {
    bar: ProgressBar,
    runs_per_row: usize,
    rows_done: std::sync::atomic::AtomicUsize,
}

impl ConsoleProgress {
    /// Bar sized to every measured run the config will produce
    pub fn new(config: &BenchmarkConfig) -> Self {
        let total = (config.rounds * config.kernels.len() * config.runs) as u64;
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .expect("static template is valid")
                .progress_chars("#>-"),
        );
        Self {
            bar,
            runs_per_row: config.runs,
            rows_done: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Finish the bar with a closing message
    pub fn finish(&self) {
        self.bar.finish_with_message("benchmark complete");
    }
}

impl ProgressSink for ConsoleProgress {
    fn session_phase(&self, kernel: &str, phase: SessionState) {
        self.bar.set_message(format!("{kernel}: {phase}"));
    }

    fn run_complete(&self, kernel: &str, completed: usize, total: usize) {
        self.bar.inc(1);
        let percent = completed * 100 / total.max(1);
        self.bar.set_message(format!("{kernel}: {percent}%"));
    }

    fn row_complete(&self, row: &RoundRow, summary: &RoundSummary) {
        // Sessions that fail before measuring emit no run events; snap the
        // bar to the row boundary either way.
        let rows = 1 + self
            .rows_done
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.bar.set_position((rows * self.runs_per_row) as u64);
        self.bar.println(format!(
            "{} round {}: {}",
            row.kernel,
            row.round,
            summary.render()
        ));
    }
}
