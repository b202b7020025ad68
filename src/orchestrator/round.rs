//! One round of the benchmark

use crate::config::BenchmarkConfig;
use crate::error::BenchResult;
use crate::output::CsvResultWriter;
use crate::progress::ProgressSink;
use crate::session::VmSession;
use crate::stats::RoundSummary;
use crate::traits::VmLauncher;

/// Evaluates every kernel once, in configured order, for a fixed round
///
/// Each kernel gets a fresh [`VmSession`]; the completed row goes to the
/// writer and the progress sink before the next kernel's VM is launched.
/// A session failure degrades only its own row: the controller always
/// proceeds to the remaining kernels, and the session guarantees its VM
/// was torn down before control returns here.
pub struct RoundController<'a> {
    config: &'a BenchmarkConfig,
    launcher: &'a dyn VmLauncher,
    progress: &'a dyn ProgressSink,
    round: usize,
}

impl<'a> RoundController<'a> {
    /// Controller for one round index
    pub fn new(
        config: &'a BenchmarkConfig,
        launcher: &'a dyn VmLauncher,
        progress: &'a dyn ProgressSink,
        round: usize,
    ) -> Self {
        Self {
            config,
            launcher,
            progress,
            round,
        }
    }

    /// Drive all kernels of this round, appending each row as it completes
    pub async fn run(&self, writer: &mut CsvResultWriter) -> BenchResult<()> {
        for kernel in &self.config.kernels {
            let session = VmSession::new(self.config, self.launcher, kernel, self.round);
            let row = session.run(self.progress).await;

            let summary = RoundSummary::from_row(&row);
            tracing::info!(
                kernel = %row.kernel,
                round = self.round,
                successes = summary.successes,
                failures = summary.failures,
                summary = %summary.render(),
                "row complete"
            );
            self.progress.row_complete(&row, &summary);

            // Persist before the next kernel boots; a write failure is
            // fatal to the whole benchmark.
            writer.append(&row)?;
        }
        Ok(())
    }
}
