//! Benchmark orchestration
//!
//! The Orchestrator drives the complete benchmark: for every round, the
//! round controller evaluates every kernel once on a fresh VM and hands
//! each completed row to the result writer and the progress display.
//! Exactly one VM session is alive at any moment; concurrent sessions
//! would contend for the pinned cores, so the serialization is structural
//! rather than lock-based.
//!
//! # Example
//!
//! ```ignore
//! let orchestrator = OrchestratorBuilder::new()
//!     .config(config)
//!     .launcher(Arc::new(QemuLauncher::new(5555, key)))
//!     .build()?;
//!
//! orchestrator.run().await?;
//! ```

mod round;

pub use round::RoundController;

use crate::config::BenchmarkConfig;
use crate::error::{BenchError, BenchResult};
use crate::output::CsvResultWriter;
use crate::progress::{NullProgress, ProgressSink};
use crate::traits::VmLauncher;
use std::sync::Arc;


/// Top-level benchmark loop: rounds outer, kernels inner
pub struct Orchestrator {
    config: BenchmarkConfig,
    launcher: Arc<dyn VmLauncher>,
    progress: Arc<dyn ProgressSink>,
}

impl Orchestrator {
    /// The validated configuration this orchestrator runs
    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Run the whole benchmark, appending rows as they complete
    ///
    /// Rows reach the writer in strict (round, kernel-order) sequence;
    /// one round's kernels are fully written before the next round
    /// begins, so transient host conditions spread across all kernels
    /// instead of concentrating on one. Only an output-write failure
    /// aborts the loop; per-kernel failures degrade their own row.
    pub async fn run(&self) -> BenchResult<()> {
        let mut writer = CsvResultWriter::open(&self.config.out, self.config.runs)?;

        tracing::info!(
            kernels = self.config.kernels.len(),
            rounds = self.config.rounds,
            runs = self.config.runs,
            warmups = self.config.warmups,
            out = %self.config.out.display(),
            "starting benchmark"
        );

        for round in 0..self.config.rounds {
            tracing::info!(round, "starting round");
            let controller = RoundController::new(
                &self.config,
                self.launcher.as_ref(),
                self.progress.as_ref(),
                round,
            );
            controller.run(&mut writer).await?;
        }

        tracing::info!("benchmark complete");
        Ok(())
    }
}

/// Builder for [`Orchestrator`]
pub struct OrchestratorBuilder {
    config: Option<BenchmarkConfig>,
    launcher: Option<Arc<dyn VmLauncher>>,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl OrchestratorBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self {
            config: None,
            launcher: None,
            progress: None,
        }
    }

    /// Set the benchmark configuration
    pub fn config(mut self, config: BenchmarkConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the VM launcher collaborator
    pub fn launcher(mut self, launcher: Arc<dyn VmLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// Set the progress sink; defaults to the discarding sink
    pub fn progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Validate the configuration and build the orchestrator
    pub fn build(self) -> BenchResult<Orchestrator> {
        let config = self.config.ok_or(BenchError::Missing("config"))?;
        let launcher = self.launcher.ok_or(BenchError::Missing("launcher"))?;
        config.validate()?;

        Ok(Orchestrator {
            config,
            launcher,
            progress: self.progress.unwrap_or_else(|| Arc::new(NullProgress)),
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
