//! Per-run and per-row result records

use thiserror::Error;

/// Why a single run produced no measurement
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunFailure {
    /// The remote invocation exceeded the per-run timeout
    #[error("run timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The transport failed while the command was in flight
    #[error("transport error: {0}")]
    Connection(String),

    /// The workload printed nothing
    #[error("workload printed no output")]
    EmptyOutput,

    /// The workload's first output line was not a base-10 integer
    #[error("workload output is not an integer: {0:?}")]
    Malformed(String),

    /// The session failed before this run could execute
    #[error("session failed: {0}")]
    Session(String),
}

/// Outcome of a single measured workload invocation, immutable once produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunResult {
    /// The duration the workload reported
    Measured(i64),
    /// No measurement; the reason is kept for logs and progress display
    Failed(RunFailure),
}

impl RunResult {
    /// The measured value, if any
    pub fn value(&self) -> Option<i64> {
        match self {
            RunResult::Measured(v) => Some(*v),
            RunResult::Failed(_) => None,
        }
    }

    /// True when the run produced a measurement
    pub fn is_measured(&self) -> bool {
        matches!(self, RunResult::Measured(_))
    }
}

/// One kernel's results for one round: exactly `runs` ordered entries
///
/// The row always reaches its configured length even when some or all
/// entries are failure markers, so the round/kernel matrix stays
/// rectangular.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundRow {
    /// Kernel identifier (its path, doubling as display name)
    pub kernel: String,
    /// 0-based round index
    pub round: usize,
    /// Run results in run-index order
    pub runs: Vec<RunResult>,
}

impl RoundRow {
    /// Row for a session that produced measurements
    pub fn new(kernel: impl Into<String>, round: usize, runs: Vec<RunResult>) -> Self {
        Self {
            kernel: kernel.into(),
            round,
            runs,
        }
    }

    /// Full-length row of failure markers for a session that never measured
    pub fn from_failure(
        kernel: impl Into<String>,
        round: usize,
        runs: usize,
        failure: RunFailure,
    ) -> Self {
        Self {
            kernel: kernel.into(),
            round,
            runs: vec![RunResult::Failed(failure); runs],
        }
    }

    /// Measured values, in run order
    pub fn successes(&self) -> impl Iterator<Item = i64> + '_ {
        self.runs.iter().filter_map(RunResult::value)
    }
}
