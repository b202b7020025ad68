//! Remote workload execution
//!
//! Issues a single command over an open channel, reads the first line of
//! its standard output and parses it as the measured duration. Every call
//! is bounded by the configured timeout; failures come back as typed
//! [`RunResult`] markers and never cross this boundary as errors. Retry
//! policy lives in the caller, since a failed measurement is information,
//! not necessarily a transient fault.

use crate::record::{RunFailure, RunResult};
use crate::traits::CommandChannel;
use std::time::Duration;

/// Executes measured invocations with a per-call timeout
#[derive(Debug, Clone, Copy)]
pub struct RemoteExecutor {
    timeout: Duration,
}

impl RemoteExecutor {
    /// Create an executor with the given per-call bound
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run `command` once and parse its first output line as an integer
    pub async fn measure(&self, channel: &mut dyn CommandChannel, command: &str) -> RunResult {
        match tokio::time::timeout(self.timeout, channel.exec(command)).await {
            Err(_) => RunResult::Failed(RunFailure::Timeout(self.timeout)),
            Ok(Err(err)) => RunResult::Failed(RunFailure::Connection(err.to_string())),
            Ok(Ok(stdout)) => parse_measurement(&stdout),
        }
    }
}

/// Parse the first line of workload output as a base-10 integer
fn parse_measurement(stdout: &str) -> RunResult {
    let line = stdout.lines().next().unwrap_or("").trim();
    if line.is_empty() {
        return RunResult::Failed(RunFailure::EmptyOutput);
    }
    match line.parse::<i64>() {
        Ok(value) => RunResult::Measured(value),
        Err(_) => RunResult::Failed(RunFailure::Malformed(line.to_string())),
    }
}
