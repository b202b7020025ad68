//! VM session lifecycle
//!
//! One [`VmSession`] owns one virtual machine for one (kernel, round)
//! pair: boot, wait for reachability, warm up, measure, shut down. Every
//! pair gets a fresh boot so no state leaks between measurements. Whatever
//! happens after a successful launch, the session passes through its
//! shutdown step exactly once before yielding its row, and a failed
//! session still yields a full-length row of failure markers so the
//! round/kernel matrix stays rectangular.

use crate::config::BenchmarkConfig;
use crate::progress::ProgressSink;
use crate::record::{RoundRow, RunResult};
use crate::remote::RemoteExecutor;
use crate::traits::{ChannelError, CommandChannel, LaunchError, VmHandle, VmLauncher};
use std::path::Path;
use std::time::Duration;


/// Lifecycle phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not started, or finished successfully
    Stopped,
    /// Asking the launcher for a fresh VM
    Launching,
    /// Bounded poll until the VM's endpoint accepts connections
    AwaitingReachability,
    /// Unmeasured invocations to stabilize the measured binary
    Warmup,
    /// The strictly sequential measured runs
    Measuring,
    /// VM teardown; entered exactly once after any successful launch
    ShuttingDown,
    /// Terminal failure for this kernel/round pair
    Failed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Stopped => "stopped",
            SessionState::Launching => "launching",
            SessionState::AwaitingReachability => "connecting",
            SessionState::Warmup => "warming up",
            SessionState::Measuring => "measuring",
            SessionState::ShuttingDown => "shutting down",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Session-fatal errors; they degrade one row, never the whole run
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The VM could not be started
    #[error("launch failed: {0}")]
    Launch(#[from] LaunchError),

    /// The VM never became reachable within the poll bound
    #[error("VM not reachable after {attempts} probes over {waited:?}")]
    BootTimeout {
        /// Probes issued
        attempts: u32,
        /// Total time spent polling
        waited: Duration,
    },

    /// The command channel could not be established or provisioned
    #[error("connection failed: {0}")]
    Connection(#[from] ChannelError),
}

/// Drives one VM through warmup and measurement for one kernel and round
pub struct VmSession<'a> {
    config: &'a BenchmarkConfig,
    launcher: &'a dyn VmLauncher,
    kernel: &'a Path,
    kernel_name: String,
    round: usize,
    executor: RemoteExecutor,
    state: SessionState,
}

impl<'a> VmSession<'a> {
    /// Session for one (kernel, round) pair
    pub fn new(
        config: &'a BenchmarkConfig,
        launcher: &'a dyn VmLauncher,
        kernel: &'a Path,
        round: usize,
    ) -> Self {
        Self {
            config,
            launcher,
            kernel,
            kernel_name: kernel.display().to_string(),
            round,
            executor: RemoteExecutor::new(config.run_timeout),
            state: SessionState::Stopped,
        }
    }

    /// Current lifecycle phase
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the full lifecycle and produce this kernel's row for the round
    ///
    /// Never fails: session-level errors become a row of failure markers.
    pub async fn run(mut self, progress: &dyn ProgressSink) -> RoundRow {
        match self.evaluate(progress).await {
            Ok(runs) => RoundRow::new(self.kernel_name, self.round, runs),
            Err(err) => {
                tracing::warn!(
                    kernel = %self.kernel_name,
                    round = self.round,
                    error = %err,
                    "session failed; recording empty row"
                );
                RoundRow::from_failure(
                    self.kernel_name,
                    self.round,
                    self.config.runs,
                    crate::record::RunFailure::Session(err.to_string()),
                )
            }
        }
    }

    async fn evaluate(
        &mut self,
        progress: &dyn ProgressSink,
    ) -> Result<Vec<RunResult>, SessionError> {
        self.enter(SessionState::Launching, progress);
        let mut vm = self.launch().await?;

        let outcome = self.drive(vm.as_mut(), progress).await;

        // The single teardown point for every path out of a successful
        // launch. A failed shutdown is logged, not propagated: an orphan
        // must not block the remaining kernels.
        self.enter(SessionState::ShuttingDown, progress);
        if let Err(err) = vm.shutdown().await {
            tracing::warn!(
                kernel = %self.kernel_name,
                round = self.round,
                error = %err,
                "VM shutdown failed; continuing"
            );
        }

        match outcome {
            Ok(runs) => {
                self.enter(SessionState::Stopped, progress);
                Ok(runs)
            }
            Err(err) => {
                self.enter(SessionState::Failed, progress);
                Err(err)
            }
        }
    }

    /// Boot the VM, re-attempting up to the configured launch attempt count
    async fn launch(&mut self) -> Result<Box<dyn VmHandle>, SessionError> {
        let mut last = None;
        for attempt in 1..=self.config.launch_attempts {
            match self
                .launcher
                .launch(&self.config.image, self.kernel, self.config.cpus.as_ref())
                .await
            {
                Ok(vm) => return Ok(vm),
                Err(err) => {
                    tracing::warn!(
                        kernel = %self.kernel_name,
                        round = self.round,
                        attempt,
                        error = %err,
                        "VM launch failed"
                    );
                    last = Some(err);
                }
            }
        }
        // launch_attempts >= 1 is a config invariant, so last is set.
        Err(SessionError::Launch(last.unwrap_or_else(|| {
            LaunchError::Rejected("no launch attempts configured".into())
        })))
    }

    /// Everything between a successful launch and teardown
    async fn drive(
        &mut self,
        vm: &mut dyn VmHandle,
        progress: &dyn ProgressSink,
    ) -> Result<Vec<RunResult>, SessionError> {
        self.enter(SessionState::AwaitingReachability, progress);
        self.await_reachability(vm).await?;

        let mut channel = vm.open_channel().await?;
        channel
            .send_file(&self.config.workload, &self.config.remote_workload_path)
            .await?;

        self.enter(SessionState::Warmup, progress);
        self.warm_up(channel.as_mut()).await;

        self.enter(SessionState::Measuring, progress);
        let runs = self.measure(channel.as_mut(), progress).await;

        if let Err(err) = channel.remove_file(&self.config.remote_workload_path).await {
            tracing::debug!(
                kernel = %self.kernel_name,
                error = %err,
                "failed to remove remote workload"
            );
        }

        Ok(runs)
    }

    /// Bounded poll until the VM answers, one probe per interval
    async fn await_reachability(&self, vm: &mut dyn VmHandle) -> Result<(), SessionError> {
        for attempt in 1..=self.config.boot_poll_attempts {
            tokio::time::sleep(self.config.boot_poll_interval).await;
            if vm.is_reachable().await {
                tracing::debug!(
                    kernel = %self.kernel_name,
                    attempt,
                    "VM reachable"
                );
                return Ok(());
            }
        }
        Err(SessionError::BootTimeout {
            attempts: self.config.boot_poll_attempts,
            waited: self.config.boot_poll_interval * self.config.boot_poll_attempts,
        })
    }

    /// Warmups stabilize caches in the measured binary; their results are
    /// discarded and their failures never abort the session.
    async fn warm_up(&self, channel: &mut dyn CommandChannel) {
        for warmup in 0..self.config.warmups {
            let result = self
                .executor
                .measure(channel, &self.config.remote_workload_path)
                .await;
            if let RunResult::Failed(failure) = result {
                tracing::warn!(
                    kernel = %self.kernel_name,
                    round = self.round,
                    warmup,
                    failure = %failure,
                    "warmup run failed"
                );
            }
        }
    }

    /// Exactly `runs` strictly sequential measured invocations
    ///
    /// Each run is independent: a failure is recorded under its run index
    /// and the remaining runs proceed, so the row always reaches full
    /// length. Runs are never pipelined; the call's duration is the
    /// measured quantity and must not queue behind a predecessor.
    async fn measure(
        &self,
        channel: &mut dyn CommandChannel,
        progress: &dyn ProgressSink,
    ) -> Vec<RunResult> {
        let mut runs = Vec::with_capacity(self.config.runs);
        for run in 0..self.config.runs {
            let result = self.measure_one(channel).await;
            if let RunResult::Failed(failure) = &result {
                tracing::warn!(
                    kernel = %self.kernel_name,
                    round = self.round,
                    run,
                    failure = %failure,
                    "measured run failed"
                );
            }
            runs.push(result);
            progress.run_complete(&self.kernel_name, run + 1, self.config.runs);
        }
        runs
    }

    /// One measured run, retried per the configured policy
    async fn measure_one(&self, channel: &mut dyn CommandChannel) -> RunResult {
        let mut result = self
            .executor
            .measure(channel, &self.config.remote_workload_path)
            .await;
        for retry in 1..=self.config.run_retries {
            if result.is_measured() {
                break;
            }
            tracing::debug!(
                kernel = %self.kernel_name,
                round = self.round,
                retry,
                "retrying failed run"
            );
            result = self
                .executor
                .measure(channel, &self.config.remote_workload_path)
                .await;
        }
        result
    }

    fn enter(&mut self, state: SessionState, progress: &dyn ProgressSink) {
        self.state = state;
        tracing::debug!(
            kernel = %self.kernel_name,
            round = self.round,
            state = %state,
            "session state"
        );
        progress.session_phase(&self.kernel_name, state);
    }
}
