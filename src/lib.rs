//! syscall-bench: compares the per-syscall overhead of kernel builds
//!
//! Each kernel is booted in an isolated QEMU VM, a measurement workload
//! is invoked repeatedly over SSH with warmup and measurement phases, and
//! the reported timings are appended to a CSV as comparable rows.
//!
//! # Architecture
//!
//! - **Remote executor**: one bounded remote invocation, one parsed integer
//! - **Session**: the per-(kernel, round) VM lifecycle state machine
//! - **Orchestrator**: rounds outer, kernels inner, one live VM at a time
//! - **Stats**: mean / population standard deviation for the live display
//! - **Output**: append-and-flush CSV persistence, crash-safe per row
//! - **Qemu**: production launcher and ssh transport behind the trait seams

pub mod cli;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod qemu;
pub mod record;
pub mod remote;
pub mod session;
pub mod stats;
pub mod traits;

// Re-export commonly used types
pub use config::{BenchmarkConfig, ConfigError, CpuAssignment};
pub use error::{BenchError, BenchResult};
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use record::{RoundRow, RunFailure, RunResult};
pub use session::{SessionState, VmSession};
pub use stats::RoundSummary;
