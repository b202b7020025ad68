//! CLI argument parsing and benchmark invocation
//!
//! The CLI owns everything the engine assumes already happened: path
//! validation, tilde expansion, count checks. The engine itself only ever
//! sees a validated [`BenchmarkConfig`].

use crate::config::{BenchmarkConfig, CpuAssignment};
use crate::orchestrator::OrchestratorBuilder;
use crate::progress::ConsoleProgress;
use crate::qemu::QemuLauncher;
use anyhow::{ensure, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Compares the per-syscall overhead of several kernel builds on the
/// same workload
#[derive(Parser, Debug)]
#[command(name = "syscall-bench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Disk image to boot the kernels from
    #[arg(short, long)]
    pub image: PathBuf,

    /// Kernel images to evaluate, in evaluation order
    #[arg(short, long, num_args = 1.., required = true)]
    pub kernels: Vec<PathBuf>,

    /// Workload binary; takes no arguments and prints one integer (the
    /// time measurement) to stdout per invocation
    #[arg(short, long)]
    pub workload: PathBuf,

    /// SSH key authorized inside the image
    #[arg(long, default_value = "~/.ssh/id_rsa")]
    pub key: PathBuf,

    /// Output CSV path; appended to when it already exists
    #[arg(short, long, default_value = "syscall-bench.csv")]
    pub out: PathBuf,

    /// Measured runs per kernel per round
    #[arg(long, default_value_t = 10)]
    pub runs: usize,

    /// Rounds; every kernel is evaluated once per round on a fresh VM
    #[arg(long, default_value_t = 1)]
    pub rounds: usize,

    /// Unmeasured warmup invocations before measuring
    #[arg(long, default_value_t = 5)]
    pub warmups: usize,

    /// Pin the VM to host cores: qemu-thread,vcpu0,vcpu1
    #[arg(long, value_name = "A,B,C")]
    pub pin_cpus: Option<CpuAssignment>,

    /// Host port forwarded to the VM's SSH port
    #[arg(long, default_value_t = 5555)]
    pub ssh_port: u16,

    /// Upper bound on a single workload invocation, in seconds
    #[arg(long, default_value_t = 60)]
    pub run_timeout_secs: u64,

    /// Seconds to keep polling for the VM to come up before giving up
    #[arg(long, default_value_t = 60)]
    pub boot_timeout_secs: u32,

    /// Boot attempts per kernel and round before recording an empty row
    #[arg(long, default_value_t = 1)]
    pub launch_attempts: u32,

    /// Retries for a failed measurement before recording it as missing
    #[arg(long, default_value_t = 0)]
    pub run_retries: u32,
}

impl Cli {
    /// Validate arguments into an engine configuration
    pub fn to_config(&self) -> Result<BenchmarkConfig> {
        let key = expand_tilde(&self.key);

        ensure!(
            self.image.is_file(),
            "disk image not found: {}",
            self.image.display()
        );
        ensure!(
            self.workload.is_file(),
            "workload binary not found: {}",
            self.workload.display()
        );
        ensure!(key.is_file(), "SSH key not found: {}", key.display());
        for kernel in &self.kernels {
            ensure!(
                kernel.is_file(),
                "kernel not found: {}",
                kernel.display()
            );
        }

        let mut config = BenchmarkConfig::new(
            &self.image,
            self.kernels.clone(),
            &self.workload,
            key,
            &self.out,
        )
        .with_runs(self.runs)
        .with_rounds(self.rounds)
        .with_warmups(self.warmups)
        .with_run_timeout(Duration::from_secs(self.run_timeout_secs))
        .with_boot_poll(Duration::from_secs(1), self.boot_timeout_secs.max(1))
        .with_launch_attempts(self.launch_attempts)
        .with_run_retries(self.run_retries);
        config.ssh_port = self.ssh_port;
        if let Some(cpus) = self.pin_cpus {
            config = config.with_cpus(cpus);
        }

        config.validate().context("invalid benchmark configuration")?;
        Ok(config)
    }

    /// Run the benchmark described by the arguments
    pub async fn run(&self) -> Result<()> {
        let config = self.to_config()?;

        tracing::info!(
            kernels = config.kernels.len(),
            runs = config.runs,
            rounds = config.rounds,
            warmups = config.warmups,
            "configuration validated"
        );

        let launcher = Arc::new(QemuLauncher::new(config.ssh_port, config.key.clone()));
        let progress = Arc::new(ConsoleProgress::new(&config));
        let out = config.out.clone();

        let orchestrator = OrchestratorBuilder::new()
            .config(config)
            .launcher(launcher)
            .progress(Arc::clone(&progress) as Arc<dyn crate::progress::ProgressSink>)
            .build()?;

        tokio::select! {
            result = orchestrator.run() => {
                result?;
                progress.finish();
                println!("results written to {}", out.display());
            }
            _ = tokio::signal::ctrl_c() => {
                // Rows are flushed as they complete, so whatever is on
                // disk is whole; the in-flight row is simply absent.
                tracing::warn!("interrupted; completed rows remain valid");
            }
        }

        Ok(())
    }
}

/// Expand a leading `~/` against $HOME, as the shell would have done for
/// a non-default argument
fn expand_tilde(path: &std::path::Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}
