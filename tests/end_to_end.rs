//! End-to-end benchmark runs over scripted collaborators

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use syscall_bench::traits::{ChannelError, CommandChannel, LaunchError, VmHandle, VmLauncher};
use syscall_bench::{BenchmarkConfig, OrchestratorBuilder, RoundRow, RoundSummary};

// ============================================================================
// Scripted collaborators
// ============================================================================

/// Launcher whose VMs replay a fixed output sequence per kernel
struct ReplayLauncher {
    outputs: HashMap<String, Vec<&'static str>>,
}

impl ReplayLauncher {
    fn new(outputs: &[(&str, &[&'static str])]) -> Self {
        Self {
            outputs: outputs
                .iter()
                .map(|(kernel, lines)| (kernel.to_string(), lines.to_vec()))
                .collect(),
        }
    }
}

#[async_trait]
impl VmLauncher for ReplayLauncher {
    async fn launch(
        &self,
        _image: &Path,
        kernel: &Path,
        _cpus: Option<&syscall_bench::CpuAssignment>,
    ) -> Result<Box<dyn VmHandle>, LaunchError> {
        let name = kernel.display().to_string();
        let outputs = self
            .outputs
            .get(&name)
            .ok_or_else(|| LaunchError::Rejected(format!("unknown kernel {name}")))?;
        Ok(Box::new(ReplayVm {
            outputs: outputs.clone(),
        }))
    }
}

struct ReplayVm {
    outputs: Vec<&'static str>,
}

#[async_trait]
impl VmHandle for ReplayVm {
    async fn is_reachable(&mut self) -> bool {
        true
    }

    async fn open_channel(&mut self) -> Result<Box<dyn CommandChannel>, ChannelError> {
        Ok(Box::new(ReplayChannel {
            outputs: std::mem::take(&mut self.outputs).into(),
        }))
    }

    async fn shutdown(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

struct ReplayChannel {
    outputs: std::collections::VecDeque<&'static str>,
}

#[async_trait]
impl CommandChannel for ReplayChannel {
    async fn exec(&mut self, _command: &str) -> Result<String, ChannelError> {
        match self.outputs.pop_front() {
            Some(line) => Ok(format!("{line}\n")),
            None => Err(ChannelError::Closed("no more scripted output".into())),
        }
    }

    async fn send_file(&mut self, _local: &Path, _remote: &str) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn remove_file(&mut self, _remote: &str) -> Result<(), ChannelError> {
        Ok(())
    }
}

fn config(kernels: &[&str], out: PathBuf) -> BenchmarkConfig {
    BenchmarkConfig::new(
        "disk.img",
        kernels.iter().map(PathBuf::from).collect(),
        "workload",
        "id_rsa",
        out,
    )
    .with_warmups(0)
    .with_boot_poll(std::time::Duration::from_millis(1), 3)
}

async fn run(config: BenchmarkConfig, launcher: ReplayLauncher) {
    OrchestratorBuilder::new()
        .config(config)
        .launcher(Arc::new(launcher))
        .build()
        .unwrap()
        .run()
        .await
        .unwrap();
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_two_kernels_one_round_three_runs() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("results.csv");

    let launcher = ReplayLauncher::new(&[
        ("A", &["100", "101", "102"][..]),
        ("B", &["200", "201", "202"][..]),
    ]);
    let cfg = config(&["A", "B"], out.clone()).with_runs(3).with_rounds(1);

    run(cfg, launcher).await;

    let contents = std::fs::read_to_string(&out).unwrap();
    assert_eq!(
        contents,
        "kernel path,round,run 0,run 1,run 2\n\
         A,0,100,101,102\n\
         B,0,200,201,202\n"
    );
}

#[tokio::test]
async fn test_warmups_are_discarded_from_the_row() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("results.csv");

    // Two warmup outputs precede the two measured ones.
    let launcher = ReplayLauncher::new(&[("A", &["9999", "9999", "10", "11"][..])]);
    let cfg = config(&["A"], out.clone())
        .with_runs(2)
        .with_rounds(1)
        .with_warmups(2);

    run(cfg, launcher).await;

    let contents = std::fs::read_to_string(&out).unwrap();
    assert_eq!(contents, "kernel path,round,run 0,run 1\nA,0,10,11\n");
}

#[tokio::test]
async fn test_exhausted_workload_leaves_gaps_not_crashes() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("results.csv");

    // The workload dies after two runs; the remaining runs become gaps.
    let launcher = ReplayLauncher::new(&[("A", &["10", "11"][..])]);
    let cfg = config(&["A"], out.clone()).with_runs(4).with_rounds(1);

    run(cfg, launcher).await;

    let contents = std::fs::read_to_string(&out).unwrap();
    assert_eq!(contents, "kernel path,round,run 0,run 1,run 2,run 3\nA,0,10,11,,\n");
}

#[tokio::test]
async fn test_resuming_into_an_existing_output_appends() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("results.csv");

    // First invocation writes kernel A; a second invocation (as after a
    // crash before B) appends without a second header.
    let cfg_a = config(&["A"], out.clone()).with_runs(2);
    run(cfg_a, ReplayLauncher::new(&[("A", &["1", "2"][..])])).await;

    let after_first = std::fs::read_to_string(&out).unwrap();
    assert_eq!(after_first, "kernel path,round,run 0,run 1\nA,0,1,2\n");

    let cfg_b = config(&["B"], out.clone()).with_runs(2);
    run(cfg_b, ReplayLauncher::new(&[("B", &["3", "4"][..])])).await;

    let after_second = std::fs::read_to_string(&out).unwrap();
    assert_eq!(
        after_second,
        "kernel path,round,run 0,run 1\nA,0,1,2\nB,0,3,4\n"
    );
}

#[tokio::test]
async fn test_summary_matches_row_population() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("results.csv");

    let launcher = ReplayLauncher::new(&[("A", &["100", "101", "102"][..])]);
    let cfg = config(&["A"], out).with_runs(3);

    run(cfg, launcher).await;

    // Recompute the summary the display would have shown.
    let row = RoundRow::new(
        "A",
        0,
        vec![
            syscall_bench::RunResult::Measured(100),
            syscall_bench::RunResult::Measured(101),
            syscall_bench::RunResult::Measured(102),
        ],
    );
    let summary = RoundSummary::from_row(&row);
    assert_eq!(summary.mean, Some(101.0));
    let std_dev = summary.std_dev.unwrap();
    assert!((std_dev - (2.0f64 / 3.0).sqrt()).abs() < 1e-9);
}
