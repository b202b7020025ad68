//! Benchmark configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Configuration for one benchmark invocation
///
/// Constructed once (normally by the CLI wrapper), validated, and then
/// immutable for the lifetime of the process. The engine assumes a
/// validated config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Disk image every kernel is booted from
    pub image: PathBuf,

    /// Kernels to evaluate, in evaluation order. The path doubles as the
    /// kernel's display name and as its identifier in the output file.
    pub kernels: Vec<PathBuf>,

    /// Workload binary; prints one base-10 integer per invocation
    pub workload: PathBuf,

    /// SSH key authorized inside the image
    pub key: PathBuf,

    /// Optional host-core pinning for the VM process
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpus: Option<CpuAssignment>,

    /// Measured runs per kernel per round
    pub runs: usize,

    /// Rounds; every kernel is evaluated once per round, on a fresh VM
    pub rounds: usize,

    /// Unmeasured invocations issued before measuring starts
    pub warmups: usize,

    /// Output CSV path
    pub out: PathBuf,

    /// Host port forwarded to the VM's SSH port
    pub ssh_port: u16,

    /// Where the workload binary is placed inside the VM
    pub remote_workload_path: String,

    /// Delay between reachability probes while the VM boots
    pub boot_poll_interval: Duration,

    /// Number of reachability probes before the boot is declared dead
    pub boot_poll_attempts: u32,

    /// Upper bound on a single remote invocation
    pub run_timeout: Duration,

    /// Boot attempts per session before giving up on that kernel/round
    pub launch_attempts: u32,

    /// Retries for a failed measurement before it is recorded as missing
    pub run_retries: u32,
}

impl BenchmarkConfig {
    /// Create a config with the given paths and default counts and timing
    pub fn new(
        image: impl Into<PathBuf>,
        kernels: Vec<PathBuf>,
        workload: impl Into<PathBuf>,
        key: impl Into<PathBuf>,
        out: impl Into<PathBuf>,
    ) -> Self {
        Self {
            image: image.into(),
            kernels,
            workload: workload.into(),
            key: key.into(),
            cpus: None,
            runs: 10,
            rounds: 1,
            warmups: 5,
            out: out.into(),
            ssh_port: 5555,
            remote_workload_path: "~/syscall-workload".to_string(),
            boot_poll_interval: Duration::from_secs(1),
            boot_poll_attempts: 60,
            run_timeout: Duration::from_secs(60),
            launch_attempts: 1,
            run_retries: 0,
        }
    }

    /// Set runs per round
    pub fn with_runs(mut self, runs: usize) -> Self {
        self.runs = runs;
        self
    }

    /// Set round count
    pub fn with_rounds(mut self, rounds: usize) -> Self {
        self.rounds = rounds;
        self
    }

    /// Set warmup count
    pub fn with_warmups(mut self, warmups: usize) -> Self {
        self.warmups = warmups;
        self
    }

    /// Set CPU pinning
    pub fn with_cpus(mut self, cpus: CpuAssignment) -> Self {
        self.cpus = Some(cpus);
        self
    }

    /// Set the reachability poll bound
    pub fn with_boot_poll(mut self, interval: Duration, attempts: u32) -> Self {
        self.boot_poll_interval = interval;
        self.boot_poll_attempts = attempts;
        self
    }

    /// Set the per-run timeout
    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = timeout;
        self
    }

    /// Set boot attempts per session
    pub fn with_launch_attempts(mut self, attempts: u32) -> Self {
        self.launch_attempts = attempts;
        self
    }

    /// Set retries for a failed measurement
    pub fn with_run_retries(mut self, retries: u32) -> Self {
        self.run_retries = retries;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kernels.is_empty() {
            return Err(ConfigError::EmptyKernelList);
        }
        if self.runs == 0 {
            return Err(ConfigError::InvalidCount("runs must be at least 1".into()));
        }
        if self.rounds == 0 {
            return Err(ConfigError::InvalidCount("rounds must be at least 1".into()));
        }
        if self.launch_attempts == 0 {
            return Err(ConfigError::InvalidCount(
                "launch attempts must be at least 1".into(),
            ));
        }
        if self.boot_poll_attempts == 0 {
            return Err(ConfigError::InvalidCount(
                "boot poll attempts must be at least 1".into(),
            ));
        }
        if let Some(cpus) = &self.cpus {
            if !cpus.is_distinct() {
                return Err(ConfigError::OverlappingCpus(*cpus));
            }
        }
        Ok(())
    }
}

/// Host cores the VM is pinned to: the QEMU main thread and two vCPUs
///
/// Absence of an assignment means no pinning is requested. The triple is
/// handed read-only to the VM launcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuAssignment {
    /// Core for the QEMU main thread
    pub host: u32,
    /// Core for the first virtual CPU
    pub vcpu0: u32,
    /// Core for the second virtual CPU
    pub vcpu1: u32,
}

impl CpuAssignment {
    /// True when the three cores are pairwise distinct
    pub fn is_distinct(&self) -> bool {
        self.host != self.vcpu0 && self.host != self.vcpu1 && self.vcpu0 != self.vcpu1
    }

    /// Render as a `taskset`-style core list, e.g. `"2,3,4"`
    pub fn core_list(&self) -> String {
        format!("{},{},{}", self.host, self.vcpu0, self.vcpu1)
    }
}

impl FromStr for CpuAssignment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(ConfigError::InvalidCpuList(s.to_string()));
        }
        let mut cores = [0u32; 3];
        for (slot, part) in cores.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| ConfigError::InvalidCpuList(s.to_string()))?;
        }
        let cpus = CpuAssignment {
            host: cores[0],
            vcpu0: cores[1],
            vcpu1: cores[2],
        };
        if !cpus.is_distinct() {
            return Err(ConfigError::OverlappingCpus(cpus));
        }
        Ok(cpus)
    }
}

impl std::fmt::Display for CpuAssignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.core_list())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// No kernels were supplied
    #[error("kernel list is empty")]
    EmptyKernelList,

    /// A count invariant was violated
    #[error("invalid count: {0}")]
    InvalidCount(String),

    /// The CPU triple reuses a core
    #[error("CPU assignment {0} reuses a core")]
    OverlappingCpus(CpuAssignment),

    /// A CPU list string could not be parsed
    #[error("invalid CPU list {0:?}, expected three cores like \"2,3,4\"")]
    InvalidCpuList(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> BenchmarkConfig {
        BenchmarkConfig::new(
            "disk.img",
            vec![PathBuf::from("bzImage-a")],
            "workload",
            "id_rsa",
            "out.csv",
        )
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = base_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.runs, 10);
        assert_eq!(config.rounds, 1);
        assert_eq!(config.warmups, 5);
        assert_eq!(config.ssh_port, 5555);
        assert_eq!(config.run_retries, 0);
        assert_eq!(config.launch_attempts, 1);
    }

    #[test]
    fn test_empty_kernel_list_rejected() {
        let mut config = base_config();
        config.kernels.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyKernelList)
        ));
    }

    #[test]
    fn test_zero_runs_rejected() {
        let config = base_config().with_runs(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_rounds_rejected() {
        let config = base_config().with_rounds(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_warmups_allowed() {
        let config = base_config().with_warmups(0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overlapping_cpus_rejected() {
        let config = base_config().with_cpus(CpuAssignment {
            host: 2,
            vcpu0: 2,
            vcpu1: 3,
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OverlappingCpus(_))
        ));
    }

    #[test]
    fn test_cpu_assignment_parse() {
        let cpus: CpuAssignment = "2,3,4".parse().unwrap();
        assert_eq!(
            cpus,
            CpuAssignment {
                host: 2,
                vcpu0: 3,
                vcpu1: 4
            }
        );
        assert_eq!(cpus.core_list(), "2,3,4");

        assert!("2,3".parse::<CpuAssignment>().is_err());
        assert!("2,3,x".parse::<CpuAssignment>().is_err());
        assert!("2,2,3".parse::<CpuAssignment>().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = base_config().with_runs(3).with_cpus(CpuAssignment {
            host: 1,
            vcpu0: 2,
            vcpu1: 3,
        });

        let json = serde_json::to_string(&config).unwrap();
        let deserialized: BenchmarkConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.runs, 3);
        assert_eq!(deserialized.cpus, config.cpus);
        assert_eq!(deserialized.boot_poll_interval, config.boot_poll_interval);
    }
}
