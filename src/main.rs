//! syscall-bench CLI
//!
//! Boots each kernel in a fresh VM and benchmarks a workload inside it.

use anyhow::Result;
use clap::Parser;
use syscall_bench::cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Run the benchmark
    cli.run().await?;

    Ok(())
}
