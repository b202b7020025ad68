//! Collaborator traits for VM launch and remote command transport
//!
//! The engine only ever sees these traits. Production implementations
//! (QEMU, ssh) live in [`crate::qemu`]; tests substitute scripted mocks.

use crate::config::CpuAssignment;
use async_trait::async_trait;
use std::path::Path;

/// Starts virtual machines from a disk image and a kernel
#[async_trait]
pub trait VmLauncher: Send + Sync {
    /// Boot a VM (non-blocking: the machine may not be reachable yet)
    ///
    /// With a [`CpuAssignment`] the VM process is confined to those host
    /// cores. A failed launch must not leak a half-created process.
    async fn launch(
        &self,
        image: &Path,
        kernel: &Path,
        cpus: Option<&CpuAssignment>,
    ) -> Result<Box<dyn VmHandle>, LaunchError>;
}

/// A running VM instance plus its transport endpoint
///
/// Created on successful launch, destroyed by [`VmHandle::shutdown`];
/// never reused across kernels or rounds.
#[async_trait]
pub trait VmHandle: Send {
    /// Probe whether the VM's command endpoint accepts connections
    async fn is_reachable(&mut self) -> bool;

    /// Open a command channel to the VM
    async fn open_channel(&mut self) -> Result<Box<dyn CommandChannel>, ChannelError>;

    /// Tear the VM down
    ///
    /// Callers log a failed shutdown and move on; an orphaned process must
    /// never block the rest of the benchmark.
    async fn shutdown(&mut self) -> std::io::Result<()>;
}

/// An established command channel into a running VM
#[async_trait]
pub trait CommandChannel: Send {
    /// Run a command and return its raw standard output
    async fn exec(&mut self, command: &str) -> Result<String, ChannelError>;

    /// Copy a local file to a path inside the VM
    async fn send_file(&mut self, local: &Path, remote: &str) -> Result<(), ChannelError>;

    /// Delete a file inside the VM
    async fn remove_file(&mut self, remote: &str) -> Result<(), ChannelError>;
}

/// Launch failures
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// The VM process could not be spawned
    #[error("failed to spawn VM process: {0}")]
    Spawn(#[source] std::io::Error),

    /// The launcher refused the request
    #[error("launch rejected: {0}")]
    Rejected(String),
}

/// Transport failures on an open channel
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The underlying transport failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote side ran the command but it exited non-zero
    #[error("remote command exited with status {status}: {stderr}")]
    CommandFailed {
        /// Remote exit status
        status: i32,
        /// Captured standard error
        stderr: String,
    },

    /// The channel is no longer usable
    #[error("channel closed: {0}")]
    Closed(String),
}
