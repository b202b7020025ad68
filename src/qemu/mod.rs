//! QEMU-backed VM launcher
//!
//! Production implementation of the [`VmLauncher`] seam: boots
//! `qemu-system-x86_64` with KVM acceleration, the guest's SSH port
//! forwarded to a host port, and the kernel under test passed via
//! `-kernel`. With a [`CpuAssignment`] the whole VM process is confined
//! to the assigned host cores through `taskset`.

mod ssh;

pub use ssh::SshChannel;

use crate::config::CpuAssignment;
use crate::traits::{ChannelError, CommandChannel, LaunchError, VmHandle, VmLauncher};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::process::{Child, Command};

const QEMU_BINARY: &str = "qemu-system-x86_64";
const REACHABILITY_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Boots QEMU VMs with the guest SSH port forwarded to the host
pub struct QemuLauncher {
    ssh_port: u16,
    key: PathBuf,
}

impl QemuLauncher {
    /// Launcher forwarding guest port 22 to `ssh_port` on the host,
    /// authenticating channels with `key`
    pub fn new(ssh_port: u16, key: impl Into<PathBuf>) -> Self {
        Self {
            ssh_port,
            key: key.into(),
        }
    }
}

#[async_trait]
impl VmLauncher for QemuLauncher {
    async fn launch(
        &self,
        image: &Path,
        kernel: &Path,
        cpus: Option<&CpuAssignment>,
    ) -> Result<Box<dyn VmHandle>, LaunchError> {
        let mut command = match cpus {
            Some(cpus) => {
                let mut c = Command::new("taskset");
                c.arg("-c").arg(cpus.core_list()).arg(QEMU_BINARY);
                c
            }
            None => Command::new(QEMU_BINARY),
        };

        command
            .args(qemu_args(image, kernel, self.ssh_port))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            // If this process dies mid-benchmark, the VM must die with it.
            .kill_on_drop(true);

        tracing::info!(
            kernel = %kernel.display(),
            image = %image.display(),
            ssh_port = self.ssh_port,
            pinned = cpus.is_some(),
            "launching VM"
        );

        let child = command.spawn().map_err(LaunchError::Spawn)?;

        Ok(Box::new(QemuVmHandle {
            child,
            ssh_port: self.ssh_port,
            key: self.key.clone(),
        }))
    }
}

/// Arguments for one benchmark VM: KVM acceleration, user-mode networking
/// with the guest's port 22 forwarded, the image on virtio-scsi, and the
/// kernel under test booted directly with a serial console.
fn qemu_args(image: &Path, kernel: &Path, ssh_port: u16) -> Vec<String> {
    vec![
        "-nographic".into(),
        "-machine".into(),
        "accel=kvm".into(),
        "-cpu".into(),
        "host".into(),
        "-smp".into(),
        "2".into(),
        "-m".into(),
        "4G".into(),
        "-device".into(),
        "e1000,netdev=net0".into(),
        "-netdev".into(),
        format!("user,id=net0,hostfwd=tcp::{ssh_port}-:22"),
        "-drive".into(),
        format!("if=none,id=hd,file={},format=raw", image.display()),
        "-device".into(),
        "virtio-scsi-pci,id=scsi".into(),
        "-device".into(),
        "scsi-hd,drive=hd".into(),
        "-device".into(),
        "virtio-rng-pci,max-bytes=1024,period=1000".into(),
        "-kernel".into(),
        kernel.display().to_string(),
        "-append".into(),
        "console=ttyS0,115200 root=/dev/sda rw nokaslr".into(),
    ]
}

/// A running QEMU instance and its forwarded SSH endpoint
pub struct QemuVmHandle {
    child: Child,
    ssh_port: u16,
    key: PathBuf,
}

#[async_trait]
impl VmHandle for QemuVmHandle {
    async fn is_reachable(&mut self) -> bool {
        // A TCP accept on the forwarded port means sshd is up inside the
        // guest; user-mode networking refuses until then.
        matches!(
            tokio::time::timeout(
                REACHABILITY_PROBE_TIMEOUT,
                TcpStream::connect(("127.0.0.1", self.ssh_port)),
            )
            .await,
            Ok(Ok(_))
        )
    }

    async fn open_channel(&mut self) -> Result<Box<dyn CommandChannel>, ChannelError> {
        let mut channel = SshChannel::new(self.ssh_port, self.key.clone());
        // Verify the channel end-to-end before the session builds on it.
        channel.exec("true").await?;
        Ok(Box::new(channel))
    }

    async fn shutdown(&mut self) -> std::io::Result<()> {
        tracing::debug!(pid = ?self.child.id(), "terminating VM");
        self.child.kill().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qemu_args_forward_configured_port() {
        let args = qemu_args(Path::new("debian.img"), Path::new("bzImage"), 5599);
        assert!(args.contains(&"user,id=net0,hostfwd=tcp::5599-:22".to_string()));
    }

    #[test]
    fn test_qemu_args_boot_the_given_kernel() {
        let args = qemu_args(Path::new("debian.img"), Path::new("/kernels/bzImage-a"), 5555);
        let kernel_pos = args.iter().position(|a| a == "-kernel").unwrap();
        assert_eq!(args[kernel_pos + 1], "/kernels/bzImage-a");
        assert!(args.contains(&"if=none,id=hd,file=debian.img,format=raw".to_string()));
    }
}
