//! SSH command channel
//!
//! Runs commands inside the guest through the system `ssh` binary and
//! copies files with `scp`. Host key checking is disabled: the guest is a
//! throwaway VM on a loopback port whose host key changes on every boot.

use crate::traits::{ChannelError, CommandChannel};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

const SSH_USER: &str = "root";
const SSH_HOST: &str = "127.0.0.1";

/// Command channel over the system ssh/scp binaries
pub struct SshChannel {
    port: u16,
    key: PathBuf,
}

impl SshChannel {
    /// Channel to the VM behind the forwarded loopback port
    pub fn new(port: u16, key: impl Into<PathBuf>) -> Self {
        Self {
            port,
            key: key.into(),
        }
    }

    fn common_options(&self) -> Vec<String> {
        vec![
            "-i".into(),
            self.key.display().to_string(),
            "-o".into(),
            "BatchMode=yes".into(),
            "-o".into(),
            "StrictHostKeyChecking=no".into(),
            "-o".into(),
            "UserKnownHostsFile=/dev/null".into(),
            "-o".into(),
            "LogLevel=ERROR".into(),
        ]
    }

    async fn run_tool(&self, tool: &str, args: Vec<String>) -> Result<String, ChannelError> {
        let output = Command::new(tool)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(ChannelError::CommandFailed {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl CommandChannel for SshChannel {
    async fn exec(&mut self, command: &str) -> Result<String, ChannelError> {
        let mut args = self.common_options();
        args.push("-p".into());
        args.push(self.port.to_string());
        args.push(format!("{SSH_USER}@{SSH_HOST}"));
        args.push(command.to_string());
        self.run_tool("ssh", args).await
    }

    async fn send_file(&mut self, local: &Path, remote: &str) -> Result<(), ChannelError> {
        let mut args = self.common_options();
        // scp spells the port flag with a capital P.
        args.push("-P".into());
        args.push(self.port.to_string());
        args.push(local.display().to_string());
        args.push(format!("{SSH_USER}@{SSH_HOST}:{remote}"));
        self.run_tool("scp", args).await.map(|_| ())
    }

    async fn remove_file(&mut self, remote: &str) -> Result<(), ChannelError> {
        self.exec(&format!("rm -f {remote}")).await.map(|_| ())
    }
}
