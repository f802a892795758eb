//! OpenSSH adapter for the remote shell port
//!
//! Hosts are SSH config aliases; `ssh` and `scp` run in batch mode so a
//! missing key fails instead of prompting.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tracing::debug;

use scarecrow_core::ports::IRemoteShell;

/// [`IRemoteShell`] backed by the `ssh` and `scp` binaries
#[derive(Debug, Clone)]
pub struct OpenSshShell {
    timeout: Duration,
}

impl OpenSshShell {
    /// Creates a shell giving up on connections after `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn options(&self) -> Vec<OsString> {
        vec![
            "-o".into(),
            format!("ConnectTimeout={}", self.timeout.as_secs().max(1)).into(),
            "-o".into(),
            "BatchMode=yes".into(),
        ]
    }

    /// Arguments of `ssh` running `command` on `host`
    pub fn ssh_args(&self, host: &str, command: &str) -> Vec<OsString> {
        let mut args = self.options();
        args.push(host.into());
        args.push(command.into());
        args
    }

    /// Arguments of `scp` copying `host:remote_path` to `local_path`
    pub fn scp_args(&self, host: &str, remote_path: &str, local_path: &Path) -> Vec<OsString> {
        let mut args = self.options();
        args.push(format!("{host}:{remote_path}").into());
        args.push(local_path.as_os_str().to_os_string());
        args
    }
}

async fn output(program: &str, args: Vec<OsString>) -> Result<String> {
    debug!(program, args = ?args, "Running command");
    let output = Command::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .output()
        .await
        .with_context(|| format!("Failed to start {program}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("{program} exited with {}: {}", output.status, stderr.trim());
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[async_trait::async_trait]
impl IRemoteShell for OpenSshShell {
    async fn run(&self, host: &str, command: &str) -> Result<String> {
        output("ssh", self.ssh_args(host, command)).await
    }

    async fn download(&self, host: &str, remote_path: &str, local_path: &Path) -> Result<()> {
        output("scp", self.scp_args(host, remote_path, local_path)).await?;
        Ok(())
    }
}
