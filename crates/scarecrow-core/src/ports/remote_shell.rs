//! Remote shell port (driven/secondary port)
//!
//! Capture files live on field hosts reachable through SSH config aliases.
//! The core only needs two operations: run a command and copy one file back.

use std::path::Path;

/// Port trait for running commands on, and copying files from, a remote host
///
/// Uses `anyhow::Result` because failures here are adapter-specific and are
/// retried wholesale by the fetch use case.
#[async_trait::async_trait]
pub trait IRemoteShell: Send + Sync {
    /// Runs `command` on `host` and returns its standard output
    ///
    /// A non-zero exit status is an error.
    async fn run(&self, host: &str, command: &str) -> anyhow::Result<String>;

    /// Copies `remote_path` on `host` to `local_path`
    async fn download(&self, host: &str, remote_path: &str, local_path: &Path)
        -> anyhow::Result<()>;
}
