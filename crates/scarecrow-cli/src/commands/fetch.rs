//! Fetch command - Collect capture archives from field hosts
//!
//! For every `--source` host, archives the day's capture files on the host
//! and downloads the archive below the local directory.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Args;

use scarecrow_core::config::{Config, ConfigBuilder};
use scarecrow_core::usecases::{CaptureFetcher, FetchOptions};

use super::Context;
use crate::shell::OpenSshShell;

/// Hosts and capture selection shared by `fetch` and `fetch-upload`
#[derive(Debug, Clone, Args)]
pub struct FetchArgs {
    /// SSH host aliases to fetch from
    #[arg(long = "source", value_name = "HOST", required = true, num_args = 1..)]
    pub sources: Vec<String>,

    /// Directory holding the capture files on each host
    #[arg(long, value_name = "PATH")]
    pub remote_directory: Option<String>,

    /// Local directory receiving one sub-directory per host
    #[arg(long, value_name = "PATH")]
    pub local_directory: Option<PathBuf>,

    /// IANA timezone used to compute the capture date
    #[arg(long, value_name = "TZ")]
    pub timezone: Option<String>,

    /// Fetch the captures of this many days ago instead of today
    #[arg(long, value_name = "DAYS")]
    pub since_days: Option<u32>,

    /// SSH connection timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl FetchArgs {
    /// Fetch settings with the command-line overrides applied and validated
    pub fn resolve(&self, config: &Config) -> Result<Config> {
        let mut builder = ConfigBuilder::from_config(config.clone());
        if let Some(dir) = &self.remote_directory {
            builder = builder.fetch_remote_directory(dir.clone());
        }
        if let Some(dir) = &self.local_directory {
            builder = builder.fetch_local_directory(dir.clone());
        }
        if let Some(tz) = &self.timezone {
            builder = builder.fetch_timezone(tz.clone());
        }
        if let Some(secs) = self.timeout {
            builder = builder.fetch_timeout_secs(secs);
        }
        builder.build_validated().map_err(|errors| {
            let lines: Vec<String> = errors.iter().map(ToString::to_string).collect();
            anyhow!("Invalid fetch settings: {}", lines.join("; "))
        })
    }

    /// Capture selection and the fetcher talking to the hosts
    pub fn prepare(&self, config: &Config) -> Result<(FetchOptions, CaptureFetcher)> {
        let config = self.resolve(config)?;
        let mut options = FetchOptions::from_config(&config.fetch)?;
        options.since_days = self.since_days;

        let shell = OpenSshShell::new(Duration::from_secs(config.fetch.timeout_secs));
        Ok((options, CaptureFetcher::new(Arc::new(shell))))
    }
}

#[derive(Debug, Args)]
pub struct FetchCommand {
    #[command(flatten)]
    pub fetch: FetchArgs,
}

impl FetchCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let formatter = ctx.formatter();
        let (options, fetcher) = self.fetch.prepare(&ctx.config)?;

        let mut fetched = Vec::new();
        for host in &self.fetch.sources {
            match fetcher.fetch(host, &options).await? {
                Some(archive) => {
                    formatter.success(&format!("{host}: {}", archive.display()));
                    fetched.push(serde_json::json!({"host": host, "archive": archive}));
                }
                None => {
                    formatter.info(&format!("{host}: no captures"));
                    fetched.push(serde_json::json!({"host": host, "archive": null}));
                }
            }
        }

        formatter.print_json(&serde_json::json!({ "fetched": fetched }));
        Ok(())
    }
}
