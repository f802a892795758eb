//! Capture fetch use case
//!
//! Field hosts write detection captures named after their timestamp
//! (`2024-05-01T10-22-03.jpg`). Fetching packs the captures of one day into a
//! tar on the host (removing the originals), then copies that tar into a
//! per-host local directory.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};

use crate::config::FetchConfig;
use crate::ports::IRemoteShell;
use crate::retry::{Backoff, RetryPolicy};

/// Attempts made per host
pub const FETCH_ATTEMPTS: u32 = 3;

/// Fixed delay between per-host attempts
pub const FETCH_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Where and which captures to fetch
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    /// Directory searched on the host
    pub remote_directory: String,
    /// Local directory receiving a sub-directory per host
    pub local_directory: PathBuf,
    /// Timezone the capture date is computed in
    pub timezone: Tz,
    /// Fetch the captures of this many days ago instead of today
    pub since_days: Option<u32>,
}

impl FetchOptions {
    /// Options from the `fetch` configuration section
    ///
    /// # Errors
    ///
    /// Returns error if the configured timezone is unknown.
    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        let timezone = config
            .timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("Unknown timezone '{}': {e}", config.timezone))?;
        Ok(Self {
            remote_directory: config.remote_directory.clone(),
            local_directory: config.local_directory.clone(),
            timezone,
            since_days: None,
        })
    }
}

/// The capture day `since_days` before `now`, in `timezone`
pub fn capture_date(now: DateTime<Utc>, timezone: Tz, since_days: Option<u32>) -> NaiveDate {
    let today = now.with_timezone(&timezone).date_naive();
    match since_days {
        Some(days) => today
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN),
        None => today,
    }
}

/// Use case fetching capture archives from field hosts
pub struct CaptureFetcher {
    shell: Arc<dyn IRemoteShell>,
    policy: RetryPolicy,
}

impl CaptureFetcher {
    /// Creates a fetcher retrying each host 3 times, 5 seconds apart
    pub fn new(shell: Arc<dyn IRemoteShell>) -> Self {
        Self {
            shell,
            policy: RetryPolicy::new(FETCH_ATTEMPTS, Backoff::fixed(FETCH_RETRY_DELAY)),
        }
    }

    /// Overrides the per-host retry policy
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fetches today's (or an earlier day's) captures from `host`
    ///
    /// Any failure restarts the whole host step, up to the policy's attempt
    /// count.
    ///
    /// # Returns
    ///
    /// The local archive path, or `None` if the host had no captures for
    /// that day.
    ///
    /// # Errors
    ///
    /// Returns the last error once all attempts failed.
    pub async fn fetch(&self, host: &str, options: &FetchOptions) -> Result<Option<PathBuf>> {
        info!(host, "Processing host");
        let mut attempt = 0u32;
        self.policy
            .run("fetch", |_: &anyhow::Error| true, || {
                attempt += 1;
                self.fetch_attempt(host, options, Utc::now(), attempt > 1)
            })
            .await
            .with_context(|| format!("Failed to fetch captures from '{host}'"))
    }

    /// Single attempt of [`fetch`](Self::fetch) at time `now`
    pub async fn fetch_once(
        &self,
        host: &str,
        options: &FetchOptions,
        now: DateTime<Utc>,
    ) -> Result<Option<PathBuf>> {
        self.fetch_attempt(host, options, now, false).await
    }

    /// One attempt; a `retry` also picks up an archive a failed earlier
    /// attempt already built on the host
    async fn fetch_attempt(
        &self,
        host: &str,
        options: &FetchOptions,
        now: DateTime<Utc>,
        retry: bool,
    ) -> Result<Option<PathBuf>> {
        let date = capture_date(now, options.timezone, options.since_days)
            .format("%Y-%m-%d")
            .to_string();
        let stamp = now
            .with_timezone(&options.timezone)
            .format("%Y-%m-%d_%H-%M-%S")
            .to_string();

        let listing = self
            .shell
            .run(host, &list_command(&options.remote_directory, &date))
            .await?;
        let count = listing.lines().filter(|l| !l.trim().is_empty()).count();
        let remote_archive = format!("/tmp/{host}_{date}.tar");

        if count == 0 {
            // The originals are gone once archived; a failed download leaves
            // only the archive behind.
            let left_over = retry
                && !self
                    .shell
                    .run(host, &exists_command(&remote_archive))
                    .await?
                    .trim()
                    .is_empty();
            if !left_over {
                info!(host, date = %date, "No captures found");
                return Ok(None);
            }
            warn!(
                host,
                archive = %remote_archive,
                "Captures were archived by an earlier attempt, downloading that archive"
            );
        } else {
            self.shell
                .run(
                    host,
                    &archive_command(&options.remote_directory, &date, &remote_archive),
                )
                .await?;
            info!(host, archive = %remote_archive, files = count, "Archived captures on host");
        }

        let host_dir = options.local_directory.join(host);
        tokio::fs::create_dir_all(&host_dir)
            .await
            .with_context(|| format!("Failed to create {}", host_dir.display()))?;
        let local_archive = host_dir.join(format!("{host}_{date}_{stamp}.tar"));
        self.shell
            .download(host, &remote_archive, &local_archive)
            .await?;
        info!(
            host,
            from = %remote_archive,
            to = %local_archive.display(),
            "Downloaded capture archive"
        );

        Ok(Some(local_archive))
    }
}

impl std::fmt::Debug for CaptureFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureFetcher")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Quotes `value` for a POSIX shell
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn name_pattern(date: &str) -> String {
    quote(&format!("{date}T*"))
}

/// Lists the capture files of `date` below `remote_directory`
pub fn list_command(remote_directory: &str, date: &str) -> String {
    format!(
        "find {} -name {} -type f",
        quote(remote_directory),
        name_pattern(date)
    )
}

/// Packs the capture files of `date` into `archive` with flattened names,
/// removing the originals
pub fn archive_command(remote_directory: &str, date: &str, archive: &str) -> String {
    format!(
        "cd {} && find ./ -name {} -type f -print0 | sudo tar --null \
         --transform='s|.*/||' -cf {} --remove-files --files-from=-",
        quote(remote_directory),
        name_pattern(date),
        quote(archive)
    )
}

/// Prints `archive` if it exists on the host; succeeds either way
pub fn exists_command(archive: &str) -> String {
    let archive = quote(archive);
    format!("test -f {archive} && echo {archive} || true")
}
