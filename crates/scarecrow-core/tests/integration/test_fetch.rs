//! Capture fetching against a scripted remote shell

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use scarecrow_core::ports::IRemoteShell;
use scarecrow_core::retry::{Backoff, RetryPolicy};
use scarecrow_core::usecases::{CaptureFetcher, FetchOptions};

/// Remote shell answering `find` with a fixed listing
#[derive(Default)]
struct FakeShell {
    listing: String,
    failures_left: AtomicU32,
    download_failures_left: AtomicU32,
    archived: AtomicBool,
    commands: Mutex<Vec<(String, String)>>,
    downloads: Mutex<Vec<(String, String, PathBuf)>>,
}

impl FakeShell {
    fn with_listing(listing: &str) -> Self {
        Self {
            listing: listing.to_string(),
            ..Self::default()
        }
    }

    fn commands(&self) -> Vec<(String, String)> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl IRemoteShell for FakeShell {
    async fn run(&self, host: &str, command: &str) -> anyhow::Result<String> {
        self.commands
            .lock()
            .unwrap()
            .push((host.to_string(), command.to_string()));
        if self.failures_left.load(Ordering::SeqCst) > 0 {
            self.failures_left.fetch_sub(1, Ordering::SeqCst);
            anyhow::bail!("ssh: connect to host {host}: Connection timed out");
        }
        if command.starts_with("find ") {
            if self.archived.load(Ordering::SeqCst) {
                return Ok(String::new());
            }
            return Ok(self.listing.clone());
        }
        if command.contains("sudo tar") {
            self.archived.store(true, Ordering::SeqCst);
        }
        if command.starts_with("test -f ") && self.archived.load(Ordering::SeqCst) {
            return Ok("/tmp/archive.tar\n".to_string());
        }
        Ok(String::new())
    }

    async fn download(
        &self,
        host: &str,
        remote_path: &str,
        local_path: &Path,
    ) -> anyhow::Result<()> {
        if self.download_failures_left.load(Ordering::SeqCst) > 0 {
            self.download_failures_left.fetch_sub(1, Ordering::SeqCst);
            anyhow::bail!("scp: connection lost");
        }
        std::fs::write(local_path, b"tar")?;
        self.downloads.lock().unwrap().push((
            host.to_string(),
            remote_path.to_string(),
            local_path.to_path_buf(),
        ));
        Ok(())
    }
}

fn options(local: &Path) -> FetchOptions {
    FetchOptions {
        remote_directory: "/var/local/scarecrow/detected/".to_string(),
        local_directory: local.to_path_buf(),
        timezone: chrono_tz::Europe::Budapest,
        since_days: None,
    }
}

#[tokio::test]
async fn test_no_captures_returns_none() {
    let shell = Arc::new(FakeShell::with_listing(""));
    let tmp = tempfile::tempdir().unwrap();
    let fetcher = CaptureFetcher::new(shell.clone());

    let fetched = fetcher.fetch("cam1", &options(tmp.path())).await.unwrap();

    assert!(fetched.is_none());
    assert_eq!(shell.commands().len(), 1);
    assert!(shell.downloads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_captures_are_archived_and_downloaded() {
    let shell = Arc::new(FakeShell::with_listing(
        "/var/local/scarecrow/detected/2024-05-02T08-00-00.jpg\n\
         /var/local/scarecrow/detected/sub/2024-05-02T09-30-00.jpg\n",
    ));
    let tmp = tempfile::tempdir().unwrap();
    let fetcher = CaptureFetcher::new(shell.clone());
    // 06:15 UTC is 08:15 in Budapest (CEST).
    let now = Utc.with_ymd_and_hms(2024, 5, 2, 6, 15, 0).unwrap();

    let fetched = fetcher
        .fetch_once("cam1", &options(tmp.path()), now)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        fetched,
        tmp.path().join("cam1/cam1_2024-05-02_2024-05-02_08-15-00.tar")
    );
    assert!(fetched.exists());

    let commands = shell.commands();
    assert_eq!(commands.len(), 2);
    assert!(commands.iter().all(|(host, _)| host == "cam1"));
    assert!(commands[0].1.contains("-name '2024-05-02T*'"));
    assert!(commands[1].1.contains("sudo tar --null"));
    assert!(commands[1].1.contains("--remove-files"));
    assert!(commands[1].1.contains("'/tmp/cam1_2024-05-02.tar'"));

    let downloads = shell.downloads.lock().unwrap().clone();
    assert_eq!(downloads.len(), 1);
    assert_eq!(downloads[0].1, "/tmp/cam1_2024-05-02.tar");
}

#[tokio::test]
async fn test_since_days_selects_earlier_date() {
    let shell = Arc::new(FakeShell::with_listing(""));
    let tmp = tempfile::tempdir().unwrap();
    let fetcher = CaptureFetcher::new(shell.clone());
    let now = Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap();
    let mut opts = options(tmp.path());
    opts.since_days = Some(2);

    fetcher.fetch_once("cam1", &opts, now).await.unwrap();

    assert!(shell.commands()[0].1.contains("-name '2024-04-30T*'"));
}

#[tokio::test(start_paused = true)]
async fn test_host_step_is_retried_with_fixed_delay() {
    let shell = Arc::new(FakeShell::with_listing(""));
    shell.failures_left.store(2, Ordering::SeqCst);
    let tmp = tempfile::tempdir().unwrap();
    let fetcher = CaptureFetcher::new(shell.clone());
    let started = tokio::time::Instant::now();

    let fetched = fetcher.fetch("cam1", &options(tmp.path())).await.unwrap();

    assert!(fetched.is_none());
    let commands = shell.commands();
    assert_eq!(commands.len(), 4);
    assert!(commands[3].1.starts_with("test -f '/tmp/cam1_"));
    assert!(started.elapsed() >= Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_host_reports_error() {
    let shell = Arc::new(FakeShell::with_listing(""));
    shell.failures_left.store(10, Ordering::SeqCst);
    let tmp = tempfile::tempdir().unwrap();
    let fetcher = CaptureFetcher::new(shell.clone())
        .with_policy(RetryPolicy::new(2, Backoff::fixed(Duration::from_secs(1))));

    let err = fetcher
        .fetch("cam1", &options(tmp.path()))
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("Connection timed out"));
    assert_eq!(shell.commands().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_retry_downloads_archive_left_by_failed_download() {
    let shell = Arc::new(FakeShell::with_listing(
        "/var/local/scarecrow/detected/2024-05-02T08-00-00.jpg\n",
    ));
    shell.download_failures_left.store(1, Ordering::SeqCst);
    let tmp = tempfile::tempdir().unwrap();
    let fetcher = CaptureFetcher::new(shell.clone());

    let fetched = fetcher
        .fetch("cam1", &options(tmp.path()))
        .await
        .unwrap()
        .expect("archive from the first attempt is recovered");

    assert!(fetched.exists());
    let commands: Vec<String> = shell.commands().into_iter().map(|(_, c)| c).collect();
    assert_eq!(commands.len(), 4);
    assert!(commands[0].starts_with("find "));
    assert!(commands[1].contains("sudo tar"));
    assert!(commands[2].starts_with("find "));
    assert!(commands[3].starts_with("test -f "));

    let downloads = shell.downloads.lock().unwrap().clone();
    assert_eq!(downloads.len(), 1);
    assert!(downloads[0].1.starts_with("/tmp/cam1_"));
}
