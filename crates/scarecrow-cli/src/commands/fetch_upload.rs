//! Fetch-upload command - Fetch capture archives and mirror them to Drive
//!
//! Each fetched archive is extracted into `<upload-directory>/<host>` below
//! the shared root. Hosts without captures for the day are skipped.

use anyhow::{Context as _, Result};
use clap::Args;
use tracing::info;

use scarecrow_core::domain::UploadSource;

use super::fetch::FetchArgs;
use super::upload::print_report;
use super::{Context, DriveArgs};

#[derive(Debug, Args)]
pub struct FetchUploadCommand {
    #[command(flatten)]
    pub fetch: FetchArgs,

    #[command(flatten)]
    pub drive: DriveArgs,

    /// Remove each local archive after it was uploaded
    #[arg(long)]
    pub upload_cleanup: bool,

    /// Show what would be uploaded without making changes
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

impl FetchUploadCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let formatter = ctx.formatter();
        let (options, fetcher) = self.fetch.prepare(&ctx.config)?;
        let base = self.drive.destination()?;
        let mut run = self
            .drive
            .open_run(&ctx.config, self.dry_run)?
            .with_cleanup(self.upload_cleanup);

        let mut reports = Vec::new();
        for host in &self.fetch.sources {
            let Some(archive) = fetcher.fetch(host, &options).await? else {
                formatter.info(&format!("{host}: no captures"));
                continue;
            };

            let destination = base
                .child(host)
                .with_context(|| format!("Invalid host name '{host}'"))?;
            info!(host, archive = %archive.display(), "Uploading fetched archive");
            let report = run
                .execute(&UploadSource::Archive(archive.clone()), &destination)
                .await
                .with_context(|| format!("Failed to upload {}", archive.display()))?;

            if !ctx.format.is_json() {
                print_report(formatter.as_ref(), ctx, &report);
            }
            reports.push(report);
        }

        formatter.print_json(&serde_json::json!({ "uploads": reports }));
        Ok(())
    }
}
