//! Upload command - Mirror local content into the shared Drive root
//!
//! Provides the `scarecrow upload` CLI command which:
//! 1. Loads the folder mapping and service-account key
//! 2. Verifies the shared root folder is reachable
//! 3. With `--upload`, mirrors one source below `--upload-directory`

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{ArgGroup, Args};

use scarecrow_core::domain::UploadSource;
use scarecrow_core::usecases::RunReport;

use super::{Context, DriveArgs};
use crate::output::OutputFormatter;

#[derive(Debug, Args)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["upload", "check"]),
))]
#[command(group(
    ArgGroup::new("source")
        .args(["upload_archive", "upload_local_directory", "upload_file"]),
))]
pub struct UploadCommand {
    /// Upload the selected source
    #[arg(long, requires = "source")]
    pub upload: bool,

    /// Only verify that the shared root folder is accessible
    #[arg(long)]
    pub check: bool,

    /// Tar archive whose contents are mirrored as folders and files
    #[arg(long, value_name = "PATH")]
    pub upload_archive: Option<PathBuf>,

    /// Local directory mirrored file by file
    #[arg(long, value_name = "PATH")]
    pub upload_local_directory: Option<PathBuf>,

    /// Single local file
    #[arg(long, value_name = "PATH")]
    pub upload_file: Option<PathBuf>,

    /// Pack --upload-local-directory into one tar file instead of mirroring it
    #[arg(long, requires = "upload_local_directory")]
    pub archive: bool,

    /// Local root the remote folder structure is computed from
    #[arg(long, value_name = "PATH", default_value = ".")]
    pub upload_root: PathBuf,

    /// Remove the local source after a successful upload
    #[arg(long)]
    pub upload_cleanup: bool,

    /// Show what would be done without making changes
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub drive: DriveArgs,
}

impl UploadCommand {
    /// The source selected by the mutually exclusive source flags
    pub fn source(&self) -> Option<UploadSource> {
        if let Some(path) = &self.upload_archive {
            return Some(UploadSource::Archive(path.clone()));
        }
        if let Some(path) = &self.upload_file {
            return Some(UploadSource::SingleFile(path.clone()));
        }
        self.upload_local_directory.as_ref().map(|dir| {
            if self.archive {
                UploadSource::ArchivedDirectory(dir.clone())
            } else {
                UploadSource::LocalDirectory {
                    root: self.upload_root.clone(),
                    subdir: dir.clone(),
                }
            }
        })
    }

    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let formatter = ctx.formatter();
        let destination = self.drive.destination()?;
        let mut run = self
            .drive
            .open_run(&ctx.config, self.dry_run)?
            .with_cleanup(self.upload_cleanup);

        if self.check {
            let root = run
                .check_root()
                .await
                .context("Shared root folder is not accessible")?;
            if ctx.format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": true,
                    "root": root,
                }));
            } else {
                formatter.success(&format!("Shared root folder is accessible: {root}"));
                if let Some(drive_id) = root.drive_id() {
                    formatter.info(&format!("Shared drive: {drive_id}"));
                }
            }
            return Ok(());
        }

        let source = self
            .source()
            .context("--upload requires --upload-archive, --upload-local-directory or --upload-file")?;
        if self.dry_run {
            formatter.info("Dry run mode - no changes will be made");
        }

        let report = run
            .execute(&source, &destination)
            .await
            .with_context(|| format!("Failed to upload {}", source.local_path().display()))?;
        print_report(formatter.as_ref(), ctx, &report);
        Ok(())
    }
}

/// Displays one upload report in the selected format
pub fn print_report(formatter: &dyn OutputFormatter, ctx: &Context, report: &RunReport) {
    if ctx.format.is_json() {
        formatter.print_json(&serde_json::to_value(report).unwrap_or_default());
        return;
    }

    let prefix = if report.dry_run { "Dry run: " } else { "" };
    formatter.success(&format!(
        "{prefix}Uploaded {} to {}",
        report.source, report.destination_path
    ));
    formatter.info(&format!("Files created:    {}", report.walk.files_created));
    formatter.info(&format!("Files updated:    {}", report.walk.files_updated));
    formatter.info(&format!("Folders resolved: {}", report.walk.folders_resolved));
    if report.cleaned_up {
        formatter.info("Local source removed");
    }
}
