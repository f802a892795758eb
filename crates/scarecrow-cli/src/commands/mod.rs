//! Subcommands of the `scarecrow` binary
//!
//! Every command is a clap `Args` struct with an async `execute` method that
//! receives the resolved [`Context`].

pub mod fetch;
pub mod fetch_upload;
pub mod upload;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Args;
use tracing::info;

use scarecrow_core::config::{Config, ConfigBuilder, FolderMapping};
use scarecrow_core::domain::PathSegments;
use scarecrow_core::usecases::{RemoteExecutor, UploadRun};
use scarecrow_gdrive::provider::DriveStorageClient;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Settings shared by every command
#[derive(Debug, Clone)]
pub struct Context {
    pub config: Config,
    pub format: OutputFormat,
    pub quiet: bool,
}

impl Context {
    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format, self.quiet)
    }
}

/// Credentials and destination of an upload
#[derive(Debug, Clone, Args)]
pub struct DriveArgs {
    /// JSON file mapping root names to Drive folder ids
    #[arg(short = 'm', long, value_name = "PATH")]
    pub folder_mapping: Option<PathBuf>,

    /// Service-account key JSON file
    #[arg(short = 's', long, value_name = "PATH")]
    pub service_account_file: Option<PathBuf>,

    /// Remote folder path below the shared root, e.g. `captures/site-a`
    #[arg(long, value_name = "REMOTE_PATH", default_value = "")]
    pub upload_directory: String,
}

impl DriveArgs {
    /// Drive settings with the command-line overrides applied
    pub fn resolve(&self, config: &Config) -> Config {
        let mut builder = ConfigBuilder::from_config(config.clone());
        if let Some(path) = &self.service_account_file {
            builder = builder.service_account_file(path.clone());
        }
        if let Some(path) = &self.folder_mapping {
            builder = builder.folder_mapping(path.clone());
        }
        builder.build()
    }

    /// The `--upload-directory` path as segments
    pub fn destination(&self) -> Result<PathSegments> {
        PathSegments::parse_remote(&self.upload_directory)
            .with_context(|| format!("Invalid upload directory '{}'", self.upload_directory))
    }

    /// Loads the folder mapping and credentials and prepares an upload run
    ///
    /// Nothing remote is touched yet; the run verifies the root itself.
    pub fn open_run(&self, config: &Config, dry_run: bool) -> Result<UploadRun> {
        let config = self.resolve(config);
        let mapping_path = &config.drive.folder_mapping;
        let mapping = FolderMapping::load(mapping_path)
            .with_context(|| format!("Failed to load folder mapping {}", mapping_path.display()))?;

        let key_path = &config.drive.service_account_file;
        let client = DriveStorageClient::from_service_account_file(key_path).with_context(|| {
            format!("Failed to load service account key {}", key_path.display())
        })?;

        info!(
            root = %mapping.root(),
            mapping = %mapping_path.display(),
            dry_run,
            "Prepared upload run"
        );

        let executor =
            RemoteExecutor::new(Arc::new(client), config.retry.policy()).with_dry_run(dry_run);
        Ok(UploadRun::new(Arc::new(executor), mapping.root().clone()))
    }
}
