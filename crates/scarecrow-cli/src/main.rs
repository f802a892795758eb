//! scarecrow - Command-line interface for scarecrow-upload
//!
//! Provides commands for:
//! - Uploading archives, directories and files into a shared Drive folder
//! - Fetching capture archives from field hosts over SSH
//! - Chaining both for scheduled runs

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context as _, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod output;
mod shell;

use commands::{
    fetch::FetchCommand, fetch_upload::FetchUploadCommand, upload::UploadCommand, Context,
};
use output::{get_formatter, OutputFormat};
use scarecrow_core::config::{Config, ConfigBuilder};

#[derive(Debug, Parser)]
#[command(
    name = "scarecrow",
    version,
    about = "Mirror scarecrow captures into a shared Google Drive folder"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Upload an archive, directory or file, or check the shared root
    Upload(UploadCommand),
    /// Fetch the day's capture archives from field hosts
    Fetch(FetchCommand),
    /// Fetch capture archives and upload them, one folder per host
    FetchUpload(FetchUploadCommand),
}

impl Cli {
    /// Loads the config file and applies the global overrides
    fn load_config(&self) -> Result<Config> {
        self.load_config_with_default(&Config::default_path())
    }

    /// Like [`load_config`](Self::load_config), with `default_path` used
    /// when `--config` is absent; only a missing default file is tolerated
    fn load_config_with_default(&self, default_path: &Path) -> Result<Config> {
        let config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => Config::load_or_default(default_path).with_context(|| {
                format!("Invalid configuration in {}", default_path.display())
            })?,
        };

        let mut builder = ConfigBuilder::from_config(config);
        if let Some(level) = self.log_level() {
            builder = builder.logging_level(level);
        }
        if let Some(file) = &self.log_file {
            builder = builder.logging_file(file.clone());
        }
        builder.build_validated().map_err(|errors| {
            let lines: Vec<String> = errors.iter().map(|e| format!("  {e}")).collect();
            anyhow!("Invalid configuration:\n{}", lines.join("\n"))
        })
    }

    /// Level selected on the command line, if any
    fn log_level(&self) -> Option<String> {
        if let Some(level) = &self.log_level {
            return Some(level.clone());
        }
        if self.quiet {
            return Some("warn".to_string());
        }
        match self.verbose {
            0 => None,
            1 => Some("debug".to_string()),
            _ => Some("trace".to_string()),
        }
    }

    fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Installs the stderr subscriber, plus a file writer when `log_file` is set
///
/// `RUST_LOG` takes precedence over `level`.
fn init_tracing(level: &str, log_file: Option<&Path>) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")
}

async fn run(cli: Cli, ctx: Context) -> Result<()> {
    match cli.command {
        Commands::Upload(cmd) => cmd.execute(&ctx).await,
        Commands::Fetch(cmd) => cmd.execute(&ctx).await,
        Commands::FetchUpload(cmd) => cmd.execute(&ctx).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let format = cli.format();
    let formatter = get_formatter(format, cli.quiet);

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            formatter.error(&format!("{e:#}"));
            std::process::exit(2);
        }
    };
    if let Err(e) = init_tracing(&config.logging.level, config.logging.file.as_deref()) {
        formatter.error(&format!("{e:#}"));
        std::process::exit(2);
    }

    let ctx = Context {
        config,
        format,
        quiet: cli.quiet,
    };
    if let Err(e) = run(cli, ctx).await {
        tracing::error!(error = %format!("{e:#}"), "Command failed");
        formatter.error(&format!("{e:#}"));
        std::process::exit(1);
    }
}
