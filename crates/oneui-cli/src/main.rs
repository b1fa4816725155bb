//! OneUI CLI - Host application for the OneUI crash reporter
//!
//! At startup the CLI installs the crash reporter and sweeps reports older
//! than the retention window, then runs one of:
//! - Listing, viewing, pruning and deleting crash reports
//! - Triggering a demonstration crash
//! - Showing and validating configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use oneui_crash::{platform::AppInfo, CrashConfig, CrashReporter, HostPlatform};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{config::ConfigCommand, crash::CrashCommand, reports::ReportsCommand};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "oneui", version, about = "OneUI demo app crash reporter")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage saved crash reports
    #[command(subcommand)]
    Reports(ReportsCommand),
    /// Trigger a crash to exercise the reporter
    Crash(CrashCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Loaded configuration shared by all commands
pub struct AppContext {
    pub config: CrashConfig,
    pub config_path: PathBuf,
}

impl AppContext {
    /// Builds a reporter for this host with the configured app identity,
    /// defaulting to the CLI's own package name and version.
    pub fn reporter(&self) -> CrashReporter {
        let app = self.config.app_info().unwrap_or_else(|| {
            AppInfo::from_semver(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
        });
        CrashReporter::new(&self.config, HostPlatform::new(Some(app)))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(CrashConfig::default_path);
    let config = CrashConfig::load_or_default(&config_path);

    // Setup tracing
    let filter = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    debug!(config_path = %config_path.display(), "Loaded configuration");

    let ctx = AppContext {
        config,
        config_path,
    };

    // Install before anything else can panic, then sweep old reports.
    ctx.reporter().install();
    ctx.reporter().prune_old_reports(ctx.config.retention());

    let format = OutputFormat::from_json_flag(cli.json);

    match cli.command {
        Commands::Reports(cmd) => cmd.execute(&ctx, format),
        Commands::Crash(cmd) => cmd.execute(&ctx, format),
        Commands::Config(cmd) => cmd.execute(&ctx, format),
    }
}
