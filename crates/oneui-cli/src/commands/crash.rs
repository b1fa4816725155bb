//! Crash command - Exercise the installed crash reporter
//!
//! Without flags the main thread panics and the process ends through the
//! previously installed panic hook. `--threads N` panics on N worker threads
//! instead and prints where each report landed. `--error` reports a fatal
//! error chain and exits with status 1.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use oneui_crash::{ReportEntry, ReportStore};
use thiserror::Error;
use tracing::warn;

use crate::output::{get_formatter, OutputFormat};
use crate::AppContext;

#[derive(Debug, Args)]
pub struct CrashCommand {
    /// Panic on this many worker threads instead of the main thread
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Report a fatal error chain instead of panicking
    #[arg(long)]
    pub error: bool,
}

/// Fatal error raised by `--error`.
#[derive(Debug, Error)]
pub enum DemoError {
    #[error("Failed to load settings from {path}")]
    SettingsUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CrashCommand {
    pub fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);

        if self.error {
            let err = match load_settings() {
                Ok(_) => {
                    formatter.warn("Settings file exists, nothing to report");
                    return Ok(());
                }
                Err(err) => err,
            };
            let outcome = ctx.reporter().report_fatal_error(&err);
            match outcome.path() {
                Some(path) => formatter.path("report", Some(path)),
                None => formatter.error("Crash report could not be written"),
            }
            std::process::exit(1);
        }

        if self.threads == 0 {
            panic!("Demonstration crash requested from the command line");
        }

        let reporter = ctx.reporter();
        let stores: Vec<&ReportStore> = std::iter::once(reporter.fallback_store())
            .chain(reporter.primary_store())
            .collect();
        let before: HashSet<PathBuf> = snapshot(&stores).into_iter().map(|e| e.path).collect();

        for i in 0..self.threads {
            let joined = std::thread::Builder::new()
                .name(format!("demo-worker-{i}"))
                .spawn(move || panic!("Demonstration crash on worker {i}"))?
                .join();
            if joined.is_ok() {
                warn!(worker = i, "Worker finished without panicking");
            }
        }

        let new_reports: Vec<ReportEntry> = snapshot(&stores)
            .into_iter()
            .filter(|e| !before.contains(&e.path))
            .collect();

        if format.is_json() {
            let paths: Vec<String> = new_reports
                .iter()
                .map(|e| e.path.display().to_string())
                .collect();
            formatter.print_json(&serde_json::json!({
                "threads": self.threads,
                "reports": paths,
            }));
        } else {
            formatter.success(&format!(
                "{} worker(s) crashed, {} report(s) written",
                self.threads,
                new_reports.len()
            ));
            for entry in &new_reports {
                formatter.path("report", Some(&entry.path));
            }
        }

        Ok(())
    }
}

fn snapshot(stores: &[&ReportStore]) -> Vec<ReportEntry> {
    stores.iter().flat_map(|s| s.list()).collect()
}

fn load_settings() -> Result<String, DemoError> {
    let path = PathBuf::from("/nonexistent/oneui/shared_prefs/settings.xml");
    std::fs::read_to_string(&path).map_err(|source| DemoError::SettingsUnreadable { path, source })
}
