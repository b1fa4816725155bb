//! Reports command - Manage saved crash reports
//!
//! Provides the `oneui reports` CLI command with subcommands:
//! - `list`: Show saved reports (private location, or both with `--all`)
//! - `view <id>`: Print a report
//! - `prune`: Remove reports older than the retention window
//! - `delete`: Remove reports from local storage
//! - `paths`: Show where reports are written

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Local};
use clap::Subcommand;
use oneui_crash::{format_bytes, ReportEntry, ReportStore};

use crate::output::{get_formatter, OutputFormat};
use crate::AppContext;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Report management subcommands
#[derive(Debug, Subcommand)]
pub enum ReportsCommand {
    /// List saved crash reports
    List {
        /// Include reports in the user-visible primary location
        #[arg(long)]
        all: bool,
    },
    /// View a specific report
    View {
        /// Report ID or filename fragment
        id: String,
    },
    /// Delete reports older than the retention window
    Prune {
        /// Retention window in days (defaults to the configured value)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Delete reports from local storage
    Delete {
        /// Specific report ID to delete
        id: Option<String>,
        /// Delete all reports
        #[arg(long)]
        all: bool,
    },
    /// Show the report directories
    Paths,
}

/// Which store an entry came from, for display.
struct Located {
    location: &'static str,
    entry: ReportEntry,
}

impl ReportsCommand {
    pub fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let reporter = ctx.reporter();
        let fallback = reporter.fallback_store();
        let primary = reporter.primary_store();

        match self {
            ReportsCommand::List { all } => {
                let mut located: Vec<Located> = fallback
                    .list()
                    .into_iter()
                    .map(|entry| Located {
                        location: "private",
                        entry,
                    })
                    .collect();
                if *all {
                    if let Some(store) = primary {
                        located.extend(store.list().into_iter().map(|entry| Located {
                            location: "primary",
                            entry,
                        }));
                    }
                }
                located.sort_by(|a, b| b.entry.modified.cmp(&a.entry.modified));

                if format.is_json() {
                    let json: Vec<serde_json::Value> = located
                        .iter()
                        .map(|l| {
                            serde_json::json!({
                                "id": l.entry.id,
                                "location": l.location,
                                "modified": format_modified(&l.entry),
                                "size_bytes": l.entry.size_bytes,
                                "path": l.entry.path.display().to_string(),
                            })
                        })
                        .collect();
                    formatter.print_json(&serde_json::json!(json));
                    return Ok(());
                }

                if located.is_empty() {
                    formatter.info("No reports found.");
                    return Ok(());
                }

                println!(
                    "{:<42} {:<8} {:<20} {:>10}",
                    "ID", "Location", "Modified", "Size"
                );
                println!("{}", "-".repeat(83));
                for l in &located {
                    println!(
                        "{:<42} {:<8} {:<20} {:>10}",
                        l.entry.id,
                        l.location,
                        format_modified(&l.entry),
                        format_bytes(l.entry.size_bytes),
                    );
                }
                println!();
                println!("Total: {} report(s)", located.len());
            }

            ReportsCommand::View { id } => {
                let stores = std::iter::once(fallback).chain(primary);
                let mut found = None;
                for store in stores {
                    if let Some(text) = store.read(id)? {
                        found = Some(text);
                        break;
                    }
                }

                match found {
                    Some(text) if format.is_json() => {
                        formatter.print_json(&serde_json::json!({ "id": id, "content": text }));
                    }
                    Some(text) => print!("{text}"),
                    None => formatter.error(&format!("Report '{}' not found", id)),
                }
            }

            ReportsCommand::Prune { days } => {
                let max_age = match days {
                    Some(d) => Duration::from_secs(u64::from(*d) * SECS_PER_DAY),
                    None => ctx.config.retention(),
                };
                let removed = prune_all(fallback, primary, max_age);

                if format.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "removed": removed,
                        "max_age_days": max_age.as_secs() / SECS_PER_DAY,
                    }));
                } else {
                    formatter.success(&format!(
                        "Removed {} report(s) older than {} day(s)",
                        removed,
                        max_age.as_secs() / SECS_PER_DAY
                    ));
                }
            }

            ReportsCommand::Delete { id, all } => {
                if *all {
                    let count = fallback.delete_all() + primary.map_or(0, |s| s.delete_all());
                    formatter.success(&format!("Deleted {} report(s)", count));
                } else if let Some(report_id) = id {
                    let mut deleted = fallback.delete(report_id)?;
                    if !deleted {
                        if let Some(store) = primary {
                            deleted = store.delete(report_id)?;
                        }
                    }
                    if deleted {
                        formatter.success(&format!("Deleted report '{}'", report_id));
                    } else {
                        formatter.error(&format!("Report '{}' not found", report_id));
                    }
                } else {
                    formatter.error("Specify a report ID or use --all");
                }
            }

            ReportsCommand::Paths => {
                formatter.path("primary", primary.map(|s| s.dir()));
                formatter.path("private", Some(fallback.dir()));
            }
        }

        Ok(())
    }
}

fn prune_all(fallback: &ReportStore, primary: Option<&ReportStore>, max_age: Duration) -> usize {
    fallback.prune_older_than(max_age) + primary.map_or(0, |s| s.prune_older_than(max_age))
}

fn format_modified(entry: &ReportEntry) -> String {
    DateTime::<Local>::from(entry.modified)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
