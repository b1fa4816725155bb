//! Local report storage
//!
//! Manages the crash report files in one directory: reserving a fresh file
//! name for a new report, listing, reading, deleting and pruning.
//!
//! File names follow `crash_<YYYY-MM-DD_HH-MM-SS-mmm>[_<n>]<suffix>.txt`.
//! Names are claimed with create-new semantics so two reports written in the
//! same millisecond never overwrite each other.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local};
use tracing::debug;

use crate::error::CrashError;

/// Every report file name starts with this prefix.
pub const FILE_PREFIX: &str = "crash_";
/// Every report file name ends with this extension.
pub const FILE_EXTENSION: &str = "txt";
/// Suffix marking reports written to the private fallback directory.
pub const INTERNAL_SUFFIX: &str = "_internal";

/// Upper bound on `_<n>` disambiguation attempts per timestamp.
const MAX_NAME_ATTEMPTS: u32 = 100;

/// Entry in the local report store
#[derive(Debug, Clone)]
pub struct ReportEntry {
    /// File stem, e.g. `crash_2026-10-16_09-30-12-044`
    pub id: String,
    pub modified: SystemTime,
    pub size_bytes: u64,
    pub path: PathBuf,
}

/// Manages one directory of crash report files.
#[derive(Debug, Clone)]
pub struct ReportStore {
    reports_dir: PathBuf,
    suffix: &'static str,
}

impl ReportStore {
    /// Creates a store for the user-visible report directory.
    pub fn new(reports_dir: PathBuf) -> Self {
        Self {
            reports_dir,
            suffix: "",
        }
    }

    /// Creates a store whose new files carry the `_internal` suffix.
    pub fn internal(reports_dir: PathBuf) -> Self {
        Self {
            reports_dir,
            suffix: INTERNAL_SUFFIX,
        }
    }

    /// Returns the reports directory path.
    pub fn dir(&self) -> &Path {
        &self.reports_dir
    }

    /// Creates a new, empty report file named after `timestamp`.
    ///
    /// Creates the directory if needed. On a name collision a `_1`, `_2`, ...
    /// suffix is appended until a free name is found.
    pub fn reserve(&self, timestamp: &DateTime<Local>) -> Result<(File, PathBuf), CrashError> {
        std::fs::create_dir_all(&self.reports_dir).map_err(|source| CrashError::CreateDir {
            path: self.reports_dir.clone(),
            source,
        })?;

        let stamp = timestamp.format("%Y-%m-%d_%H-%M-%S-%3f");
        let base = format!("{FILE_PREFIX}{stamp}");

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                format!("{base}{}.{FILE_EXTENSION}", self.suffix)
            } else {
                format!("{base}_{attempt}{}.{FILE_EXTENSION}", self.suffix)
            };
            let path = self.reports_dir.join(name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((file, path)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(source) => return Err(CrashError::Write { path, source }),
            }
        }

        Err(CrashError::NameExhausted(base))
    }

    /// List all report files in the store, newest first.
    ///
    /// A missing or unreadable directory yields an empty list; entries whose
    /// metadata cannot be read are skipped.
    pub fn list(&self) -> Vec<ReportEntry> {
        let Ok(read_dir) = std::fs::read_dir(&self.reports_dir) else {
            return Vec::new();
        };

        let mut entries: Vec<ReportEntry> = read_dir
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let path = entry.path();
                if !is_report_file(&path) {
                    return None;
                }
                let metadata = entry.metadata().ok()?;
                if !metadata.is_file() {
                    return None;
                }
                Some(ReportEntry {
                    id: path.file_stem()?.to_string_lossy().to_string(),
                    modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                    size_bytes: metadata.len(),
                    path,
                })
            })
            .collect();

        entries.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.id.cmp(&a.id)));
        entries
    }

    /// Finds the first report whose id equals or contains `id`.
    pub fn find(&self, id: &str) -> Option<ReportEntry> {
        let entries = self.list();
        entries
            .iter()
            .find(|e| e.id == id)
            .or_else(|| entries.iter().find(|e| e.id.contains(id)))
            .cloned()
    }

    /// Read a report's text by its id (file stem match).
    pub fn read(&self, id: &str) -> Result<Option<String>, CrashError> {
        match self.find(id) {
            Some(entry) => std::fs::read_to_string(&entry.path)
                .map(Some)
                .map_err(|source| CrashError::Io {
                    path: entry.path,
                    source,
                }),
            None => Ok(None),
        }
    }

    /// Delete a report by its id.
    pub fn delete(&self, id: &str) -> Result<bool, CrashError> {
        match self.find(id) {
            Some(entry) => {
                std::fs::remove_file(&entry.path).map_err(|source| CrashError::Io {
                    path: entry.path,
                    source,
                })?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Delete all reports, returning how many were removed.
    pub fn delete_all(&self) -> u32 {
        let mut count = 0;
        for entry in self.list() {
            if std::fs::remove_file(&entry.path).is_ok() {
                count += 1;
            }
        }
        count
    }

    /// Delete every report last modified more than `max_age` ago.
    ///
    /// Best-effort: files that cannot be removed are skipped.
    pub fn prune_older_than(&self, max_age: Duration) -> usize {
        self.prune_older_than_at(max_age, SystemTime::now())
    }

    /// [`prune_older_than`](Self::prune_older_than) against an explicit clock.
    pub fn prune_older_than_at(&self, max_age: Duration, now: SystemTime) -> usize {
        let Some(cutoff) = now.checked_sub(max_age) else {
            return 0;
        };

        let mut removed = 0;
        for entry in self.list() {
            if entry.modified >= cutoff {
                continue;
            }
            match std::fs::remove_file(&entry.path) {
                Ok(()) => {
                    debug!(file = %entry.id, "Deleted old crash report");
                    removed += 1;
                }
                Err(e) => debug!(file = %entry.id, error = %e, "Skipping crash report"),
            }
        }
        removed
    }
}

fn is_report_file(path: &Path) -> bool {
    let name_ok = path
        .file_name()
        .map(|n| n.to_string_lossy().starts_with(FILE_PREFIX))
        .unwrap_or(false);
    name_ok && path.extension().is_some_and(|e| e == FILE_EXTENSION)
}
