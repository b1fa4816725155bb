//! Crash reporter error types
//!
//! Errors raised while persisting or managing report files. None of these
//! ever escape the panic hook; they are logged and the hook moves on to the
//! next persistence tier or to delegation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while writing or managing crash reports
#[derive(Debug, Error)]
pub enum CrashError {
    /// No directory is configured for this persistence tier
    #[error("No report directory configured for the {0} location")]
    NoDirectory(&'static str),

    /// Creating the reports directory failed
    #[error("Failed to create report directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Writing the report file failed
    #[error("Failed to write report {path}: {source}")]
    Write {
        /// File that could not be written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Too many reports share the same timestamp-derived name
    #[error("Too many reports named {0} in the same millisecond")]
    NameExhausted(String),

    /// Any other I/O failure on a report file
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl CrashError {
    /// True when the failure was a permission problem rather than a missing
    /// or broken file system.
    pub fn is_permission_denied(&self) -> bool {
        match self {
            CrashError::CreateDir { source, .. }
            | CrashError::Write { source, .. }
            | CrashError::Io { source, .. } => {
                source.kind() == std::io::ErrorKind::PermissionDenied
            }
            _ => false,
        }
    }
}
