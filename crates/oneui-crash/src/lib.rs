//! OneUI crash reporting
//!
//! Provides:
//! - `CrashReporter`: panic hook that captures and persists crash reports
//! - `CrashReport` / `Failure`: the captured failure and its context
//! - `PlatformInfo`: injected app/device/memory/process identity
//! - `ReportStore`: file-based report listing, reading and pruning
//! - `CrashConfig`: YAML configuration

pub mod config;
pub mod error;
pub mod format;
pub mod platform;
pub mod report;
pub mod reporter;
pub mod store;

pub use config::{ConfigBuilder, CrashConfig, OnCrash};
pub use error::CrashError;
pub use format::format_bytes;
pub use platform::{HostPlatform, PlatformInfo};
pub use report::{CrashReport, Failure};
pub use reporter::{CrashReporter, PersistOutcome};
pub use store::{ReportEntry, ReportStore};
