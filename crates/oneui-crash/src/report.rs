//! Crash report model
//!
//! A [`CrashReport`] is assembled once, inside the panic hook, and never
//! changes afterwards. It holds everything needed to read the failure later
//! without access to the crashed process.

use std::backtrace::Backtrace;
use std::error::Error;
use std::panic::PanicHookInfo;

use chrono::{DateTime, Local};

use crate::platform::{AppInfo, DeviceInfo, MemoryStats, PlatformInfo, Probe, ProcessInfo};

/// Stack trace text used when backtrace capture is turned off.
pub const BACKTRACE_DISABLED: &str = "<backtrace capture disabled in configuration>";

/// What went wrong
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Failure taxonomy, e.g. `panic` or a Rust error type name
    pub kind: String,
    pub message: Option<String>,
    /// Innermost error in the source chain, if any
    pub root_cause: Option<String>,
    /// `file:line:column` of the panic site
    pub location: Option<String>,
    pub stack_trace: String,
}

impl Failure {
    /// Captures a panic from the hook's [`PanicHookInfo`].
    pub fn from_panic(info: &PanicHookInfo<'_>, stack_trace: String) -> Self {
        let payload = info.payload();
        let (kind, message) = if let Some(s) = payload.downcast_ref::<&str>() {
            ("panic (&str payload)", Some(s.to_string()))
        } else if let Some(s) = payload.downcast_ref::<String>() {
            ("panic (String payload)", Some(s.clone()))
        } else {
            ("panic (non-string payload)", None)
        };

        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));

        Self {
            kind: kind.to_string(),
            message,
            root_cause: None,
            location,
            stack_trace,
        }
    }

    /// Captures a fatal error value and its `source()` chain.
    pub fn from_error<E>(err: &E, stack_trace: String) -> Self
    where
        E: Error + ?Sized,
    {
        let root_cause = std::iter::successors(err.source(), |e| (*e).source())
            .last()
            .map(|e| e.to_string());

        Self {
            kind: error_kind(err),
            message: Some(err.to_string()),
            root_cause,
            location: None,
            stack_trace,
        }
    }
}

/// Names the failure type of `err`.
///
/// Concrete types are named by their type path. Behind a trait object the
/// type path is only `dyn Error`, so the leading identifier of the `Debug`
/// output (the struct or enum variant name) is used instead.
fn error_kind<E>(err: &E) -> String
where
    E: Error + ?Sized,
{
    let name = std::any::type_name::<E>();
    if !name.starts_with("dyn ") {
        return name.to_string();
    }

    let debug = format!("{err:?}");
    let ident: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
        .collect();
    if ident.is_empty() {
        name.to_string()
    } else {
        ident
    }
}

/// Returns the current backtrace as text, or a marker when disabled.
pub fn capture_stack_trace(enabled: bool) -> String {
    if enabled {
        Backtrace::force_capture().to_string()
    } else {
        BACKTRACE_DISABLED.to_string()
    }
}

/// Name of the calling thread, or its id when it has no name.
pub fn current_thread_name() -> String {
    let thread = std::thread::current();
    match thread.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", thread.id()),
    }
}

/// A fully self-contained crash report
#[derive(Debug, Clone)]
pub struct CrashReport {
    pub timestamp: DateTime<Local>,
    pub thread_name: String,
    pub failure: Failure,
    pub app_info: Probe<AppInfo>,
    pub device_info: DeviceInfo,
    pub memory_stats: Probe<MemoryStats>,
    pub process_info: ProcessInfo,
}

impl CrashReport {
    /// Builds a report, querying `platform` for context at the moment of the
    /// call. Never fails: unavailable fields are recorded as such.
    pub fn capture(platform: &dyn PlatformInfo, thread_name: &str, failure: Failure) -> Self {
        Self {
            timestamp: Local::now(),
            thread_name: thread_name.to_string(),
            failure,
            app_info: platform.app_info(),
            device_info: platform.device_info(),
            memory_stats: platform.memory_stats(),
            process_info: platform.process_info(),
        }
    }
}
