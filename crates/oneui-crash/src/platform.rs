//! Host platform identity
//!
//! The reporter never talks to the operating system directly. Everything it
//! knows about the application, the device and the running process comes
//! through the [`PlatformInfo`] capability, so tests can swap in fakes.
//!
//! Every lookup that can fail returns a [`Probe`]. A failed probe degrades
//! that one field to a placeholder instead of aborting report construction.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Marker for a field that could not be collected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unavailable {
    pub reason: String,
}

impl Unavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unavailable ({})", self.reason)
    }
}

/// Result of a best-effort lookup.
pub type Probe<T> = Result<T, Unavailable>;

/// Application identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    pub package_name: String,
    pub version_code: u64,
    pub version_name: String,
}

impl AppInfo {
    /// Builds app identity from a crate name and semver string.
    ///
    /// The version code packs `major.minor.patch` as
    /// `major * 10_000 + minor * 100 + patch`.
    pub fn from_semver(package_name: &str, version: &str) -> Self {
        let mut parts = version
            .split(|c| c == '.' || c == '-' || c == '+')
            .map(|p| p.parse::<u64>().unwrap_or(0));
        let major = parts.next().unwrap_or(0);
        let minor = parts.next().unwrap_or(0);
        let patch = parts.next().unwrap_or(0);

        Self {
            package_name: package_name.to_string(),
            version_code: major
                .saturating_mul(10_000)
                .saturating_add(minor.saturating_mul(100))
                .saturating_add(patch),
            version_name: version.to_string(),
        }
    }
}

/// Device identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub model: Probe<String>,
    pub manufacturer: Probe<String>,
    pub os_version: Probe<String>,
    /// Platform API level. On Linux this is the kernel release.
    pub api_level: Probe<String>,
    pub cpu_arch: String,
    pub board: Probe<String>,
    pub build_id: Probe<String>,
}

/// Memory figures in bytes at capture time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    /// Upper bound the process could grow to
    pub max: u64,
    /// Memory currently reserved by the process
    pub total: u64,
    /// Reserved address space that is not resident (`total - used`).
    /// This is not free heap.
    pub free: u64,
    /// Resident memory
    pub used: u64,
}

/// Process identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub uid: Probe<u32>,
    pub locale: Probe<String>,
    pub timezone: Probe<String>,
}

/// Read-only capability supplying host identity to the reporter.
///
/// Implementations must not panic: they run inside the panic hook, where a
/// second panic aborts the process.
pub trait PlatformInfo: Send + Sync {
    fn app_info(&self) -> Probe<AppInfo>;
    fn device_info(&self) -> DeviceInfo;
    fn memory_stats(&self) -> Probe<MemoryStats>;
    fn process_info(&self) -> ProcessInfo;
}

/// [`PlatformInfo`] backed by the running host.
///
/// App identity cannot be discovered at runtime and must be supplied by the
/// embedding application; without it the app section reports unavailable.
#[derive(Debug, Clone, Default)]
pub struct HostPlatform {
    app: Option<AppInfo>,
}

impl HostPlatform {
    pub fn new(app: Option<AppInfo>) -> Self {
        Self { app }
    }
}

impl PlatformInfo for HostPlatform {
    fn app_info(&self) -> Probe<AppInfo> {
        self.app
            .clone()
            .ok_or_else(|| Unavailable::new("application identity not configured"))
    }

    fn device_info(&self) -> DeviceInfo {
        let os_release = std::fs::read_to_string("/etc/os-release").ok();
        let os_field = |key: &str| -> Probe<String> {
            os_release
                .as_deref()
                .and_then(|text| os_release_value(text, key))
                .ok_or_else(|| Unavailable::new(format!("{key} not found in /etc/os-release")))
        };

        DeviceInfo {
            model: read_trimmed(Path::new("/sys/devices/virtual/dmi/id/product_name")),
            manufacturer: read_trimmed(Path::new("/sys/devices/virtual/dmi/id/sys_vendor")),
            os_version: os_field("PRETTY_NAME").or_else(|_| Ok(std::env::consts::OS.to_string())),
            api_level: read_trimmed(Path::new("/proc/sys/kernel/osrelease")),
            cpu_arch: std::env::consts::ARCH.to_string(),
            board: read_trimmed(Path::new("/sys/devices/virtual/dmi/id/board_name")),
            build_id: os_field("BUILD_ID").or_else(|_| os_field("VERSION_ID")),
        }
    }

    fn memory_stats(&self) -> Probe<MemoryStats> {
        let status = std::fs::read_to_string("/proc/self/status")
            .map_err(|e| Unavailable::new(format!("/proc/self/status: {e}")))?;
        let total = kb_field(&status, "VmSize:")
            .ok_or_else(|| Unavailable::new("VmSize missing from /proc/self/status"))?;
        let used = kb_field(&status, "VmRSS:")
            .ok_or_else(|| Unavailable::new("VmRSS missing from /proc/self/status"))?;

        let max = std::fs::read_to_string("/proc/meminfo")
            .ok()
            .and_then(|meminfo| kb_field(&meminfo, "MemTotal:"))
            .unwrap_or(total);

        Ok(MemoryStats {
            max,
            total,
            free: total.saturating_sub(used),
            used,
        })
    }

    fn process_info(&self) -> ProcessInfo {
        ProcessInfo {
            pid: std::process::id(),
            uid: current_uid(),
            locale: current_locale(),
            timezone: Ok(current_timezone()),
        }
    }
}

fn read_trimmed(path: &Path) -> Probe<String> {
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|e| Unavailable::new(format!("{}: {e}", path.display())))
        .and_then(|s| {
            if s.is_empty() {
                Err(Unavailable::new(format!("{} is empty", path.display())))
            } else {
                Ok(s)
            }
        })
}

/// Looks up `KEY=value` in os-release text, stripping optional quotes.
fn os_release_value(text: &str, key: &str) -> Option<String> {
    text.lines().find_map(|line| {
        let (k, v) = line.split_once('=')?;
        if k.trim() != key {
            return None;
        }
        let v = v.trim().trim_matches('"').trim_matches('\'');
        (!v.is_empty()).then(|| v.to_string())
    })
}

/// Parses a `Name:   1234 kB` line from a /proc file into bytes.
fn kb_field(text: &str, name: &str) -> Option<u64> {
    text.lines()
        .find(|line| line.starts_with(name))
        .and_then(|line| line[name.len()..].split_whitespace().next())
        .and_then(|kb| kb.parse::<u64>().ok())
        .map(|kb| kb.saturating_mul(1024))
}

#[cfg(unix)]
fn current_uid() -> Probe<u32> {
    // SAFETY: getuid has no preconditions and cannot fail.
    Ok(unsafe { libc::getuid() })
}

#[cfg(not(unix))]
fn current_uid() -> Probe<u32> {
    Err(Unavailable::new("user id not supported on this platform"))
}

fn current_locale() -> Probe<String> {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.is_empty())
        .ok_or_else(|| Unavailable::new("LC_ALL, LC_MESSAGES and LANG are unset"))
}

/// Resolves the zone name from `TZ`, `/etc/timezone` or the `/etc/localtime`
/// symlink, falling back to the current UTC offset.
fn current_timezone() -> String {
    if let Ok(tz) = std::env::var("TZ") {
        let tz = tz.trim_start_matches(':');
        if !tz.is_empty() {
            return tz.to_string();
        }
    }

    if let Ok(tz) = read_trimmed(Path::new("/etc/timezone")) {
        return tz;
    }

    if let Ok(target) = std::fs::read_link("/etc/localtime") {
        let target = target.to_string_lossy().to_string();
        if let Some((_, zone)) = target.split_once("zoneinfo/") {
            return zone.to_string();
        }
    }

    chrono::Local::now().format("UTC%:z").to_string()
}
