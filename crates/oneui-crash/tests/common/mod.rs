//! Shared helpers for the panic hook integration tests
//!
//! The panic hook is process-global, so each scenario lives in its own test
//! binary and installs the reporter exactly once.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use oneui_crash::platform::{
    AppInfo, DeviceInfo, MemoryStats, PlatformInfo, Probe, ProcessInfo,
};

/// Deterministic platform identity.
pub struct FakePlatform;

impl PlatformInfo for FakePlatform {
    fn app_info(&self) -> Probe<AppInfo> {
        Ok(AppInfo::from_semver("com.example.oneuiapp", "1.0.0"))
    }

    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            model: Ok("SM-A546B".to_string()),
            manufacturer: Ok("samsung".to_string()),
            os_version: Ok("14".to_string()),
            api_level: Ok("34".to_string()),
            cpu_arch: "arm64-v8a".to_string(),
            board: Ok("s5e8835".to_string()),
            build_id: Ok("UP1A.231005.007".to_string()),
        }
    }

    fn memory_stats(&self) -> Probe<MemoryStats> {
        Ok(MemoryStats {
            max: 512 * 1024 * 1024,
            total: 64 * 1024 * 1024,
            free: 8 * 1024 * 1024,
            used: 56 * 1024 * 1024,
        })
    }

    fn process_info(&self) -> ProcessInfo {
        ProcessInfo {
            pid: std::process::id(),
            uid: Ok(10_200),
            locale: Ok("en_GB".to_string()),
            timezone: Ok("Europe/London".to_string()),
        }
    }
}

/// A directory path that cannot be created because its parent is a file.
pub fn blocked_dir(root: &Path, name: &str) -> PathBuf {
    let blocker = root.join(format!("{name}-blocker"));
    std::fs::write(&blocker, "file, not a directory").unwrap();
    blocker.join(name)
}

/// Installs a panic hook that only counts invocations, standing in for
/// whatever the host had registered before the reporter.
pub fn install_counting_hook() -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    std::panic::set_hook(Box::new(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    }));
    count
}

/// Spawns a named thread that panics with `message` and waits for it.
pub fn panic_on_thread(name: &str, message: &'static str) {
    let result = std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || panic!("{}", message))
        .unwrap()
        .join();
    assert!(result.is_err(), "thread {name} should have panicked");
}

/// Text between the stack trace heading and the next section.
pub fn stack_trace_section(report: &str) -> &str {
    let start = report
        .find("=== STACK TRACE ===")
        .expect("stack trace heading")
        + "=== STACK TRACE ===".len();
    let end = report[start..]
        .find("=== MEMORY ===")
        .expect("memory heading")
        + start;
    report[start..end].trim()
}
