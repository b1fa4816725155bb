//! Plain-text report rendering
//!
//! Reports are written for humans opening them in any text viewer. Sections
//! always appear in the same order and the file ends with an explicit marker
//! so a truncated write is easy to spot.

use std::fmt;
use std::path::Path;

use crate::platform::Probe;
use crate::report::CrashReport;

/// Last line of every report.
pub const END_MARKER: &str = "=== END OF REPORT ===";

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;

/// Formats a byte count with automatic unit scaling.
///
/// Below 1024 the exact count is shown; larger values use KB, MB or GB with
/// two decimal places.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    }
}

/// A report bound to the file it is being written to.
///
/// The header and the instructions reference the destination, so rendering
/// happens only once the path is known.
pub struct ReportDocument<'a> {
    pub report: &'a CrashReport,
    pub path: &'a Path,
    /// Human name of the location, e.g. `primary` or `fallback`
    pub location: &'a str,
}

impl fmt::Display for ReportDocument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.report;
        let dir = self.path.parent().unwrap_or(self.path);

        writeln!(f, "=== OneUI CRASH REPORT ===")?;
        writeln!(f, "Time: {}", r.timestamp.format("%Y-%m-%d %H:%M:%S%.3f %:z"))?;
        writeln!(f, "Thread: {}", r.thread_name)?;
        writeln!(f, "File path: {}", self.path.display())?;
        writeln!(f, "Saved to the {} location: {}", self.location, dir.display())?;
        writeln!(f)?;

        writeln!(f, "=== APPLICATION ===")?;
        match &r.app_info {
            Ok(app) => {
                writeln!(f, "Package name: {}", app.package_name)?;
                writeln!(f, "Version code: {}", app.version_code)?;
                writeln!(f, "Version name: {}", app.version_name)?;
            }
            Err(missing) => writeln!(f, "Application info {missing}")?,
        }
        writeln!(f)?;

        let d = &r.device_info;
        writeln!(f, "=== DEVICE ===")?;
        writeln!(f, "Model: {}", probe(&d.model))?;
        writeln!(f, "Manufacturer: {}", probe(&d.manufacturer))?;
        writeln!(f, "OS version: {}", probe(&d.os_version))?;
        writeln!(f, "API level: {}", probe(&d.api_level))?;
        writeln!(f, "Architecture: {}", d.cpu_arch)?;
        writeln!(f, "Board: {}", probe(&d.board))?;
        writeln!(f, "Build ID: {}", probe(&d.build_id))?;
        writeln!(f)?;

        let failure = &r.failure;
        writeln!(f, "=== FAILURE ===")?;
        writeln!(f, "Type: {}", failure.kind)?;
        writeln!(
            f,
            "Message: {}",
            failure.message.as_deref().unwrap_or("<no message>")
        )?;
        writeln!(
            f,
            "Root cause: {}",
            failure.root_cause.as_deref().unwrap_or("<not specified>")
        )?;
        writeln!(
            f,
            "Location: {}",
            failure.location.as_deref().unwrap_or("<unknown>")
        )?;
        writeln!(f)?;

        writeln!(f, "=== STACK TRACE ===")?;
        writeln!(f, "{}", failure.stack_trace.trim_end())?;
        writeln!(f)?;

        writeln!(f, "=== MEMORY ===")?;
        match &r.memory_stats {
            Ok(mem) => {
                writeln!(f, "Max available: {}", format_bytes(mem.max))?;
                writeln!(f, "Total reserved: {}", format_bytes(mem.total))?;
                writeln!(f, "Free (not resident): {}", format_bytes(mem.free))?;
                writeln!(f, "Used: {}", format_bytes(mem.used))?;
            }
            Err(missing) => writeln!(f, "Memory statistics {missing}")?,
        }
        writeln!(f)?;

        let p = &r.process_info;
        writeln!(f, "=== PROCESS ===")?;
        writeln!(f, "Process ID: {}", p.pid)?;
        writeln!(f, "User ID: {}", probe(&p.uid))?;
        writeln!(f, "Locale: {}", probe(&p.locale))?;
        writeln!(f, "Timezone: {}", probe(&p.timezone))?;
        writeln!(f)?;

        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        writeln!(f, "=== HOW TO FIND THIS FILE ===")?;
        writeln!(f, "1. Open a file manager or a terminal")?;
        writeln!(f, "2. Go to {}", dir.display())?;
        writeln!(f, "3. Look for {name}")?;
        writeln!(f, "4. Open it with any text viewer")?;
        writeln!(f, "5. Copy the contents and share them when asking for help")?;
        writeln!(f)?;

        writeln!(f, "{END_MARKER}")
    }
}

fn probe<T: fmt::Display>(value: &Probe<T>) -> String {
    match value {
        Ok(v) => v.to_string(),
        Err(missing) => missing.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{AppInfo, DeviceInfo, MemoryStats, ProcessInfo, Unavailable};
    use crate::report::Failure;

    fn sample_report(app: Probe<AppInfo>) -> CrashReport {
        CrashReport {
            timestamp: chrono::Local::now(),
            thread_name: "main".to_string(),
            failure: Failure {
                kind: "panic (&str payload)".to_string(),
                message: Some("index out of bounds".to_string()),
                root_cause: None,
                location: Some("src/list.rs:200:9".to_string()),
                stack_trace: "0: oneui::list::item\n1: oneui::main\n".to_string(),
            },
            app_info: app,
            device_info: DeviceInfo {
                model: Ok("SM-S918B".to_string()),
                manufacturer: Ok("samsung".to_string()),
                os_version: Ok("Android 14".to_string()),
                api_level: Ok("34".to_string()),
                cpu_arch: "aarch64".to_string(),
                board: Err(Unavailable::new("no board")),
                build_id: Ok("UP1A.231005.007".to_string()),
            },
            memory_stats: Ok(MemoryStats {
                max: 512 * MB,
                total: 64 * MB,
                free: 16 * MB,
                used: 48 * MB,
            }),
            process_info: ProcessInfo {
                pid: 4242,
                uid: Ok(10_123),
                locale: Ok("ar_SA".to_string()),
                timezone: Ok("Asia/Riyadh".to_string()),
            },
        }
    }

    #[test]
    fn test_format_bytes_scaling() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(5_242_880), "5.00 MB");
        assert_eq!(format_bytes(3_221_225_472), "3.00 GB");
    }

    #[test]
    fn test_sections_in_order() {
        let report = sample_report(Ok(AppInfo::from_semver("com.example.oneuiapp", "1.0.0")));
        let text = ReportDocument {
            report: &report,
            path: Path::new("/tmp/OneUI_CrashLogs/crash_x.txt"),
            location: "primary",
        }
        .to_string();

        let headings = [
            "=== OneUI CRASH REPORT ===",
            "=== APPLICATION ===",
            "=== DEVICE ===",
            "=== FAILURE ===",
            "=== STACK TRACE ===",
            "=== MEMORY ===",
            "=== PROCESS ===",
            "=== HOW TO FIND THIS FILE ===",
            END_MARKER,
        ];
        let positions: Vec<usize> = headings
            .iter()
            .map(|h| text.find(h).unwrap_or_else(|| panic!("missing {h}")))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(text.trim_end().ends_with(END_MARKER));
    }

    #[test]
    fn test_rendered_fields() {
        let report = sample_report(Ok(AppInfo::from_semver("com.example.oneuiapp", "1.2.3")));
        let text = ReportDocument {
            report: &report,
            path: Path::new("/data/crash_logs/crash_x_internal.txt"),
            location: "fallback",
        }
        .to_string();

        assert!(text.contains("File path: /data/crash_logs/crash_x_internal.txt"));
        assert!(text.contains("Saved to the fallback location: /data/crash_logs"));
        assert!(text.contains("Version code: 10203"));
        assert!(text.contains("Type: panic (&str payload)"));
        assert!(text.contains("Message: index out of bounds"));
        assert!(text.contains("Root cause: <not specified>"));
        assert!(text.contains("0: oneui::list::item"));
        assert!(text.contains("Max available: 512.00 MB"));
        assert!(text.contains("Free (not resident): 16.00 MB"));
        assert!(text.contains("Board: unavailable (no board)"));
        assert!(text.contains("3. Look for crash_x_internal.txt"));
    }

    #[test]
    fn test_unavailable_app_info_is_a_placeholder() {
        let report = sample_report(Err(Unavailable::new("not configured")));
        let text = ReportDocument {
            report: &report,
            path: Path::new("/tmp/crash.txt"),
            location: "primary",
        }
        .to_string();
        assert!(text.contains("Application info unavailable (not configured)"));
        assert!(text.contains("=== DEVICE ==="));
    }
}
