//! Crash reporter
//!
//! [`CrashReporter::install`] replaces the process panic hook. When any
//! thread panics the hook builds a [`CrashReport`], writes it to the primary
//! directory (falling back to the private directory when that fails) and
//! then always hands the panic to the hook that was installed before it, so
//! the usual stderr message and process semantics are preserved.

use std::io::Write;
use std::panic::PanicHookInfo;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{error, info, warn};

use crate::config::{CrashConfig, OnCrash};
use crate::error::CrashError;
use crate::format::ReportDocument;
use crate::platform::PlatformInfo;
use crate::report::{capture_stack_trace, current_thread_name, CrashReport, Failure};
use crate::store::{ReportEntry, ReportStore};

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

/// Where a report ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Primary(PathBuf),
    Fallback(PathBuf),
    /// Both locations failed; the report was dropped.
    Lost,
}

impl PersistOutcome {
    pub fn path(&self) -> Option<&Path> {
        match self {
            PersistOutcome::Primary(p) | PersistOutcome::Fallback(p) => Some(p),
            PersistOutcome::Lost => None,
        }
    }
}

/// Captures unrecoverable failures and persists them as text reports.
pub struct CrashReporter {
    primary: Option<ReportStore>,
    fallback: ReportStore,
    platform: Box<dyn PlatformInfo>,
    capture_backtrace: bool,
    on_crash: OnCrash,
}

impl CrashReporter {
    pub fn new(config: &CrashConfig, platform: impl PlatformInfo + 'static) -> Self {
        Self {
            primary: config.reports.primary_dir.clone().map(ReportStore::new),
            fallback: ReportStore::internal(config.reports.fallback_dir.clone()),
            platform: Box::new(platform),
            capture_backtrace: config.reports.capture_backtrace,
            on_crash: config.reports.on_crash,
        }
    }

    /// Installs this reporter as the process panic hook.
    ///
    /// Must be called once, early in startup, before other threads exist.
    /// The hook that was registered before is kept and invoked after every
    /// report. With [`OnCrash::Exit`] the process then exits with status 1,
    /// making a panic on any thread fatal.
    pub fn install(self) {
        let previous: PanicHook = std::panic::take_hook();
        let on_crash = self.on_crash;

        info!(
            primary = ?self.primary.as_ref().map(|s| s.dir().display().to_string()),
            fallback = %self.fallback.dir().display(),
            ?on_crash,
            "Crash reporter installed"
        );

        std::panic::set_hook(Box::new(move |panic_info| {
            let stack_trace = capture_stack_trace(self.capture_backtrace);
            let failure = Failure::from_panic(panic_info, stack_trace);
            self.on_unrecoverable_failure(&current_thread_name(), failure);

            previous(panic_info);
            if on_crash == OnCrash::Exit {
                std::process::exit(1);
            }
        }));
    }

    /// Builds and persists a report for `failure` on `thread_name`.
    ///
    /// Never panics. Delegation to the previous hook is the caller's job;
    /// the installed hook always does it after this returns.
    pub fn on_unrecoverable_failure(&self, thread_name: &str, failure: Failure) -> PersistOutcome {
        error!(
            thread = %thread_name,
            kind = %failure.kind,
            failure_message = failure.message.as_deref().unwrap_or(""),
            location = failure.location.as_deref().unwrap_or(""),
            "Unrecoverable failure"
        );

        let report = self.capture(thread_name, failure);
        self.persist(&report)
    }

    /// Reports a fatal error value from the calling thread.
    pub fn report_fatal_error<E>(&self, err: &E) -> PersistOutcome
    where
        E: std::error::Error + ?Sized,
    {
        let failure = Failure::from_error(err, capture_stack_trace(self.capture_backtrace));
        self.on_unrecoverable_failure(&current_thread_name(), failure)
    }

    /// Assembles a report using the injected platform.
    pub fn capture(&self, thread_name: &str, failure: Failure) -> CrashReport {
        CrashReport::capture(self.platform.as_ref(), thread_name, failure)
    }

    /// Writes `report` to the primary location, then the fallback.
    pub fn persist(&self, report: &CrashReport) -> PersistOutcome {
        let primary = match &self.primary {
            Some(store) => write_report(store, report, "primary"),
            None => Err(CrashError::NoDirectory("primary")),
        };

        match primary {
            Ok(path) => {
                info!(path = %path.display(), "Crash report saved");
                return PersistOutcome::Primary(path);
            }
            Err(e) => warn!(
                error = %e,
                permission_denied = e.is_permission_denied(),
                "Primary crash report location unavailable, using fallback"
            ),
        }

        match write_report(&self.fallback, report, "fallback") {
            Ok(path) => {
                info!(path = %path.display(), "Crash report saved to fallback location");
                PersistOutcome::Fallback(path)
            }
            Err(e) => {
                error!(error = %e, "Failed to save crash report to fallback location");
                PersistOutcome::Lost
            }
        }
    }

    /// Reports persisted in the private fallback location, newest first.
    pub fn list_reports(&self) -> Vec<ReportEntry> {
        self.fallback.list()
    }

    /// Deletes fallback reports last modified more than `max_age` ago.
    pub fn prune_old_reports(&self, max_age: Duration) -> usize {
        let removed = self.fallback.prune_older_than(max_age);
        if removed > 0 {
            info!(removed, "Pruned old crash reports");
        }
        removed
    }

    pub fn primary_store(&self) -> Option<&ReportStore> {
        self.primary.as_ref()
    }

    pub fn fallback_store(&self) -> &ReportStore {
        &self.fallback
    }
}

fn write_report(
    store: &ReportStore,
    report: &CrashReport,
    location: &str,
) -> Result<PathBuf, CrashError> {
    let (mut file, path) = store.reserve(&report.timestamp)?;
    let text = ReportDocument {
        report,
        path: &path,
        location,
    }
    .to_string();

    let written = file
        .write_all(text.as_bytes())
        .and_then(|()| file.sync_all());
    if let Err(source) = written {
        drop(file);
        let _ = std::fs::remove_file(&path);
        return Err(CrashError::Write { path, source });
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::platform::{
        AppInfo, DeviceInfo, MemoryStats, Probe, ProcessInfo, Unavailable,
    };

    struct FakePlatform;

    impl PlatformInfo for FakePlatform {
        fn app_info(&self) -> Probe<AppInfo> {
            Err(Unavailable::new("package lookup failed"))
        }

        fn device_info(&self) -> DeviceInfo {
            DeviceInfo {
                model: Ok("Galaxy S23".to_string()),
                manufacturer: Ok("samsung".to_string()),
                os_version: Ok("14".to_string()),
                api_level: Ok("34".to_string()),
                cpu_arch: "arm64-v8a".to_string(),
                board: Ok("kalama".to_string()),
                build_id: Ok("UP1A".to_string()),
            }
        }

        fn memory_stats(&self) -> Probe<MemoryStats> {
            Ok(MemoryStats {
                max: 256 * 1024 * 1024,
                total: 2048,
                free: 512,
                used: 1536,
            })
        }

        fn process_info(&self) -> ProcessInfo {
            ProcessInfo {
                pid: 99,
                uid: Ok(10_001),
                locale: Ok("en_US".to_string()),
                timezone: Ok("Europe/Berlin".to_string()),
            }
        }
    }

    fn failure() -> Failure {
        Failure {
            kind: "panic (&str payload)".to_string(),
            message: Some("settings key missing".to_string()),
            root_cause: None,
            location: Some("src/settings.rs:42:13".to_string()),
            stack_trace: "0: oneui::settings::load\n1: oneui::main".to_string(),
        }
    }

    /// A path that can never be created as a directory.
    fn blocked_dir(root: &Path) -> PathBuf {
        let blocker = root.join("blocker");
        std::fs::write(&blocker, "file, not a directory").unwrap();
        blocker.join("reports")
    }

    #[test]
    fn test_persists_to_primary() {
        let root = tempfile::tempdir().unwrap();
        let config = ConfigBuilder::new()
            .primary_dir(Some(root.path().join("public")))
            .fallback_dir(root.path().join("private"))
            .build();
        let reporter = CrashReporter::new(&config, FakePlatform);

        let outcome = reporter.on_unrecoverable_failure("main", failure());
        let path = match &outcome {
            PersistOutcome::Primary(p) => p.clone(),
            other => panic!("expected primary, got {other:?}"),
        };
        assert!(path.starts_with(root.path().join("public")));

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Type: panic (&str payload)"));
        assert!(text.contains("Application info unavailable (package lookup failed)"));
        assert!(text.contains("Model: Galaxy S23"));
        assert!(text.contains("Used: 1.50 KB"));
        assert!(reporter.list_reports().is_empty());
    }

    #[test]
    fn test_falls_back_when_primary_unwritable() {
        let root = tempfile::tempdir().unwrap();
        let config = ConfigBuilder::new()
            .primary_dir(Some(blocked_dir(root.path())))
            .fallback_dir(root.path().join("private"))
            .build();
        let reporter = CrashReporter::new(&config, FakePlatform);

        let outcome = reporter.on_unrecoverable_failure("worker", failure());
        assert!(matches!(outcome, PersistOutcome::Fallback(_)));

        let reports = reporter.list_reports();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].id.ends_with("_internal"));

        let text = std::fs::read_to_string(&reports[0].path).unwrap();
        assert!(text.contains("Thread: worker"));
        assert!(text.contains("Message: settings key missing"));
        assert!(text.contains("0: oneui::settings::load"));
        assert!(text.contains("Saved to the fallback location"));
    }

    #[test]
    fn test_missing_primary_goes_to_fallback() {
        let root = tempfile::tempdir().unwrap();
        let config = ConfigBuilder::new()
            .primary_dir(None)
            .fallback_dir(root.path().join("private"))
            .build();
        let reporter = CrashReporter::new(&config, FakePlatform);

        let outcome = reporter.on_unrecoverable_failure("main", failure());
        assert!(matches!(outcome, PersistOutcome::Fallback(_)));
        assert!(outcome.path().unwrap().exists());
    }

    #[test]
    fn test_both_unwritable_is_lost_without_panicking() {
        let root = tempfile::tempdir().unwrap();
        let blocked = blocked_dir(root.path());
        let config = ConfigBuilder::new()
            .primary_dir(Some(blocked.join("public")))
            .fallback_dir(blocked.join("private"))
            .build();
        let reporter = CrashReporter::new(&config, FakePlatform);

        let outcome = reporter.on_unrecoverable_failure("main", failure());
        assert_eq!(outcome, PersistOutcome::Lost);
        assert!(outcome.path().is_none());
        assert!(reporter.list_reports().is_empty());
    }

    #[test]
    fn test_report_fatal_error_records_root_cause() {
        let root = tempfile::tempdir().unwrap();
        let config = ConfigBuilder::new()
            .primary_dir(None)
            .fallback_dir(root.path().to_path_buf())
            .capture_backtrace(false)
            .build();
        let reporter = CrashReporter::new(&config, FakePlatform);

        let err = CrashError::Write {
            path: PathBuf::from("/data/prefs.xml"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "no space left"),
        };
        let outcome = reporter.report_fatal_error(&err);
        let text = std::fs::read_to_string(outcome.path().unwrap()).unwrap();
        assert!(text.contains("Type: ") && text.contains("CrashError"));
        assert!(text.contains("Root cause: no space left"));
        assert!(text.contains(crate::report::BACKTRACE_DISABLED));
    }

    #[test]
    fn test_report_fatal_error_through_trait_object() {
        let root = tempfile::tempdir().unwrap();
        let config = ConfigBuilder::new()
            .primary_dir(None)
            .fallback_dir(root.path().to_path_buf())
            .capture_backtrace(false)
            .build();
        let reporter = CrashReporter::new(&config, FakePlatform);

        let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(CrashError::Write {
            path: PathBuf::from("/data/prefs.xml"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "no space left"),
        });
        let outcome = reporter.report_fatal_error(&*boxed);
        let text = std::fs::read_to_string(outcome.path().unwrap()).unwrap();
        assert!(text.contains("Type: Write\n"));
        assert!(!text.contains("Type: dyn"));
        assert!(text.contains("Root cause: no space left"));
    }

    #[derive(Clone, Default)]
    struct LogBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_failure_log_fields_are_not_panic_specific() {
        let root = tempfile::tempdir().unwrap();
        let config = ConfigBuilder::new()
            .primary_dir(None)
            .fallback_dir(root.path().to_path_buf())
            .capture_backtrace(false)
            .build();
        let reporter = CrashReporter::new(&config, FakePlatform);

        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            let err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
            reporter.report_fatal_error(&err);
        });

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Unrecoverable failure"));
        assert!(output.contains("failure_message="));
        assert!(output.contains("disk full"));
        assert!(!output.contains("panic_message"));
    }

    #[test]
    fn test_list_and_prune_on_missing_dir() {
        let config = ConfigBuilder::new()
            .primary_dir(None)
            .fallback_dir(PathBuf::from("/nonexistent/oneui/crash_logs"))
            .build();
        let reporter = CrashReporter::new(&config, FakePlatform);
        assert!(reporter.list_reports().is_empty());
        assert_eq!(reporter.prune_old_reports(Duration::from_secs(60)), 0);
    }
}
