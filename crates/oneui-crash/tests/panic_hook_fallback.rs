//! Integration test: panic on two threads → fallback reports → previous hook
//!
//! The primary directory is unwritable, so both panics must land in the
//! private fallback directory as two distinct files, and the hook that was
//! registered before the reporter must still run for each panic.

mod common;

use std::sync::atomic::Ordering;

use common::{
    blocked_dir, install_counting_hook, panic_on_thread, stack_trace_section, FakePlatform,
};
use oneui_crash::{ConfigBuilder, CrashReporter, ReportStore};

#[test]
fn test_panics_on_two_threads_are_reported_separately() {
    let root = tempfile::tempdir().unwrap();
    let fallback_dir = root.path().join("crash_logs");
    let config = ConfigBuilder::new()
        .primary_dir(Some(blocked_dir(root.path(), "OneUI_CrashLogs")))
        .fallback_dir(fallback_dir.clone())
        .build();

    let previous_calls = install_counting_hook();
    CrashReporter::new(&config, FakePlatform).install();

    panic_on_thread("list-loader", "item 201 out of range");
    panic_on_thread("settings-writer", "preferences file locked");

    assert_eq!(previous_calls.load(Ordering::SeqCst), 2);

    let store = ReportStore::internal(fallback_dir);
    let entries = store.list();
    assert_eq!(entries.len(), 2, "expected two reports, got {entries:?}");
    assert_ne!(entries[0].path, entries[1].path);

    let texts: Vec<String> = entries
        .iter()
        .map(|e| std::fs::read_to_string(&e.path).unwrap())
        .collect();

    for (thread, message) in [
        ("list-loader", "item 201 out of range"),
        ("settings-writer", "preferences file locked"),
    ] {
        let text = texts
            .iter()
            .find(|t| t.contains(&format!("Thread: {thread}")))
            .unwrap_or_else(|| panic!("no report for thread {thread}"));

        assert!(text.contains("Type: panic (String payload)"));
        assert!(text.contains(&format!("Message: {message}")));
        assert!(!text.contains("Location: <unknown>"));
        assert!(!stack_trace_section(text).is_empty());
        assert!(text.contains("Package name: com.example.oneuiapp"));
        assert!(text.contains("Saved to the fallback location"));
        assert!(text.trim_end().ends_with("=== END OF REPORT ==="));
    }
}
