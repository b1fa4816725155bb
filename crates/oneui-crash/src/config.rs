//! Configuration module for the crash reporter.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, validation, defaults, and a builder for programmatic use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::platform::AppInfo;

/// Name of the user-visible folder reports are written to.
pub const PRIMARY_FOLDER: &str = "OneUI_CrashLogs";

/// Default retention window for persisted reports, in days.
pub const DEFAULT_RETENTION_DAYS: u32 = 7;

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrashConfig {
    pub reports: ReportsConfig,
    pub app: AppConfig,
    pub logging: LoggingConfig,
}

/// What the hook does once the report has been persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnCrash {
    /// Hand the panic to the previously installed hook.
    #[default]
    Chain,
    /// Terminate the process with exit status 1.
    Exit,
}

/// Report persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    /// User-discoverable directory tried first. `None` skips straight to the
    /// fallback directory.
    pub primary_dir: Option<PathBuf>,
    /// Private directory used when the primary write fails.
    pub fallback_dir: PathBuf,
    /// Reports older than this many days are pruned at startup.
    pub retention_days: u32,
    /// Whether to capture a backtrace when a panic is reported.
    pub capture_backtrace: bool,
    pub on_crash: OnCrash,
}

/// Application identity written into each report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub package_name: Option<String>,
    pub version_code: Option<u64>,
    pub version_name: Option<String>,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl CrashConfig {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CrashConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`CrashConfig::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/oneui/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("oneui")
            .join("config.yaml")
    }

    /// Retention window as a [`Duration`].
    pub fn retention(&self) -> Duration {
        Duration::from_secs(u64::from(self.reports.retention_days) * 24 * 60 * 60)
    }

    /// Application identity from the `app` section.
    ///
    /// `None` unless a package name is configured. A missing version falls
    /// back to `0` / `"unknown"`.
    pub fn app_info(&self) -> Option<AppInfo> {
        let package_name = self.app.package_name.clone()?;
        Some(AppInfo {
            package_name,
            version_code: self.app.version_code.unwrap_or(0),
            version_name: self
                .app
                .version_name
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            primary_dir: dirs::download_dir().map(|d| d.join(PRIMARY_FOLDER)),
            fallback_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("oneui")
                .join("crash_logs"),
            retention_days: DEFAULT_RETENTION_DAYS,
            capture_backtrace: true,
            on_crash: OnCrash::Chain,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"reports.retention_days"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl CrashConfig {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- reports ---
        if self.reports.retention_days == 0 {
            errors.push(ValidationError {
                field: "reports.retention_days".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.reports.fallback_dir.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "reports.fallback_dir".into(),
                message: "must not be empty".into(),
            });
        }
        if self.reports.primary_dir.as_deref() == Some(self.reports.fallback_dir.as_path()) {
            errors.push(ValidationError {
                field: "reports.primary_dir".into(),
                message: "must differ from reports.fallback_dir".into(),
            });
        }

        // --- app ---
        if self.app.package_name.is_none()
            && (self.app.version_code.is_some() || self.app.version_name.is_some())
        {
            errors.push(ValidationError {
                field: "app.package_name".into(),
                message: "required when a version is set".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`CrashConfig`] programmatically.
///
/// Starts from [`CrashConfig::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use oneui_crash::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .fallback_dir(PathBuf::from("/var/lib/oneui/crash_logs"))
///     .retention_days(14)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: CrashConfig,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`CrashConfig::default`] values.
    pub fn new() -> Self {
        Self {
            config: CrashConfig::default(),
        }
    }

    // --- reports ---

    pub fn primary_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.config.reports.primary_dir = dir;
        self
    }

    pub fn fallback_dir(mut self, dir: PathBuf) -> Self {
        self.config.reports.fallback_dir = dir;
        self
    }

    pub fn retention_days(mut self, days: u32) -> Self {
        self.config.reports.retention_days = days;
        self
    }

    pub fn capture_backtrace(mut self, enabled: bool) -> Self {
        self.config.reports.capture_backtrace = enabled;
        self
    }

    pub fn on_crash(mut self, on_crash: OnCrash) -> Self {
        self.config.reports.on_crash = on_crash;
        self
    }

    // --- app ---

    pub fn app(mut self, app: &AppInfo) -> Self {
        self.config.app = AppConfig {
            package_name: Some(app.package_name.clone()),
            version_code: Some(app.version_code),
            version_name: Some(app.version_name.clone()),
        };
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`CrashConfig`].
    pub fn build(self) -> CrashConfig {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<CrashConfig, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
