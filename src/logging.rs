use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
    Layer,
    Registry,
};

use crate::error::{FontPrintError, FontPrintResult};

/// Logging configuration for the fontprint binary
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub log_dir: PathBuf,
    pub enable_file_logging: bool,
    pub enable_json_format: bool,
    pub max_log_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
            enable_file_logging: false,
            enable_json_format: false,
            max_log_files: 10,
        }
    }
}

/// Initialize tracing. Keep the returned guard alive for the file writer to flush.
pub fn init_logging(config: &LoggingConfig) -> FontPrintResult<Option<WorkerGuard>> {
    if config.enable_file_logging {
        fs::create_dir_all(&config.log_dir)
            .map_err(|e| FontPrintError::file_io(config.log_dir.to_string_lossy().to_string(), e))?;
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fontprint={},{}", config.level, "warn")));

    // stdout carries command output, so the console layer writes to stderr
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .compact()
        .boxed();

    let registry = Registry::default().with(env_filter);

    let guard = if config.enable_file_logging {
        let file_appender = rolling::daily(&config.log_dir, "fontprint.log");
        let (file_writer, guard) = non_blocking(file_appender);

        let file_layer = if config.enable_json_format {
            fmt::layer().json().with_writer(file_writer).boxed()
        } else {
            fmt::layer().with_writer(file_writer).with_ansi(false).boxed()
        };

        registry
            .with(console_layer)
            .with(file_layer)
            .try_init()
            .map_err(|e| FontPrintError::configuration(format!("logging already initialized: {}", e)))?;
        Some(guard)
    } else {
        registry
            .with(console_layer)
            .try_init()
            .map_err(|e| FontPrintError::configuration(format!("logging already initialized: {}", e)))?;
        None
    };

    info!("Log level: {}", config.level);
    if config.enable_file_logging {
        info!("File logging enabled: {}", config.log_dir.display());
    }

    Ok(guard)
}

/// Timing for one pipeline run, reported on drop
pub struct PerformanceTimer {
    start: std::time::Instant,
    operation: String,
}

impl PerformanceTimer {
    pub fn start(operation: impl Into<String>) -> Self {
        let operation = operation.into();
        tracing::debug!("Starting: {}", operation);
        Self {
            start: std::time::Instant::now(),
            operation,
        }
    }

    pub fn checkpoint(&self, checkpoint: &str) {
        let elapsed = self.start.elapsed();
        tracing::debug!("{} - {}: {}us", self.operation, checkpoint, elapsed.as_micros());
    }
}

impl Drop for PerformanceTimer {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        info!("Completed {}: {}us", self.operation, elapsed.as_micros());
    }
}

/// Remove rotated log files beyond `max_log_files`, newest kept
pub fn cleanup_old_logs(config: &LoggingConfig) -> FontPrintResult<usize> {
    if !config.enable_file_logging || !config.log_dir.exists() {
        return Ok(0);
    }

    let dir_error = |e| FontPrintError::file_io(config.log_dir.to_string_lossy().to_string(), e);
    let mut log_files = Vec::new();

    for entry in fs::read_dir(&config.log_dir).map_err(dir_error)? {
        let path = entry.map_err(dir_error)?.path();
        let is_log = path
            .file_name()
            .and_then(|name| name.to_str())
            .map_or(false, |name| name.starts_with("fontprint.log"));
        if is_log {
            if let Ok(metadata) = fs::metadata(&path) {
                log_files.push((path, metadata.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH)));
            }
        }
    }

    // Sort by modification time (newest first)
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    let mut removed = 0;
    if log_files.len() > config.max_log_files {
        for (path, _) in &log_files[config.max_log_files..] {
            if let Err(e) = fs::remove_file(path) {
                warn!("Failed to remove old log file {}: {}", path.display(), e);
            } else {
                removed += 1;
            }
        }
    }

    Ok(removed)
}
