use crate::app::ports::ProgressLog;
use chrono::{Local, NaiveDateTime};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const PROGRESS_TIMESTAMP_FORMAT: &str = "%Y-%b-%d-%H:%M:%S";

/// Initializes the logging system with both console and file output.
pub fn init_logging() {
    // Ensure logs directory exists
    let _ = fs::create_dir_all("logs");

    // Create a non-blocking file appender for daily log rotation
    let file_appender = tracing_appender::rolling::daily("logs", "banks_etl.log");
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    // Create a JSON layer for file logging
    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);

    // Create a formatted layer for console logging
    let console_layer = fmt::layer().with_target(true).with_writer(std::io::stdout);

    // Respect RUST_LOG if set; otherwise info for our crate
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("banks_etl=info,warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    // We need to keep the guard alive so logs are flushed on exit
    std::mem::forget(guard);
}

/// Formats one progress-log line, without the trailing newline.
pub fn format_progress_entry(timestamp: NaiveDateTime, message: &str) -> String {
    format!("{} : {}", timestamp.format(PROGRESS_TIMESTAMP_FORMAT), message)
}

/// Appends timestamped progress lines to a plain-text file.
///
/// The file is opened and closed on every write so a crash never leaves a
/// buffered entry behind.
pub struct FileProgressLog {
    path: PathBuf,
}

impl FileProgressLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")
    }
}

impl ProgressLog for FileProgressLog {
    fn log(&self, message: &str) {
        tracing::info!(target: "banks_etl::progress", "{}", message);
        let line = format_progress_entry(Local::now().naive_local(), message);
        if let Err(e) = self.append(&line) {
            warn!("Failed to write progress log {}: {}", self.path.display(), e);
        }
    }
}
