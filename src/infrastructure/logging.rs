//! Logging system configuration and initialization
//!
//! Console and optional file logging with env-filter based level control.
//! Timestamps are rendered in IST (UTC+5:30) to match the target portal's
//! market; file output goes through a non-blocking daily-rolling appender
//! whose guard is kept alive for the process lifetime.

use anyhow::Result;
use chrono::{FixedOffset, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

// Global guard to keep the log file writer alive
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>> =
        Mutex::new(Vec::new());
}

/// Custom time formatter for IST (Indian Standard Time, UTC+5:30)
struct IstTimeFormatter;

impl FormatTime for IstTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        let ist_offset = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let ist_time = Utc::now().with_timezone(&ist_offset);
        write!(w, "{}", ist_time.format("%Y-%m-%d %H:%M:%S%.3f %Z"))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level when RUST_LOG is not set ("trace".."error")
    pub level: String,

    /// Also write logs to a rolling file under the log directory
    pub file_output: bool,

    /// Log file name prefix
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_output: false,
            file_prefix: "estate-certis".to_string(),
        }
    }
}

/// Get the log directory relative to the executable location
pub fn get_log_directory() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    exe_dir.join("logs")
}

/// Initialize the logging system with default configuration
pub fn init_logging() -> Result<()> {
    init_logging_with_config(LoggingConfig::default())
}

/// Initialize the logging system with the given configuration
pub fn init_logging_with_config(config: LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let console_layer = fmt::layer()
        .with_timer(IstTimeFormatter)
        .with_target(true)
        .with_ansi(true);

    if config.file_output {
        let log_dir = get_log_directory();
        std::fs::create_dir_all(&log_dir)?;

        let file_appender = rolling::daily(&log_dir, format!("{}.log", config.file_prefix));
        let (file_writer, guard) = non_blocking(file_appender);
        LOG_GUARDS
            .lock()
            .map_err(|_| anyhow::anyhow!("log guard mutex poisoned"))?
            .push(guard);

        let file_layer = fmt::layer()
            .with_timer(IstTimeFormatter)
            .with_target(true)
            .with_ansi(false)
            .with_writer(file_writer);

        Registry::default()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()?;

        info!("Logging initialized with file output at {}", log_dir.display());
    } else {
        Registry::default()
            .with(env_filter)
            .with(console_layer)
            .try_init()?;
    }

    Ok(())
}
