//! Logging setup
//!
//! Console output is compact text or JSON. An optional log file is written
//! through a rolling appender on a background worker.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::settings::LoggingSettings;

/// Log filter environment variable, checked before `RUST_LOG`
pub const LOG_ENV: &str = "VTO_LOG";
/// Set to "json" for JSON console output
pub const LOG_FORMAT_ENV: &str = "VTO_LOG_FORMAT";

/// How often the log file starts afresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogRotation {
    Hourly,
    #[default]
    Daily,
    Never,
}

impl LogRotation {
    /// Unknown names fall back to daily rotation
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "hourly" => Self::Hourly,
            "never" | "none" => Self::Never,
            _ => Self::Daily,
        }
    }

    fn as_rotation(self) -> Rotation {
        match self {
            Self::Hourly => Rotation::HOURLY,
            Self::Daily => Rotation::DAILY,
            Self::Never => Rotation::NEVER,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    pub console_enabled: bool,
    /// Log file; `None` keeps logs on the console only
    pub file_path: Option<PathBuf>,
    pub rotation: LogRotation,
    pub json_format: bool,
    /// Filter used when neither `VTO_LOG` nor `RUST_LOG` is set
    pub default_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::from_settings(&LoggingSettings::default())
    }
}

impl LogConfig {
    pub fn from_settings(settings: &LoggingSettings) -> Self {
        let level = settings.level.trim();
        Self {
            console_enabled: true,
            file_path: settings
                .file
                .as_deref()
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(PathBuf::from),
            rotation: LogRotation::parse(&settings.rotation),
            json_format: settings.json,
            default_level: if level.is_empty() { "info" } else { level }.to_string(),
        }
    }

    /// Directory and file-name prefix for the rolling appender
    fn file_target(&self) -> Option<(PathBuf, String)> {
        let path = self.file_path.as_ref()?;
        let prefix = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "vto-server.log".to_string());
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Some((dir, prefix))
    }
}

/// Install the global subscriber.
///
/// The returned guard flushes the log file when dropped, so keep it alive
/// until the program exits.
pub fn init_logging(
    config: &LogConfig,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .or_else(|_| EnvFilter::try_new(&config.default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(config.json_format);

    let (file_layer, file_guard) = match config.file_target() {
        Some((dir, prefix)) => {
            std::fs::create_dir_all(&dir)?;
            let appender = RollingFileAppender::new(config.rotation.as_rotation(), &dir, &prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let console = config.console_enabled;
    let json_layer = (console && use_json).then(|| {
        fmt::layer()
            .json()
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
    });
    let text_layer = (console && !use_json).then(|| fmt::layer().compact());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(json_layer)
        .with(text_layer)
        .try_init()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        json = use_json,
        file = ?config.file_path,
        rotation = ?config.rotation,
        "Logging initialized"
    );

    Ok(file_guard)
}

pub use tracing_appender::non_blocking::WorkerGuard as LogGuard;
