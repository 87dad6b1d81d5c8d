use std::fmt;
use std::sync::Once;

use serde::{Deserialize, Serialize};

/// Initialize tracing/logging. Call once from the host before joining.
///
/// Honors `RUST_LOG`; otherwise logs this crate at debug level.
pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("chorus_core=debug"));
        // Another subscriber may already be installed by the host shell.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .try_init();
    });
}

/// Verbosity handed to the SDK logger.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    #[default]
    Warn,
    Error,
    Off,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        };
        f.write_str(s)
    }
}

/// Named logger passed to the SDK when a session is constructed.
///
/// SDK log lines below the configured level are dropped; the rest are
/// forwarded to `tracing` with the logger name attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkLogger {
    name: String,
    level: LogLevel,
}

impl SdkLogger {
    pub fn new(name: impl Into<String>, level: LogLevel) -> Self {
        Self {
            name: name.into(),
            level,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::Off && self.level != LogLevel::Off && level >= self.level
    }

    pub fn debug(&self, msg: &str) {
        if self.enabled(LogLevel::Debug) {
            tracing::debug!(logger = %self.name, "{msg}");
        }
    }

    pub fn info(&self, msg: &str) {
        if self.enabled(LogLevel::Info) {
            tracing::info!(logger = %self.name, "{msg}");
        }
    }

    pub fn warn(&self, msg: &str) {
        if self.enabled(LogLevel::Warn) {
            tracing::warn!(logger = %self.name, "{msg}");
        }
    }

    pub fn error(&self, msg: &str) {
        if self.enabled(LogLevel::Error) {
            tracing::error!(logger = %self.name, "{msg}");
        }
    }
}
