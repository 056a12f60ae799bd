//! Structured logging setup for providers
//!
//! Terraform owns the provider's stdout, so all log output goes to stderr.
//! The level follows `TF_LOG` the same way Terraform itself reads it.

use std::env;
use std::str::FromStr;
use tracing::Level;

/// Log level understood by Terraform's `TF_LOG`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    /// Level from `TF_LOG`, defaulting to Info when unset or unrecognised
    pub fn from_env() -> Self {
        env::var("TF_LOG")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(LogLevel::Info)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" | "json" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

/// Install a stderr fmt subscriber at the given level
///
/// Returns false if a global subscriber was already installed, which makes
/// repeated calls from tests harmless.
pub fn init(level: LogLevel) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(level.as_tracing_level())
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .is_ok()
}

pub fn init_from_env() -> bool {
    init(LogLevel::from_env())
}
