//! Process-wide tracing setup shared by the Burrow binaries.

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;
use tracing::subscriber::{set_global_default, SetGlobalDefaultError};
use tracing_log::log::SetLoggerError;
use tracing_log::LogTracer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "info";

/// Output format of the log layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable, one event per line.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl Display for LogFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown log format '{0}', expected 'pretty' or 'json'")]
pub struct UnknownLogFormat(String);

impl FromStr for LogFormat {
    type Err = UnknownLogFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(UnknownLogFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to install log bridge: {0}")]
    LogBridge(#[from] SetLoggerError),
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
}

/// Installs the global subscriber: an `EnvFilter` read from `RUST_LOG`
/// (falling back to [`DEFAULT_FILTER`]) in front of a `fmt` layer, and a
/// `LogTracer` so records emitted through `log` reach the same output.
///
/// Must be called once per process.
pub fn init(format: LogFormat) -> Result<(), TelemetryError> {
    LogTracer::init()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = Registry::default().with(filter);

    match format {
        LogFormat::Pretty => set_global_default(registry.with(fmt::layer()))?,
        LogFormat::Json => set_global_default(registry.with(fmt::layer().json()))?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_log_formats() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::default().to_string(), "pretty");
    }

    #[test]
    fn second_init_is_rejected() {
        init(LogFormat::Json).unwrap();
        assert!(init(LogFormat::Pretty).is_err());
    }
}
