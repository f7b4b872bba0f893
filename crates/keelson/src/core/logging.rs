//! Logging setup for the reconstruction pipeline
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the embedding application. [`init_logging`] is the subscriber the CLI uses.
//!
//! Level and format resolve in this order: explicit argument, then
//! `KEELSON_LOG_LEVEL` / `KEELSON_LOG_FORMAT`, then `RUST_LOG` (level only),
//! then `info` / `compact`.
//!
//! Each pipeline stage runs inside its own span, so per-stage filtering works:
//!
//! ```bash
//! RUST_LOG="info,keelson::machine::history=trace" keelson validate -i door.mmd
//! ```

use std::str::FromStr;

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

/// Environment variable consulted for the log level
pub const LOG_LEVEL_ENV: &str = "KEELSON_LOG_LEVEL";

/// Environment variable consulted for the log format
pub const LOG_FORMAT_ENV: &str = "KEELSON_LOG_FORMAT";

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Single-line output
    #[default]
    Compact,
    /// Multi-line output with source locations
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

impl LogFormat {
    /// Get all valid format names
    pub fn variants() -> &'static [&'static str] {
        &["compact", "pretty", "json"]
    }
}

fn resolve_level(level: Option<&str>) -> String {
    level
        .map(str::to_string)
        .or_else(|| std::env::var(LOG_LEVEL_ENV).ok())
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_string())
}

fn resolve_format(format: Option<&str>) -> Result<LogFormat, String> {
    match format
        .map(str::to_string)
        .or_else(|| std::env::var(LOG_FORMAT_ENV).ok())
    {
        Some(name) => LogFormat::from_str(&name),
        None => Ok(LogFormat::default()),
    }
}

fn build_filter(level: &str) -> EnvFilter {
    if level == "off" {
        return EnvFilter::new("off");
    }
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a global `tracing-subscriber` for the given level and format
///
/// Returns an error for an unknown format or when a global subscriber has
/// already been installed.
pub fn init_logging(
    level: Option<&str>,
    format: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let format = resolve_format(format).map_err(|e| format!("Invalid log format: {}", e))?;
    let filter = build_filter(&resolve_level(level));

    // Logs go to stderr so stdout stays clean for DOT/JSON output.
    let registry = Registry::default().with(filter);
    match format {
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_span_events(FmtSpan::NONE),
            )
            .try_init()?,
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_file(true)
                    .with_line_number(true)
                    .with_span_events(FmtSpan::ACTIVE)
                    .pretty(),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_span_events(FmtSpan::CLOSE)
                    .json(),
            )
            .try_init()?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::from_str("compact").unwrap(), LogFormat::Compact);
        assert_eq!(LogFormat::from_str("Pretty").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("JSON").unwrap(), LogFormat::Json);
        assert!(LogFormat::from_str("yaml").is_err());
    }

    #[test]
    fn test_explicit_level_wins() {
        assert_eq!(resolve_level(Some("trace")), "trace");
    }

    #[test]
    fn test_explicit_format_wins() {
        assert_eq!(resolve_format(Some("json")).unwrap(), LogFormat::Json);
        assert!(resolve_format(Some("xml")).is_err());
    }
}
