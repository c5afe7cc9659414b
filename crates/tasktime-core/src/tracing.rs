//! Tracing setup shared by the tasktime binaries.
//!
//! `RUST_LOG` always wins over the configured default level. Without it the
//! filter only enables the `tasktime*` crates, so dependency noise (hyper,
//! reqwest, rustls) stays quiet unless explicitly asked for.

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    /// Failed to set global subscriber
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    /// Failed to parse env filter directive
    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Output format for tracing logs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Multi-line human-readable format
    Pretty,
    /// Single-line format
    #[default]
    Compact,
    /// One JSON object per line
    Json,
}

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level for tasktime crates when RUST_LOG is not set
    pub default_level: Level,
    /// Output format for log messages
    pub output_format: TracingOutputFormat,
    /// Include file/line information
    pub include_location: bool,
    /// Include timestamps
    pub include_timestamp: bool,
    /// Emit span close events (with timings)
    pub include_span_events: bool,
    /// Explicit filter directive, overrides both RUST_LOG and default_level
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: Level::WARN,
            output_format: TracingOutputFormat::Compact,
            include_location: false,
            include_timestamp: false,
            include_span_events: false,
            env_filter: None,
        }
    }
}

impl TracingConfig {
    /// Config for interactive CLI commands. `debug` raises the level and adds
    /// source locations.
    #[must_use]
    pub fn cli(debug: bool) -> Self {
        if debug {
            Self {
                default_level: Level::DEBUG,
                include_location: true,
                ..Self::default()
            }
        } else {
            Self::default()
        }
    }

    /// Config for the long-running HTTP server.
    #[must_use]
    pub fn server(debug: bool) -> Self {
        Self {
            default_level: if debug { Level::DEBUG } else { Level::INFO },
            output_format: TracingOutputFormat::Compact,
            include_location: debug,
            include_timestamp: true,
            include_span_events: true,
            env_filter: None,
        }
    }

    /// Set the default log level
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    /// Set the output format
    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Set a custom env filter directive
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    fn default_directive(&self) -> String {
        ["tasktime", "tasktime_core", "tasktime_providers", "tasktime_server", "tasktime_client"]
            .iter()
            .map(|target| format!("{target}={}", self.default_level))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn build_filter(&self) -> Result<EnvFilter, TracingError> {
        match self.env_filter {
            Some(ref filter) => Ok(EnvFilter::try_new(filter)?),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.default_directive()))),
        }
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already set or the filter
/// directive is invalid.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let env_filter = config.build_filter()?;

    let span_events = if config.include_span_events {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_span_events(span_events);

    let layer = match (config.output_format, config.include_timestamp) {
        (TracingOutputFormat::Pretty, _) => layer.pretty().boxed(),
        (TracingOutputFormat::Json, _) => layer.json().boxed(),
        (TracingOutputFormat::Compact, true) => layer.compact().boxed(),
        (TracingOutputFormat::Compact, false) => layer.compact().without_time().boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(env_filter).with(layer);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_quiet_by_default() {
        let config = TracingConfig::cli(false);
        assert_eq!(config.default_level, Level::WARN);
        assert_eq!(config.output_format, TracingOutputFormat::Compact);
        assert!(!config.include_timestamp);
        assert!(!config.include_location);
    }

    #[test]
    fn cli_debug() {
        let config = TracingConfig::cli(true);
        assert_eq!(config.default_level, Level::DEBUG);
        assert!(config.include_location);
    }

    #[test]
    fn server_presets() {
        let config = TracingConfig::server(false);
        assert_eq!(config.default_level, Level::INFO);
        assert!(config.include_timestamp);
        assert!(config.include_span_events);
        assert_eq!(TracingConfig::server(true).default_level, Level::DEBUG);
    }

    #[test]
    fn default_directive_covers_all_crates() {
        let directive = TracingConfig::default().with_level(Level::TRACE).default_directive();
        assert!(directive.contains("tasktime_server=TRACE"));
        assert!(directive.contains("tasktime_providers=TRACE"));
    }

    #[test]
    fn explicit_filter_is_validated() {
        let config = TracingConfig::default().with_env_filter("tasktime=notalevel");
        assert!(matches!(config.build_filter(), Err(TracingError::EnvFilter(_))));

        let config = TracingConfig::default()
            .with_format(TracingOutputFormat::Json)
            .with_env_filter("tasktime_server=debug");
        assert!(config.build_filter().is_ok());
        assert_eq!(config.output_format, TracingOutputFormat::Json);
    }
}
