//! Process-wide tracing setup for the hiring service.
//!
//! Pipeline code logs through `tracing` with structured fields (`application_id`,
//! `job_id`, `performed_by`, ...). This module only decides which of those events reach
//! stdout and how they are rendered.

use crate::config::{LogFormat, TelemetryConfig};
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::{fmt as log_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Always appended to the configured level so transport internals stay quiet.
const QUIET_DEPENDENCIES: &[&str] = &["hyper=warn", "h2=warn", "tower=warn"];

#[derive(Debug)]
pub enum TelemetryError {
    InvalidFilter { directives: String, source: ParseError },
    AlreadyInstalled(tracing_subscriber::util::TryInitError),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::InvalidFilter { directives, .. } => {
                write!(f, "log filter '{directives}' is not a valid tracing directive")
            }
            TelemetryError::AlreadyInstalled(err) => {
                write!(f, "could not install tracing subscriber: {err}")
            }
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::InvalidFilter { source, .. } => Some(source),
            TelemetryError::AlreadyInstalled(err) => Some(err),
        }
    }
}

/// Directive string the subscriber filters with. A non-empty `RUST_LOG` replaces the
/// configured level entirely.
pub fn filter_directives(rust_log: Option<&str>, config: &TelemetryConfig) -> String {
    match rust_log.map(str::trim).filter(|value| !value.is_empty()) {
        Some(explicit) => explicit.to_string(),
        None => std::iter::once(config.log_level.trim())
            .chain(QUIET_DEPENDENCIES.iter().copied())
            .collect::<Vec<_>>()
            .join(","),
    }
}

fn build_filter(directives: String) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(&directives)
        .map_err(|source| TelemetryError::InvalidFilter { directives, source })
}

/// Installs the global subscriber in the configured format.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(filter_directives(rust_log.as_deref(), config))?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Compact => registry
            .with(log_fmt::layer().compact().with_target(false).with_ansi(false))
            .try_init(),
        LogFormat::Pretty => registry.with(log_fmt::layer().pretty()).try_init(),
        LogFormat::Json => registry
            .with(
                log_fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(false),
            )
            .try_init(),
    };
    installed.map_err(TelemetryError::AlreadyInstalled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(level: &str) -> TelemetryConfig {
        TelemetryConfig {
            log_level: level.to_string(),
            format: LogFormat::Compact,
        }
    }

    #[test]
    fn configured_level_keeps_dependencies_quiet() {
        let directives = filter_directives(None, &config("debug"));
        assert_eq!(directives, "debug,hyper=warn,h2=warn,tower=warn");
        assert!(build_filter(directives).is_ok());
    }

    #[test]
    fn rust_log_overrides_the_configured_level() {
        let directives = filter_directives(Some("hiring_pipeline=trace"), &config("info"));
        assert_eq!(directives, "hiring_pipeline=trace");

        let blank = filter_directives(Some("   "), &config("warn"));
        assert!(blank.starts_with("warn,"));
    }

    #[test]
    fn malformed_level_is_reported_with_its_directives() {
        let error = build_filter(filter_directives(None, &config("hiring_pipeline=loudest")))
            .expect_err("filter rejected");
        assert!(error.to_string().contains("hiring_pipeline=loudest"));
    }
}
