//! Structured telemetry initialisation.
//!
//! Standard output carries protocol responses, so every subscriber writes to
//! standard error. Only one subscriber is ever installed per process; the
//! returned [`TelemetryHandle`] reports the format that actually won.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use phpast_protocol::driver::DRIVER_TARGET;
use tracing::{Subscriber, info, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::cli::{Config, LogFormat};

static INSTALLED_FORMAT: OnceCell<LogFormat> = OnceCell::new();

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured log filter expression is invalid.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Installing the tracing subscriber failed.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Proof that the process subscriber is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryHandle {
    log_format: LogFormat,
}

impl TelemetryHandle {
    /// Returns the format of the installed subscriber, which is the one
    /// requested by the first successful [`initialise`] call.
    #[must_use]
    pub const fn log_format(self) -> LogFormat {
        self.log_format
    }

    /// Records the codec and extractor settings the driver will run with.
    pub fn announce(self, config: &Config) {
        let options = config.codec_options();
        info!(
            target: DRIVER_TARGET,
            wire_format = config.wire_format().as_str(),
            chunk_size = options.chunk_size,
            max_record_bytes = options.max_record_bytes,
            max_transport_failures = config.max_transport_failures(),
            attributes = %config.attributes(),
            log_format = %self.log_format,
            "driver configured"
        );
    }
}

/// Installs the global tracing subscriber on first use.
///
/// Later calls leave the global state alone and return a handle describing
/// the subscriber already in place.
///
/// # Errors
///
/// Returns an error if the filter expression is invalid or another
/// subscriber was already installed outside this function.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED_FORMAT
        .get_or_try_init(|| install_subscriber(config))
        .map(|&log_format| TelemetryHandle { log_format })
}

pub(crate) fn parse_filter(expression: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(expression).map_err(|error| TelemetryError::Filter(error.to_string()))
}

fn install_subscriber(config: &Config) -> Result<LogFormat, TelemetryError> {
    let filter = parse_filter(config.log_filter())?;
    let log_format = config.log_format();

    let builder = |env_filter: EnvFilter| {
        fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(io::stderr)
            .with_ansi(io::stderr().is_terminal())
            .with_timer(fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match log_format {
        LogFormat::Json => Box::new(builder(filter).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder(filter).compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)?;
    Ok(log_format)
}
