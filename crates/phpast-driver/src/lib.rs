//! Process wiring for the PHP AST driver.
//!
//! The binary parses [`Config`], installs telemetry, builds a
//! [`PhpExtractor`] and a codec, and hands standard input and output to the
//! [`Driver`] loop. [`run`] holds everything after telemetry so tests can
//! drive it with in-memory streams.

pub mod cli;
pub mod telemetry;

#[cfg(test)]
mod tests;

use std::io::{BufRead, Write};

use phpast_protocol::{Codec, Driver, DriverError, RunSummary};
use phpast_syntax::{PhpExtractor, SyntaxError};
use thiserror::Error;

pub use cli::{Config, LogFormat};
pub use telemetry::{TelemetryError, TelemetryHandle};

/// Errors that stop the driver loop.
#[derive(Debug, Error)]
pub enum AppError {
    /// The PHP parser could not be initialised.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    /// The output stream failed.
    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Processes every request on `input` and writes responses to `output`.
///
/// # Errors
///
/// Returns an error if the parser cannot be created or the output stream
/// fails. Malformed requests are answered, not returned as errors.
pub fn run<R, W>(config: &Config, input: &mut R, output: &mut W) -> Result<RunSummary, AppError>
where
    R: BufRead,
    W: Write,
{
    let extractor = PhpExtractor::new(config.attributes())?;
    let codec = Codec::new(config.wire_format(), config.codec_options());
    let mut driver = Driver::new(codec, &extractor)
        .with_max_transport_failures(config.max_transport_failures());
    Ok(driver.run(input, output)?)
}
