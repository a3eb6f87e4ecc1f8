//! Command-line and environment configuration.
//!
//! Every option can also be supplied through a `PHPAST_*` environment
//! variable; an explicit flag wins over the environment.

use clap::Parser;
use phpast_protocol::codec::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_RECORD_BYTES};
use phpast_protocol::driver::DEFAULT_MAX_TRANSPORT_FAILURES;
use phpast_protocol::{CodecOptions, WireFormat};
use phpast_syntax::AttributeMode;
use strum::{Display, EnumString};

/// Default tracing filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Supported logging output formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Human-readable single line output.
    Compact,
}

/// Runtime configuration for the driver process.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "phpast-driver",
    version,
    about = "Parses PHP source received on stdin and writes ASTs to stdout"
)]
pub struct Config {
    /// Wire format. `msgpack` selects MessagePack; anything else selects
    /// line-delimited JSON.
    #[arg(value_name = "FORMAT", env = "PHPAST_FORMAT")]
    format: Option<String>,
    /// Bytes requested per read when decoding MessagePack.
    #[arg(
        long,
        env = "PHPAST_CHUNK_SIZE",
        default_value_t = DEFAULT_CHUNK_SIZE,
        value_parser = parse_positive
    )]
    chunk_size: usize,
    /// Largest single record accepted, in bytes.
    #[arg(
        long,
        env = "PHPAST_MAX_RECORD_BYTES",
        default_value_t = DEFAULT_MAX_RECORD_BYTES,
        value_parser = parse_positive
    )]
    max_record_bytes: usize,
    /// Consecutive input read failures answered before giving up on stdin.
    #[arg(
        long,
        env = "PHPAST_MAX_TRANSPORT_FAILURES",
        default_value_t = DEFAULT_MAX_TRANSPORT_FAILURES,
        value_parser = parse_positive
    )]
    max_transport_failures: usize,
    /// Position attributes attached to AST nodes (`verbose` or `simplified`).
    #[arg(long, env = "PHPAST_ATTRIBUTES", default_value_t = AttributeMode::Verbose)]
    attributes: AttributeMode,
    /// Tracing filter expression, for example `phpast::codec=debug`.
    #[arg(long, env = "PHPAST_LOG", default_value = DEFAULT_LOG_FILTER)]
    log_filter: String,
    /// Log output format (`json` or `compact`).
    #[arg(long, env = "PHPAST_LOG_FORMAT", default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

impl Config {
    /// Returns the selected wire format.
    #[must_use]
    pub fn wire_format(&self) -> WireFormat {
        WireFormat::from_argument(self.format.as_deref())
    }

    /// Returns the codec tunables.
    #[must_use]
    pub const fn codec_options(&self) -> CodecOptions {
        CodecOptions {
            chunk_size: self.chunk_size,
            max_record_bytes: self.max_record_bytes,
        }
    }

    /// Returns how many consecutive read failures are tolerated.
    #[must_use]
    pub const fn max_transport_failures(&self) -> usize {
        self.max_transport_failures
    }

    /// Returns the AST attribute mode.
    #[must_use]
    pub const fn attributes(&self) -> AttributeMode {
        self.attributes
    }

    /// Returns the tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Returns the log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

fn parse_positive(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err(String::from("must be greater than zero")),
        Ok(parsed) => Ok(parsed),
        Err(error) => Err(error.to_string()),
    }
}
