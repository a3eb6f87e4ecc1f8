//! Wire codecs and stream framing.
//!
//! Two capability-equivalent formats sit behind the [`Codec`] enum:
//!
//! - [`JsonLines`] - one JSON record per line, blank lines skipped
//! - [`MsgpackStream`] - concatenated MessagePack values read in fixed-size
//!   chunks and reassembled incrementally
//!
//! Both satisfy the same contract: [`Codec::encode`] and [`Codec::decode`]
//! convert single records, and [`Codec::pull`] is the only operation that
//! blocks on I/O.

mod frame;
mod json;
mod lossy;
mod msgpack;

use std::io::{self, BufRead};
use std::str::FromStr;

use crate::failure::Failure;
use crate::protocol::Record;

pub use self::json::JsonLines;
pub use self::msgpack::MsgpackStream;

/// Tracing target for codec events.
pub const CODEC_TARGET: &str = "phpast::codec";

/// Maximum container nesting accepted when encoding a record.
pub const MAX_DEPTH: usize = 512;

/// Default read size for the binary codec.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Default upper bound on the bytes buffered for a single record.
pub const DEFAULT_MAX_RECORD_BYTES: usize = 64 * 1024 * 1024;

/// One record as produced by a pull: either decoded, or the failure that
/// prevented decoding it.
pub type Decoded = Result<Record, Failure>;

/// Outcome of a single [`Codec::pull`].
#[derive(Debug, Clone, PartialEq)]
pub enum Pull {
    /// Zero or more records, in stream order.
    Records(Vec<Decoded>),
    /// The stream reached permanent end-of-input.
    End,
}

/// Wire format selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum WireFormat {
    /// Line-delimited JSON.
    #[default]
    Json,
    /// Buffered MessagePack.
    Msgpack,
}

impl WireFormat {
    /// Selects the format from the process-start argument.
    ///
    /// `msgpack` selects the binary codec; any other value, or none, selects
    /// line-delimited JSON.
    #[must_use]
    pub fn from_argument(argument: Option<&str>) -> Self {
        argument
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }

    /// Returns the lower-case identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Msgpack => "msgpack",
        }
    }
}

impl FromStr for WireFormat {
    type Err = Failure;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "msgpack" => Ok(Self::Msgpack),
            "json" => Ok(Self::Json),
            other => Err(Failure::validation(format!("unknown wire format '{other}'"))),
        }
    }
}

/// Tunables shared by both codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecOptions {
    /// Bytes requested per read by the binary codec.
    pub chunk_size: usize,
    /// Upper bound on the bytes buffered for a single record.
    pub max_record_bytes: usize,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_record_bytes: DEFAULT_MAX_RECORD_BYTES,
        }
    }
}

/// A wire codec selected at construction time.
#[derive(Debug)]
pub enum Codec {
    /// Line-delimited JSON.
    Json(JsonLines),
    /// Buffered MessagePack.
    Msgpack(MsgpackStream),
}

impl Codec {
    /// Creates a codec for the given format.
    #[must_use]
    pub fn new(format: WireFormat, options: CodecOptions) -> Self {
        match format {
            WireFormat::Json => Self::Json(JsonLines::new(options.max_record_bytes)),
            WireFormat::Msgpack => Self::Msgpack(MsgpackStream::new(
                options.chunk_size,
                options.max_record_bytes,
            )),
        }
    }

    /// Returns the active wire format.
    #[must_use]
    pub const fn format(&self) -> WireFormat {
        match self {
            Self::Json(_) => WireFormat::Json,
            Self::Msgpack(_) => WireFormat::Msgpack,
        }
    }

    /// Encodes one record.
    ///
    /// # Errors
    ///
    /// Returns an encoding [`Failure`] if the record nests deeper than
    /// [`MAX_DEPTH`] or the serializer rejects it.
    pub fn encode(&self, record: &Record) -> Result<Vec<u8>, Failure> {
        ensure_depth(record, MAX_DEPTH)?;
        match self {
            Self::Json(_) => JsonLines::encode(record),
            Self::Msgpack(_) => MsgpackStream::encode(record),
        }
    }

    /// Decodes one record from a complete frame.
    ///
    /// # Errors
    ///
    /// Returns a decoding [`Failure`] if the bytes are malformed.
    pub fn decode(&self, bytes: &[u8]) -> Result<Record, Failure> {
        match self {
            Self::Json(_) => JsonLines::decode(bytes),
            Self::Msgpack(_) => MsgpackStream::decode(bytes),
        }
    }

    /// Reads from the stream until at least one record, end-of-input, or a
    /// read failure.
    ///
    /// The binary codec performs one read per call and may return an empty
    /// batch when the chunk did not complete a record.
    ///
    /// # Errors
    ///
    /// Returns a transport [`Failure`] if the underlying read fails.
    pub fn pull<R: BufRead>(&mut self, reader: &mut R) -> Result<Pull, Failure> {
        match self {
            Self::Json(codec) => codec.pull(reader),
            Self::Msgpack(codec) => codec.pull(reader),
        }
    }

    /// Discards buffered bytes that never formed a complete record and
    /// returns how many were dropped.
    pub fn drain(&mut self) -> usize {
        match self {
            Self::Json(_) => 0,
            Self::Msgpack(codec) => codec.drain(),
        }
    }
}

/// Rejects records whose container nesting exceeds `limit`.
///
/// Scalars add no depth; each array or map adds one level. The walk uses an
/// explicit stack so adversarial nesting cannot exhaust the call stack.
pub(crate) fn ensure_depth(record: &Record, limit: usize) -> Result<(), Failure> {
    let mut pending: Vec<(&Record, usize)> = vec![(record, 1)];
    while let Some((value, depth)) = pending.pop() {
        let next = depth.saturating_add(1);
        match value {
            Record::Array(items) => {
                check_level(depth, limit)?;
                pending.extend(items.iter().map(|child| (child, next)));
            }
            Record::Object(fields) => {
                check_level(depth, limit)?;
                pending.extend(fields.values().map(|child| (child, next)));
            }
            Record::Null | Record::Bool(_) | Record::Number(_) | Record::String(_) => {}
        }
    }
    Ok(())
}

fn check_level(depth: usize, limit: usize) -> Result<(), Failure> {
    if depth > limit {
        return Err(Failure::encoding(format!(
            "Maximum stack depth exceeded: nesting exceeds {limit} levels"
        )));
    }
    Ok(())
}

/// Retries reads interrupted by signals.
pub(crate) fn read_with_retry<R: BufRead>(reader: &mut R, chunk: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(chunk) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
}
