//! Buffered MessagePack codec.
//!
//! MessagePack values carry no length prefix for the record as a whole, so
//! record boundaries are discovered by walking markers after every appended
//! chunk. Only a complete frame is deserialized. A frame whose content has the
//! wrong shape still has a known extent, so it costs exactly one failure and
//! the stream carries on after it.
//!
//! Encoding uses `rmp_serde::to_vec_named` so structs are written as maps.

use std::io::{self, BufRead};

use bytes::{Buf, BytesMut};
use serde::Deserialize;
use tracing::{debug, warn};

use super::frame::{FrameScanner, Scan};
use super::lossy::LossyValue;
use super::{CODEC_TARGET, Decoded, Pull, read_with_retry};
use crate::failure::{Failure, WRONG_REQUEST_FORMAT};
use crate::protocol::Record;

/// A lone `0x0a` byte unpacks as the positive integer ten. Peers that frame
/// their requests the way responses are framed leave one between records.
const LINE_SEPARATOR: u64 = 10;

/// Codec reassembling concatenated MessagePack records from fixed-size reads.
#[derive(Debug)]
pub struct MsgpackStream {
    buffer: BytesMut,
    chunk: Vec<u8>,
    scanner: FrameScanner,
    /// Set while the rest of an oversized record is being skipped.
    discarding: bool,
    max_record_bytes: usize,
}

enum Unpacked {
    Record(Record, usize),
    Incomplete,
    Malformed(rmp_serde::decode::Error),
}

impl MsgpackStream {
    /// Creates a codec reading `chunk_size` bytes per pull and buffering at
    /// most `max_record_bytes` for a single record.
    #[must_use]
    pub fn new(chunk_size: usize, max_record_bytes: usize) -> Self {
        let read_size = chunk_size.max(1);
        Self {
            buffer: BytesMut::with_capacity(read_size),
            chunk: vec![0; read_size],
            scanner: FrameScanner::new(),
            discarding: false,
            max_record_bytes,
        }
    }

    pub(crate) fn encode(record: &Record) -> Result<Vec<u8>, Failure> {
        rmp_serde::to_vec_named(record).map_err(|error| Failure::encoding(error.to_string()))
    }

    pub(crate) fn decode(bytes: &[u8]) -> Result<Record, Failure> {
        match unpack(bytes) {
            Unpacked::Record(record, consumed) if consumed == bytes.len() => Ok(record),
            Unpacked::Record(_, consumed) => Err(Failure::decoding(format!(
                "{WRONG_REQUEST_FORMAT}: {} trailing bytes after record",
                bytes.len().saturating_sub(consumed)
            ))),
            Unpacked::Incomplete => Err(Failure::decoding(format!(
                "{WRONG_REQUEST_FORMAT}: truncated record"
            ))),
            Unpacked::Malformed(error) => Err(malformed(&error)),
        }
    }

    pub(crate) fn pull<R: BufRead>(&mut self, reader: &mut R) -> Result<Pull, Failure> {
        let read = read_with_retry(reader, &mut self.chunk)
            .map_err(|error: io::Error| Failure::transport(error.to_string()))?;
        if read == 0 {
            return Ok(Pull::End);
        }

        let chunk = self.chunk.get(..read).unwrap_or_default();
        self.buffer.extend_from_slice(chunk);
        Ok(Pull::Records(self.unpack_buffered()))
    }

    /// Drops a trailing partial record left at end-of-input.
    pub(crate) fn drain(&mut self) -> usize {
        let discarded = self.buffer.len();
        if discarded > 0 {
            debug!(
                target: CODEC_TARGET,
                bytes = discarded,
                "discarding incomplete trailing frame"
            );
        }
        self.buffer.clear();
        self.scanner.reset();
        self.discarding = false;
        discarded
    }

    fn unpack_buffered(&mut self) -> Vec<Decoded> {
        let mut records = Vec::new();
        while !self.buffer.is_empty() {
            match self.scanner.scan(&self.buffer) {
                Scan::Complete(len) => {
                    let frame = self.buffer.split_to(len);
                    self.scanner.reset();
                    if std::mem::take(&mut self.discarding) {
                        continue;
                    }
                    if len > self.max_record_bytes {
                        records.push(Err(self.oversized(len)));
                        continue;
                    }
                    match Self::decode(&frame) {
                        Ok(record) if is_separator(&record) => {}
                        decoded => records.push(decoded),
                    }
                }
                Scan::Incomplete => {
                    if !self.discarding && self.scanner.claimed() > self.max_record_bytes {
                        records.push(Err(self.oversized(self.scanner.claimed())));
                        self.discarding = true;
                    }
                    if self.discarding {
                        let walked = self.scanner.release();
                        self.buffer.advance(walked);
                    }
                    break;
                }
                Scan::Invalid(marker) => {
                    // No resynchronisation marker exists, so everything
                    // buffered is unusable.
                    warn!(
                        target: CODEC_TARGET,
                        bytes = self.buffer.len(),
                        marker,
                        "discarding unparseable frame"
                    );
                    self.buffer.clear();
                    self.scanner.reset();
                    self.discarding = false;
                    records.push(Err(Failure::decoding(format!(
                        "{WRONG_REQUEST_FORMAT}: invalid marker {marker:#04x}"
                    ))));
                    break;
                }
            }
        }
        records
    }

    fn oversized(&self, claimed: usize) -> Failure {
        warn!(
            target: CODEC_TARGET,
            bytes = claimed,
            limit = self.max_record_bytes,
            "discarding oversized frame"
        );
        Failure::decoding(format!(
            "{WRONG_REQUEST_FORMAT}: record exceeds {} bytes",
            self.max_record_bytes
        ))
    }
}

fn unpack(bytes: &[u8]) -> Unpacked {
    let mut remaining = bytes;
    let result = {
        let mut deserializer = rmp_serde::Deserializer::new(&mut remaining);
        LossyValue::deserialize(&mut deserializer)
    };
    match result {
        Ok(LossyValue(record)) => {
            Unpacked::Record(record, bytes.len().saturating_sub(remaining.len()))
        }
        Err(error) if is_incomplete(&error) => Unpacked::Incomplete,
        Err(error) => Unpacked::Malformed(error),
    }
}

fn is_incomplete(error: &rmp_serde::decode::Error) -> bool {
    use rmp_serde::decode::Error;

    match error {
        Error::InvalidMarkerRead(source) | Error::InvalidDataRead(source) => {
            source.kind() == io::ErrorKind::UnexpectedEof
        }
        _ => false,
    }
}

fn is_separator(record: &Record) -> bool {
    record.as_u64() == Some(LINE_SEPARATOR)
}

fn malformed(error: &rmp_serde::decode::Error) -> Failure {
    Failure::decoding(format!("{WRONG_REQUEST_FORMAT}: {error}"))
}
