//! Line-delimited JSON codec.

use std::io::{BufRead, Read};

use tracing::debug;

use super::{CODEC_TARGET, Decoded, Pull};
use crate::failure::{Failure, WRONG_REQUEST_FORMAT};
use crate::protocol::Record;

/// Codec reading one JSON record per line.
///
/// Lines containing only whitespace are skipped. A malformed line yields a
/// decoding failure for that line alone; the following line is read by the
/// next pull.
#[derive(Debug, Clone)]
pub struct JsonLines {
    max_record_bytes: usize,
}

enum LineRead {
    Line(Vec<u8>),
    Oversized(usize),
    End,
}

impl JsonLines {
    /// Creates a codec that rejects lines longer than `max_record_bytes`.
    #[must_use]
    pub const fn new(max_record_bytes: usize) -> Self {
        Self { max_record_bytes }
    }

    pub(crate) fn encode(record: &Record) -> Result<Vec<u8>, Failure> {
        serde_json::to_vec(record).map_err(|error| Failure::encoding(error.to_string()))
    }

    /// Decodes a single line.
    ///
    /// Input that is not valid UTF-8 is decoded a second time after lossy
    /// conversion, so source files in legacy encodings still reach the
    /// extractor with replacement characters in place of the invalid bytes.
    pub(crate) fn decode(bytes: &[u8]) -> Result<Record, Failure> {
        match serde_json::from_slice(bytes) {
            Ok(record) => Ok(record),
            Err(_) if std::str::from_utf8(bytes).is_err() => {
                debug!(
                    target: CODEC_TARGET,
                    bytes = bytes.len(),
                    "retrying decode after utf-8 coercion"
                );
                serde_json::from_str(&String::from_utf8_lossy(bytes)).map_err(malformed)
            }
            Err(error) => Err(malformed(error)),
        }
    }

    pub(crate) fn pull<R: BufRead>(&mut self, reader: &mut R) -> Result<Pull, Failure> {
        loop {
            let decoded: Decoded = match self.read_line(reader)? {
                LineRead::End => return Ok(Pull::End),
                LineRead::Oversized(limit) => Err(Failure::decoding(format!(
                    "{WRONG_REQUEST_FORMAT}: record exceeds {limit} bytes"
                ))),
                LineRead::Line(line) if is_blank(&line) => continue,
                LineRead::Line(line) => Self::decode(&line),
            };
            return Ok(Pull::Records(vec![decoded]));
        }
    }

    fn read_line<R: BufRead>(&self, reader: &mut R) -> Result<LineRead, Failure> {
        let limit = self.max_record_bytes;
        let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
        let mut line = Vec::new();
        let read = reader
            .by_ref()
            .take(cap)
            .read_until(b'\n', &mut line)
            .map_err(|error| Failure::transport(error.to_string()))?;

        if read == 0 {
            return Ok(LineRead::End);
        }

        if line.len() > limit && line.last() != Some(&b'\n') {
            let skipped = reader
                .skip_until(b'\n')
                .map_err(|error| Failure::transport(error.to_string()))?;
            debug!(
                target: CODEC_TARGET,
                bytes = line.len().saturating_add(skipped),
                "discarded oversized line"
            );
            return Ok(LineRead::Oversized(limit));
        }

        Ok(LineRead::Line(line))
    }
}

/// Blank means nothing but space, tab, line breaks, NUL, or vertical tab.
fn is_blank(line: &[u8]) -> bool {
    line.iter()
        .all(|byte| matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | b'\0' | b'\x0b'))
}

fn malformed(error: serde_json::Error) -> Failure {
    Failure::decoding(format!("{WRONG_REQUEST_FORMAT}: {error}"))
}
