//! Incremental MessagePack frame boundary detection.
//!
//! The scanner walks markers and length headers without building values, so
//! a record's extent is known before any of it is deserialized. Progress is
//! kept between calls: bytes already walked are never walked again, which
//! keeps reassembly linear in the record size.

/// Marker reserved by the format and never emitted by an encoder.
const NEVER_USED: u8 = 0xc1;

/// Outcome of scanning the front of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scan {
    /// The first `usize` bytes form one complete value.
    Complete(usize),
    /// More bytes are needed.
    Incomplete,
    /// The byte at the scan position is not a valid marker.
    Invalid(u8),
}

/// Layout of one value header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    /// Marker plus length or type bytes.
    len: usize,
    /// Raw payload bytes following the header.
    payload: usize,
    /// Nested values following the header.
    children: u64,
}

impl Header {
    const fn scalar(len: usize) -> Self {
        Self {
            len,
            payload: 0,
            children: 0,
        }
    }

    const fn bytes(len: usize, payload: usize) -> Self {
        Self {
            len,
            payload,
            children: 0,
        }
    }

    const fn nested(len: usize, children: u64) -> Self {
        Self {
            len,
            payload: 0,
            children,
        }
    }
}

enum Peek {
    Ready(Header),
    Short,
    Invalid(u8),
}

/// Resumable walk over the value at the front of a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FrameScanner {
    /// Bytes of the current frame already walked.
    scanned: usize,
    /// Values still to be walked before the frame closes.
    pending: u64,
    /// Payload bytes still to be stepped over.
    skip: usize,
}

impl FrameScanner {
    pub(crate) const fn new() -> Self {
        Self {
            scanned: 0,
            pending: 1,
            skip: 0,
        }
    }

    /// Forgets the current frame.
    pub(crate) const fn reset(&mut self) {
        *self = Self::new();
    }

    /// Bytes known to belong to the current frame, including payload that
    /// has been announced but not yet received.
    pub(crate) const fn claimed(&self) -> usize {
        self.scanned.saturating_add(self.skip)
    }

    /// Hands back the walked prefix so the caller can drop it, keeping the
    /// rest of the walk state.
    pub(crate) const fn release(&mut self) -> usize {
        let walked = self.scanned;
        self.scanned = 0;
        walked
    }

    /// Continues walking `buffer`, which must start where the current frame
    /// starts (less anything already released).
    pub(crate) fn scan(&mut self, buffer: &[u8]) -> Scan {
        loop {
            if self.skip > 0 {
                let available = buffer.len().saturating_sub(self.scanned);
                let step = self.skip.min(available);
                self.scanned = self.scanned.saturating_add(step);
                self.skip = self.skip.saturating_sub(step);
                if self.skip > 0 {
                    return Scan::Incomplete;
                }
            }
            if self.pending == 0 {
                return Scan::Complete(self.scanned);
            }

            let rest = buffer.get(self.scanned..).unwrap_or_default();
            let header = match peek(rest) {
                Peek::Ready(header) => header,
                Peek::Short => return Scan::Incomplete,
                Peek::Invalid(marker) => return Scan::Invalid(marker),
            };
            self.scanned = self.scanned.saturating_add(header.len);
            self.skip = header.payload;
            self.pending = self
                .pending
                .saturating_sub(1)
                .saturating_add(header.children);
        }
    }
}

fn peek(rest: &[u8]) -> Peek {
    let Some(&marker) = rest.first() else {
        return Peek::Short;
    };
    let Some(header) = layout(marker, rest) else {
        return Peek::Short;
    };
    if marker == NEVER_USED {
        return Peek::Invalid(marker);
    }
    Peek::Ready(header)
}

/// Decodes the header starting with `marker`, or `None` if its length bytes
/// have not all arrived.
fn layout(marker: u8, rest: &[u8]) -> Option<Header> {
    let header = match marker {
        0x00..=0x7f | 0xc0..=0xc3 | 0xe0..=0xff => Header::scalar(1),
        0x80..=0x8f => Header::nested(1, u64::from(marker & 0x0f).saturating_mul(2)),
        0x90..=0x9f => Header::nested(1, u64::from(marker & 0x0f)),
        0xa0..=0xbf => Header::bytes(1, usize::from(marker & 0x1f)),
        0xc4 | 0xd9 => Header::bytes(2, length(rest, 1)?),
        0xc5 | 0xda => Header::bytes(3, length(rest, 2)?),
        0xc6 | 0xdb => Header::bytes(5, length(rest, 4)?),
        0xc7 => Header::bytes(3, length(rest, 1)?),
        0xc8 => Header::bytes(4, length(rest, 2)?),
        0xc9 => Header::bytes(6, length(rest, 4)?),
        0xca => Header::scalar(5),
        0xcb => Header::scalar(9),
        0xcc | 0xd0 => Header::scalar(2),
        0xcd | 0xd1 => Header::scalar(3),
        0xce | 0xd2 => Header::scalar(5),
        0xcf | 0xd3 => Header::scalar(9),
        0xd4 => Header::bytes(2, 1),
        0xd5 => Header::bytes(2, 2),
        0xd6 => Header::bytes(2, 4),
        0xd7 => Header::bytes(2, 8),
        0xd8 => Header::bytes(2, 16),
        0xdc => Header::nested(3, count(rest, 2)?),
        0xdd => Header::nested(5, count(rest, 4)?),
        0xde => Header::nested(3, count(rest, 2)?.saturating_mul(2)),
        0xdf => Header::nested(5, count(rest, 4)?.saturating_mul(2)),
    };
    (rest.len() >= header.len).then_some(header)
}

/// Reads the network-order length field of `width` bytes after the marker.
fn count(rest: &[u8], width: usize) -> Option<u64> {
    let field = rest.get(1..=width)?;
    Some(
        field
            .iter()
            .fold(0_u64, |acc, byte| (acc << 8) | u64::from(*byte)),
    )
}

fn length(rest: &[u8], width: usize) -> Option<usize> {
    count(rest, width).map(|value| usize::try_from(value).unwrap_or(usize::MAX))
}
