//! Failure taxonomy for the request/response cycle.
//!
//! Every per-record problem is represented by a [`Failure`] tagged with a
//! [`FailureKind`]. The driver loop switches on the kind, never on where the
//! failure was raised, to pick the response status and decide whether the
//! loop keeps going.

use std::fmt;

use thiserror::Error;

use crate::protocol::Status;

/// Message reported for records that cannot be turned into a request.
pub const WRONG_REQUEST_FORMAT: &str = "Wrong request format";

/// Classification of a failure by origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Malformed bytes for one record, or an unparseable buffered frame.
    Decoding,
    /// A decoded record is missing the required `content` string.
    Validation,
    /// The extractor could not produce an AST from the source text.
    Syntax,
    /// The underlying read primitive failed.
    Transport,
    /// A response could not be turned into wire bytes.
    Encoding,
}

impl FailureKind {
    /// Returns the response status reported for failures of this kind.
    #[must_use]
    pub const fn status(self) -> Status {
        match self {
            Self::Syntax => Status::Error,
            Self::Decoding | Self::Validation | Self::Transport | Self::Encoding => Status::Fatal,
        }
    }

    /// Returns the lower-case identifier used in log events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Decoding => "decoding",
            Self::Validation => "validation",
            Self::Syntax => "syntax",
            Self::Transport => "transport",
            Self::Encoding => "encoding",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A per-record failure carried alongside a human-readable message.
///
/// The message is what ends up in the response's `errors` list, so it is
/// written for the peer rather than for operators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} failure: {message}")]
pub struct Failure {
    kind: FailureKind,
    message: String,
}

impl Failure {
    /// Creates a failure of the given kind.
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a decoding failure.
    #[must_use]
    pub fn decoding(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Decoding, message)
    }

    /// Creates a validation failure.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Validation, message)
    }

    /// Creates a syntax failure.
    #[must_use]
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Syntax, message)
    }

    /// Creates a transport failure.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Transport, message)
    }

    /// Creates an encoding failure.
    #[must_use]
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Encoding, message)
    }

    /// Returns the failure classification.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Returns the peer-facing message.
    #[must_use]
    pub const fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Returns the response status for this failure.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.kind.status()
    }

    /// Consumes the failure and returns its message.
    #[must_use]
    pub fn into_message(self) -> String {
        self.message
    }
}
