//! Error types for parser set-up and parsing.
//!
//! These are infrastructure errors. Source text that fails to parse is not an
//! error at this level; it is reported to the peer as a
//! [`phpast_protocol::SyntaxFailure`].

use thiserror::Error;

/// Errors raised while preparing or running the PHP parser.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyntaxError {
    /// The grammar could not be loaded into a Tree-sitter parser.
    #[error("failed to initialise PHP parser: {message}")]
    ParserInitError {
        /// Description of the failure.
        message: String,
    },

    /// Tree-sitter returned no tree for the input.
    #[error("failed to parse PHP: {message}")]
    ParseError {
        /// Description of the failure.
        message: String,
    },
}

impl SyntaxError {
    /// Creates a parser initialisation error.
    #[must_use]
    pub fn parser_init(message: impl Into<String>) -> Self {
        Self::ParserInitError {
            message: message.into(),
        }
    }

    /// Creates a parse error.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
        }
    }
}
