//! The pluggable source-to-AST transformation.
//!
//! The driver never inspects an [`Ast`]; it only distinguishes success from
//! a [`SyntaxFailure`]. Implementations must be deterministic for a given
//! input and must not write to standard output.

use thiserror::Error;

use crate::failure::Failure;
use crate::protocol::Ast;

/// Source text the extractor could not parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SyntaxFailure {
    message: String,
    line: Option<usize>,
}

impl SyntaxFailure {
    /// Creates a failure with a peer-facing message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
        }
    }

    /// Records the one-based line the failure was detected on.
    #[must_use]
    pub const fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Returns the peer-facing message.
    #[must_use]
    pub const fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Returns the one-based line, when known.
    #[must_use]
    pub const fn line(&self) -> Option<usize> {
        self.line
    }
}

impl From<SyntaxFailure> for Failure {
    fn from(failure: SyntaxFailure) -> Self {
        Self::syntax(failure.message)
    }
}

/// Transforms source text into an AST.
pub trait Extractor {
    /// Parses `source` into a tree.
    ///
    /// # Errors
    ///
    /// Returns a [`SyntaxFailure`] when the source is not well-formed.
    fn extract(&self, source: &str) -> Result<Ast, SyntaxFailure>;
}

impl<E: Extractor + ?Sized> Extractor for &E {
    fn extract(&self, source: &str) -> Result<Ast, SyntaxFailure> {
        (**self).extract(source)
    }
}

impl<E: Extractor + ?Sized> Extractor for Box<E> {
    fn extract(&self, source: &str) -> Result<Ast, SyntaxFailure> {
        (**self).extract(source)
    }
}
