//! Tree-sitter backed [`Extractor`] for PHP.

use std::sync::{Mutex, PoisonError};

use phpast_protocol::{Ast, Extractor, SyntaxFailure};
use tracing::debug;

use crate::error::SyntaxError;
use crate::parser::Parser;
use crate::tree::{AttributeMode, MAX_TREE_DEPTH, TreeBuilder};

/// Tracing target for parser events.
pub const SYNTAX_TARGET: &str = "phpast::syntax";

/// Parses PHP source into the driver's AST shape.
///
/// # Thread Safety
///
/// Parsing needs exclusive access to the Tree-sitter parser, which is held
/// behind a mutex. The driver loop is sequential, so the lock is never
/// contended there.
#[derive(Debug)]
pub struct PhpExtractor {
    parser: Mutex<Parser>,
    mode: AttributeMode,
    max_depth: usize,
}

impl PhpExtractor {
    /// Creates an extractor emitting attributes per `mode`.
    ///
    /// # Errors
    ///
    /// Returns an error if the PHP grammar cannot be loaded.
    pub fn new(mode: AttributeMode) -> Result<Self, SyntaxError> {
        Ok(Self {
            parser: Mutex::new(Parser::new()?),
            mode,
            max_depth: MAX_TREE_DEPTH,
        })
    }

    /// Overrides the deepest node nesting accepted.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Extractor for PhpExtractor {
    fn extract(&self, source: &str) -> Result<Ast, SyntaxFailure> {
        // A panic mid-parse leaves nothing behind that the next parse reuses.
        let mut parser = self.parser.lock().unwrap_or_else(PoisonError::into_inner);
        let parsed = parser
            .parse(source)
            .map_err(|error| SyntaxFailure::new(error.to_string()))?;

        if let Some(info) = parsed.first_error() {
            debug!(
                target: SYNTAX_TARGET,
                line = info.line,
                column = info.column,
                problem = ?info.problem,
                "source has syntax errors"
            );
            return Err(SyntaxFailure::new(info.message()).at_line(info.line));
        }

        TreeBuilder::new(source, self.mode, self.max_depth)
            .module(parsed.root_node())
            .map_err(|too_deep| {
                debug!(
                    target: SYNTAX_TARGET,
                    line = too_deep.line,
                    limit = self.max_depth,
                    "tree too deep"
                );
                SyntaxFailure::new(format!(
                    "Syntax error, nesting exceeds {} levels on line {}",
                    self.max_depth, too_deep.line
                ))
                .at_line(too_deep.line)
            })
    }
}
