//! Tree-sitter parsing wrapper for PHP.
//!
//! Tree-sitter is error-tolerant and always produces a tree, marking the
//! regions it could not parse with ERROR nodes and the tokens it had to
//! invent with MISSING nodes. [`ParseResult::first_error`] turns the first
//! such node in document order into a PHP-style diagnostic.

use std::ops::Range;

use crate::error::SyntaxError;
use crate::position::point_to_one_based;

/// Longest token quoted in an "unexpected" diagnostic.
const MAX_TOKEN_CHARS: usize = 32;

/// Result of parsing PHP source text.
#[derive(Debug)]
pub struct ParseResult<'src> {
    tree: tree_sitter::Tree,
    source: &'src str,
}

impl ParseResult<'_> {
    /// Returns the root node of the syntax tree.
    #[must_use]
    pub fn root_node(&self) -> tree_sitter::Node<'_> {
        self.tree.root_node()
    }

    /// Returns whether the tree contains any ERROR or MISSING node.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Returns the first syntax problem in document order, if any.
    #[must_use]
    pub fn first_error(&self) -> Option<SyntaxErrorInfo> {
        let mut node = self.tree.root_node();
        if !node.has_error() {
            return None;
        }

        // Descend into the leftmost child whose subtree holds an error until
        // the error node itself is reached.
        loop {
            if node.is_error() || node.is_missing() {
                return Some(SyntaxErrorInfo::from_node(node, self.source));
            }
            let mut cursor = node.walk();
            let next = node
                .children(&mut cursor)
                .find(|child| child.has_error() || child.is_missing());
            match next {
                Some(child) => node = child,
                None => return Some(SyntaxErrorInfo::from_node(node, self.source)),
            }
        }
    }
}

/// A syntax problem located in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxErrorInfo {
    /// Byte range of the offending node.
    pub byte_range: Range<usize>,
    /// One-based line where the problem starts.
    pub line: usize,
    /// One-based column where the problem starts.
    pub column: usize,
    /// What went wrong.
    pub problem: SyntaxProblem,
}

/// Classification of a syntax problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxProblem {
    /// A token the grammar did not expect.
    Unexpected(String),
    /// Input ended in the middle of a construct.
    UnexpectedEnd,
    /// A token the grammar required but the source lacks.
    Missing(String),
}

impl SyntaxErrorInfo {
    fn from_node(node: tree_sitter::Node<'_>, source: &str) -> Self {
        let (line, column) = point_to_one_based(node.start_position());
        let problem = if node.is_missing() {
            SyntaxProblem::Missing(node.kind().to_owned())
        } else {
            first_token(node, source).map_or(SyntaxProblem::UnexpectedEnd, SyntaxProblem::Unexpected)
        };

        Self {
            byte_range: node.byte_range(),
            line,
            column,
            problem,
        }
    }

    /// Renders the diagnostic in the form reported to peers.
    #[must_use]
    pub fn message(&self) -> String {
        let line = self.line;
        match &self.problem {
            SyntaxProblem::Unexpected(token) => {
                format!("Syntax error, unexpected '{token}' on line {line}")
            }
            SyntaxProblem::UnexpectedEnd => {
                format!("Syntax error, unexpected end of file on line {line}")
            }
            SyntaxProblem::Missing(token) => {
                format!("Syntax error, missing '{token}' on line {line}")
            }
        }
    }
}

/// Returns the text of the first non-empty leaf under `node`, shortened to
/// [`MAX_TOKEN_CHARS`].
fn first_token(node: tree_sitter::Node<'_>, source: &str) -> Option<String> {
    let mut cursor = node.walk();
    loop {
        let current = cursor.node();
        if current.child_count() == 0 {
            let text = source.get(current.byte_range()).map(str::trim)?;
            if !text.is_empty() {
                return Some(text.chars().take(MAX_TOKEN_CHARS).collect());
            }
        } else if cursor.goto_first_child() {
            continue;
        }

        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() || cursor.node() == node {
                return None;
            }
        }
    }
}

/// Tree-sitter parser configured for PHP.
pub struct Parser {
    inner: tree_sitter::Parser,
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("Parser").finish_non_exhaustive()
    }
}

impl Parser {
    /// Creates a parser for PHP source, including leading inline HTML.
    ///
    /// # Errors
    ///
    /// Returns an error if the grammar is incompatible with the linked
    /// Tree-sitter runtime.
    pub fn new() -> Result<Self, SyntaxError> {
        let mut inner = tree_sitter::Parser::new();
        inner
            .set_language(&tree_sitter_php::LANGUAGE_PHP.into())
            .map_err(|e| SyntaxError::parser_init(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Parses source text.
    ///
    /// The previous tree is not reused, so results never depend on earlier
    /// inputs.
    ///
    /// # Errors
    ///
    /// Returns an error if Tree-sitter produces no tree, which only happens
    /// when the parser has no language or was cancelled.
    pub fn parse<'src>(&mut self, source: &'src str) -> Result<ParseResult<'src>, SyntaxError> {
        self.inner.reset();
        let tree = self
            .inner
            .parse(source, None)
            .ok_or_else(|| SyntaxError::parse("parser returned no tree"))?;
        Ok(ParseResult { tree, source })
    }
}
