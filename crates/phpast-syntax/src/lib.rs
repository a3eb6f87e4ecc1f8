//! Tree-sitter powered PHP parsing for the phpast driver.
//!
//! [`PhpExtractor`] implements [`phpast_protocol::Extractor`]: it parses PHP
//! source with the `tree-sitter-php` grammar, rejects source containing
//! syntax errors with a PHP-style diagnostic, and otherwise converts the
//! concrete tree into the AST wire shape described in [`tree`].
//!
//! # Example
//!
//! ```
//! use phpast_protocol::Extractor;
//! use phpast_syntax::{AttributeMode, PhpExtractor};
//!
//! let extractor = PhpExtractor::new(AttributeMode::Simplified)?;
//! let ast = extractor.extract("<?php echo 1;").expect("valid PHP");
//! assert_eq!(ast["nodeType"], "Module");
//!
//! let failure = extractor.extract("<?php echo (1;").expect_err("invalid PHP");
//! assert!(failure.message().starts_with("Syntax error"));
//! # Ok::<(), phpast_syntax::SyntaxError>(())
//! ```

mod error;
mod extractor;
mod parser;
mod position;
pub mod tree;

pub use error::SyntaxError;
pub use extractor::{PhpExtractor, SYNTAX_TARGET};
pub use parser::{ParseResult, Parser, SyntaxErrorInfo, SyntaxProblem};
pub use tree::{AttributeMode, MAX_TREE_DEPTH, ROOT_NODE_TYPE};

#[cfg(test)]
mod tests;
