//! Shared position conversion helpers.
//!
//! Tree-sitter positions are zero-based. Attributes and error messages use
//! one-based lines and columns.

/// Converts a Tree-sitter position to one-based line and column numbers.
#[must_use]
pub(crate) const fn point_to_one_based(pos: tree_sitter::Point) -> (usize, usize) {
    (pos.row.saturating_add(1), pos.column.saturating_add(1))
}
