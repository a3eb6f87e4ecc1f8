//! Conversion from Tree-sitter nodes to the AST wire shape.
//!
//! The AST is a tree of maps:
//!
//! ```text
//! {"nodeType": "Module", "children": [
//!     {"nodeType": "echo_statement",
//!      "attributes": {"startLine": 1, "endLine": 1, ...},
//!      "children": [{"nodeType": "integer", "value": "1", ...}]}
//! ]}
//! ```
//!
//! Only named nodes appear. Punctuation and keywords are implied by the node
//! type. A child reached through a grammar field records the field name.

use phpast_protocol::codec::MAX_DEPTH;
use serde_json::{Map, Value};
use strum::{Display, EnumString};
use tree_sitter::{Node, TreeCursor};

use crate::position::point_to_one_based;

/// Node type of the synthetic root wrapping the top-level statements.
pub const ROOT_NODE_TYPE: &str = "Module";

/// Deepest node nesting converted before the source is rejected.
///
/// A response holds the module map one level down, and every node below it
/// adds a map plus a `children` list (or `attributes` map). Trees within this
/// limit therefore always fit the encoder's depth guard.
pub const MAX_TREE_DEPTH: usize = MAX_DEPTH.saturating_sub(3).div_euclid(2);

/// Which position attributes each node carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum AttributeMode {
    /// Lines, columns, and byte offsets.
    #[default]
    Verbose,
    /// No position attributes.
    Simplified,
}

/// Conversion stopped because the tree nests deeper than the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TooDeep {
    /// One-based line of the node that crossed the limit.
    pub(crate) line: usize,
}

/// Builds AST values from a parsed tree.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeBuilder<'src> {
    source: &'src str,
    mode: AttributeMode,
    max_depth: usize,
}

impl<'src> TreeBuilder<'src> {
    pub(crate) const fn new(source: &'src str, mode: AttributeMode, max_depth: usize) -> Self {
        Self {
            source,
            mode,
            max_depth,
        }
    }

    /// Converts the tree under `root` into the wrapped module form.
    pub(crate) fn module(&self, root: Node<'_>) -> Result<Value, TooDeep> {
        let mut fields = Map::new();
        fields.insert(
            String::from("nodeType"),
            Value::String(ROOT_NODE_TYPE.to_owned()),
        );
        fields.insert(
            String::from("children"),
            Value::Array(self.children(root, 1)?),
        );
        Ok(Value::Object(fields))
    }

    fn node(&self, node: Node<'_>, field: Option<&str>, depth: usize) -> Result<Value, TooDeep> {
        if depth > self.max_depth {
            let (line, _) = point_to_one_based(node.start_position());
            return Err(TooDeep { line });
        }

        let mut fields = Map::new();
        fields.insert(String::from("nodeType"), Value::String(node.kind().to_owned()));
        if let Some(name) = field {
            fields.insert(String::from("field"), Value::String(name.to_owned()));
        }
        if self.mode == AttributeMode::Verbose {
            fields.insert(String::from("attributes"), attributes(node));
        }

        if node.named_child_count() == 0 {
            let text = self.source.get(node.byte_range()).unwrap_or_default();
            fields.insert(String::from("value"), Value::String(text.to_owned()));
        } else {
            fields.insert(
                String::from("children"),
                Value::Array(self.children(node, depth.saturating_add(1))?),
            );
        }
        Ok(Value::Object(fields))
    }

    fn children(&self, parent: Node<'_>, depth: usize) -> Result<Vec<Value>, TooDeep> {
        let mut cursor = parent.walk();
        let mut children = Vec::with_capacity(parent.named_child_count());
        if !cursor.goto_first_child() {
            return Ok(children);
        }
        loop {
            if let Some(child) = named_child(&cursor) {
                children.push(self.node(child, cursor.field_name(), depth)?);
            }
            if !cursor.goto_next_sibling() {
                return Ok(children);
            }
        }
    }
}

fn named_child<'tree>(cursor: &TreeCursor<'tree>) -> Option<Node<'tree>> {
    Some(cursor.node()).filter(Node::is_named)
}

fn attributes(node: Node<'_>) -> Value {
    let (start_line, start_column) = point_to_one_based(node.start_position());
    let (end_line, _) = point_to_one_based(node.end_position());
    let range = node.byte_range();

    // End positions are inclusive: the offset and column of the last byte.
    let mut attributes = Map::new();
    attributes.insert(String::from("startLine"), start_line.into());
    attributes.insert(String::from("endLine"), end_line.into());
    attributes.insert(String::from("startFilePos"), range.start.into());
    attributes.insert(
        String::from("endFilePos"),
        range.end.saturating_sub(1).max(range.start).into(),
    );
    attributes.insert(String::from("startColumn"), start_column.into());
    attributes.insert(
        String::from("endColumn"),
        node.end_position().column.max(1).into(),
    );
    Value::Object(attributes)
}
