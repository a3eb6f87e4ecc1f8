//! Unit tests for phpast-syntax.

use phpast_protocol::{Extractor, Failure, FailureKind};
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use crate::{AttributeMode, Parser, PhpExtractor, ROOT_NODE_TYPE, SyntaxProblem};

#[fixture]
fn verbose() -> PhpExtractor {
    PhpExtractor::new(AttributeMode::Verbose).expect("parser init")
}

#[fixture]
fn simplified() -> PhpExtractor {
    PhpExtractor::new(AttributeMode::Simplified).expect("parser init")
}

fn children(node: &Value) -> &[Value] {
    node.get("children")
        .and_then(Value::as_array)
        .map_or(&[][..], Vec::as_slice)
}

fn find<'a>(node: &'a Value, node_type: &str) -> Option<&'a Value> {
    if node.get("nodeType").and_then(Value::as_str) == Some(node_type) {
        return Some(node);
    }
    children(node).iter().find_map(|child| find(child, node_type))
}

// =============================================================================
// Parser Tests
// =============================================================================

#[rstest]
#[case("<?php echo 1;", false)]
#[case("<?php function greet($name) { return \"hi $name\"; }", false)]
#[case("<?php class A { public function b(): int { return 1; } }", false)]
#[case("<html><body>plain</body></html>", false)]
#[case("<?php echo (1;", true)]
#[case("<?php function broken( {", true)]
fn parser_detects_errors(#[case] source: &str, #[case] has_errors: bool) {
    let mut parser = Parser::new().expect("parser init");
    let result = parser.parse(source).expect("parse");
    assert_eq!(result.has_errors(), has_errors);
    assert_eq!(result.first_error().is_some(), has_errors);
}

#[test]
fn first_error_reports_one_based_line() {
    let mut parser = Parser::new().expect("parser init");
    let result = parser.parse("<?php\n\necho (1;\n").expect("parse");
    let info = result.first_error().expect("has error");
    assert_eq!(info.line, 3);
    assert!(info.column >= 1);
    assert!(info.message().starts_with("Syntax error, "));
    assert!(info.message().ends_with(" on line 3"));
}

#[rstest]
#[case(SyntaxProblem::Unexpected(String::from("(")), "Syntax error, unexpected '(' on line 4")]
#[case(SyntaxProblem::UnexpectedEnd, "Syntax error, unexpected end of file on line 4")]
#[case(SyntaxProblem::Missing(String::from(";")), "Syntax error, missing ';' on line 4")]
fn syntax_messages_follow_php_wording(#[case] problem: SyntaxProblem, #[case] expected: &str) {
    let info = crate::SyntaxErrorInfo {
        byte_range: 0..1,
        line: 4,
        column: 1,
        problem,
    };
    assert_eq!(info.message(), expected);
}

#[test]
fn parser_is_reusable_after_errors() {
    let mut parser = Parser::new().expect("parser init");
    assert!(parser.parse("<?php echo (1;").expect("parse").has_errors());
    assert!(!parser.parse("<?php echo 1;").expect("parse").has_errors());
}

// =============================================================================
// Extraction Tests
// =============================================================================

#[rstest]
fn root_is_a_module(simplified: PhpExtractor) {
    let ast = simplified.extract("<?php echo 1;").expect("valid source");
    assert_eq!(ast.get("nodeType"), Some(&json!(ROOT_NODE_TYPE)));
    assert!(find(&ast, "echo_statement").is_some());
    assert!(ast.get("attributes").is_none());
}

#[rstest]
fn named_leaves_carry_source_text(simplified: PhpExtractor) {
    let ast = simplified.extract("<?php echo 42;").expect("valid source");
    let integer = find(&ast, "integer").expect("integer node");
    assert_eq!(integer.get("value"), Some(&json!("42")));
    assert!(integer.get("children").is_none());
}

#[rstest]
fn field_names_are_recorded(simplified: PhpExtractor) {
    let ast = simplified
        .extract("<?php function greet() {}")
        .expect("valid source");
    let function = find(&ast, "function_definition").expect("function node");
    let name = children(function)
        .iter()
        .find(|child| child.get("field") == Some(&json!("name")))
        .expect("named child");
    assert_eq!(name.get("value"), Some(&json!("greet")));
}

#[rstest]
fn verbose_mode_records_positions(verbose: PhpExtractor) {
    let ast = verbose.extract("<?php echo 1;").expect("valid source");
    let echo = find(&ast, "echo_statement").expect("echo node");
    assert_eq!(
        echo.get("attributes"),
        Some(&json!({
            "startLine": 1,
            "endLine": 1,
            "startFilePos": 6,
            "endFilePos": 12,
            "startColumn": 7,
            "endColumn": 13,
        }))
    );
    let integer = find(echo, "integer").expect("integer node");
    assert_eq!(integer.pointer("/attributes/startFilePos"), Some(&json!(11)));
    assert_eq!(integer.pointer("/attributes/endFilePos"), Some(&json!(11)));
}

#[rstest]
fn simplified_mode_omits_positions(simplified: PhpExtractor) {
    let ast = simplified.extract("<?php echo 1;").expect("valid source");
    let echo = find(&ast, "echo_statement").expect("echo node");
    assert!(echo.get("attributes").is_none());
}

#[rstest]
fn inline_html_is_valid(simplified: PhpExtractor) {
    let ast = simplified
        .extract("<p>static page</p>")
        .expect("inline html parses");
    let text = find(&ast, "text").expect("text node");
    assert_eq!(text.get("value"), Some(&json!("<p>static page</p>")));
}

#[rstest]
fn empty_source_yields_empty_module(simplified: PhpExtractor) {
    let ast = simplified.extract("").expect("empty source parses");
    assert_eq!(ast, json!({"nodeType": ROOT_NODE_TYPE, "children": []}));
}

#[rstest]
fn invalid_source_is_a_syntax_failure(verbose: PhpExtractor) {
    let failure = verbose
        .extract("<?php\necho (1;\n")
        .expect_err("invalid source");
    assert_eq!(failure.line(), Some(2));
    assert!(failure.message().starts_with("Syntax error, "));

    let converted = Failure::from(failure);
    assert_eq!(converted.kind(), FailureKind::Syntax);
}

#[test]
fn nesting_past_the_limit_is_a_syntax_failure() {
    let extractor = PhpExtractor::new(AttributeMode::Simplified)
        .expect("parser init")
        .with_max_depth(2);
    let failure = extractor
        .extract("<?php echo 1 + 2;")
        .expect_err("too deep");
    assert_eq!(
        failure.message(),
        "Syntax error, nesting exceeds 2 levels on line 1"
    );
}

#[rstest]
fn extraction_is_deterministic(verbose: PhpExtractor) {
    let source = "<?php\nclass Point { public int $x = 0; }\n$p = new Point();\n";
    let first = verbose.extract(source).expect("valid source");
    let _ = verbose.extract("<?php echo (;").expect_err("invalid source");
    let second = verbose.extract(source).expect("valid source");
    assert_eq!(first, second);
}

#[rstest]
#[case("verbose", AttributeMode::Verbose)]
#[case("Simplified", AttributeMode::Simplified)]
fn attribute_mode_parses_case_insensitively(#[case] text: &str, #[case] expected: AttributeMode) {
    assert_eq!(text.parse::<AttributeMode>().expect("valid mode"), expected);
}
