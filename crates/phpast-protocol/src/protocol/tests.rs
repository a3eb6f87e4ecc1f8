//! Unit tests for the request and response contracts.

use rstest::rstest;
use serde_json::json;

use super::*;
use crate::failure::FailureKind;

// ---------------------------------------------------------------------------
// Request validation
// ---------------------------------------------------------------------------

#[test]
fn request_from_minimal_record() {
    let request = Request::from_record(&json!({"content": "echo 1;"})).expect("valid request");
    assert_eq!(request.content(), "echo 1;");
    assert_eq!(request.identity(), &Identity::default());
}

#[test]
fn request_reads_full_identity() {
    let record = json!({
        "id": 7,
        "content": "<?php echo 1;",
        "metadata": {"name": "index.php"},
        "language": "PHP",
        "languageVersion": 7,
    });
    let request = Request::from_record(&record).expect("valid request");
    let identity = request.identity();
    assert_eq!(identity.id(), Some(&json!(7)));
    assert_eq!(identity.name(), Some("index.php"));
    assert_eq!(identity.language(), Some(&json!("PHP")));
    assert_eq!(identity.language_version(), Some(&json!(7)));
}

#[test]
fn request_accepts_top_level_name_and_snake_case_version() {
    let record = json!({"content": "", "name": "legacy.php", "language_version": "5.6"});
    let request = Request::from_record(&record).expect("valid request");
    assert_eq!(request.identity().name(), Some("legacy.php"));
    assert_eq!(request.identity().language_version(), Some(&json!("5.6")));
}

#[test]
fn metadata_name_wins_over_top_level_name() {
    let record = json!({"content": "", "name": "outer", "metadata": {"name": "inner"}});
    let identity = Identity::recover(&record);
    assert_eq!(identity.name(), Some("inner"));
}

#[rstest]
#[case::missing_content(json!({"metadata": {"name": "a.php"}}))]
#[case::numeric_content(json!({"content": 1}))]
#[case::null_content(json!({"content": null}))]
#[case::array_record(json!(["content"]))]
#[case::scalar_record(json!("content"))]
fn invalid_records_fail_validation(#[case] record: Record) {
    let failure = Request::from_record(&record).expect_err("record should be rejected");
    assert_eq!(failure.kind(), FailureKind::Validation);
    assert_eq!(failure.message(), WRONG_REQUEST_FORMAT);
}

#[test]
fn identity_is_recovered_from_invalid_record() {
    let record = json!({"id": "req-1", "content": 1, "metadata": {"name": "a.php"}});
    let identity = Identity::recover(&record);
    assert_eq!(identity.id(), Some(&json!("req-1")));
    assert_eq!(identity.name(), Some("a.php"));
}

#[test]
fn non_string_name_is_not_recovered() {
    let identity = Identity::recover(&json!({"metadata": {"name": 3}}));
    assert_eq!(identity.name(), None);
}

// ---------------------------------------------------------------------------
// Response construction
// ---------------------------------------------------------------------------

#[test]
fn successful_response_echoes_identity() {
    let record = json!({
        "id": 1,
        "content": "echo 1;",
        "metadata": {"name": "a.php"},
        "language": "PHP",
    });
    let request = Request::from_record(&record).expect("valid request");
    let response = Response::for_request(&request).succeed(json!({"nodeType": "Module"}));

    assert_eq!(response.status(), Status::Ok);
    assert!(response.errors().is_empty());
    assert_eq!(response.name(), Some("a.php"));
    assert_eq!(response.id(), Some(&json!(1)));
    assert_eq!(response.language(), Some(&json!("PHP")));
    assert_eq!(response.driver_id(), DRIVER_ID);
}

#[rstest]
#[case::syntax(Failure::syntax("Syntax error"), Status::Error)]
#[case::validation(Failure::validation(WRONG_REQUEST_FORMAT), Status::Fatal)]
#[case::decoding(Failure::decoding("bad line"), Status::Fatal)]
fn failed_response_has_errors_and_no_ast(#[case] failure: Failure, #[case] expected: Status) {
    let response = Response::orphan().fail(&failure);
    assert_eq!(response.status(), expected);
    assert_eq!(response.errors(), [failure.message().to_owned()]);
    assert!(response.ast().is_none());
}

#[rstest]
#[case::null(Value::Null)]
#[case::empty_array(json!([]))]
#[case::empty_map(json!({}))]
fn empty_ast_cannot_succeed(#[case] ast: Ast) {
    let response = Response::orphan().succeed(ast);
    assert_eq!(response.status(), Status::Fatal);
    assert_eq!(response.errors(), ["No ast parsed".to_owned()]);
}

#[test]
fn orphan_record_has_null_name_and_empty_ast() {
    let record = Response::orphan()
        .fail(&Failure::transport(WRONG_REQUEST_FORMAT))
        .into_record();
    assert_eq!(
        record,
        json!({
            "driverId": DRIVER_ID,
            "ast": [],
            "metadata": {"name": null},
            "status": "fatal",
            "errors": ["Wrong request format"],
        })
    );
}

#[test]
fn response_record_echoes_identity_fields() {
    let identity = Identity::recover(&json!({"id": "x", "languageVersion": 7}));
    let record = Response::builder(identity)
        .succeed(json!({"nodeType": "Module"}))
        .into_record();
    assert_eq!(
        record,
        json!({
            "id": "x",
            "languageVersion": 7,
            "driverId": DRIVER_ID,
            "ast": {"nodeType": "Module"},
            "metadata": {"name": null},
            "status": "ok",
            "errors": [],
        })
    );
}

#[rstest]
#[case(Status::Pending, "pending")]
#[case(Status::Ok, "ok")]
#[case(Status::Error, "error")]
#[case(Status::Fatal, "fatal")]
fn status_wire_names(#[case] status: Status, #[case] expected: &str) {
    assert_eq!(status.as_str(), expected);
}
