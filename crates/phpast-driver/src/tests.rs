//! Unit tests for configuration and process wiring.

use std::io::Cursor;

use clap::Parser;
use phpast_protocol::codec::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_RECORD_BYTES};
use phpast_protocol::{RunSummary, WireFormat};
use phpast_syntax::AttributeMode;
use rstest::rstest;
use serde_json::Value;

use crate::telemetry::{TelemetryError, parse_filter};
use crate::{Config, LogFormat, run};

fn config(args: &[&str]) -> Config {
    Config::try_parse_from(std::iter::once("phpast-driver").chain(args.iter().copied()))
        .expect("valid arguments")
}

#[test]
fn defaults_select_json_and_verbose_attributes() {
    let config = config(&[]);
    assert_eq!(config.wire_format(), WireFormat::Json);
    assert_eq!(config.codec_options().chunk_size, DEFAULT_CHUNK_SIZE);
    assert_eq!(config.codec_options().max_record_bytes, DEFAULT_MAX_RECORD_BYTES);
    assert_eq!(config.attributes(), AttributeMode::Verbose);
    assert_eq!(config.log_filter(), "info");
    assert_eq!(config.log_format(), LogFormat::Json);
}

#[rstest]
#[case("msgpack", WireFormat::Msgpack)]
#[case("json", WireFormat::Json)]
#[case("anything-else", WireFormat::Json)]
fn positional_argument_selects_format(#[case] argument: &str, #[case] expected: WireFormat) {
    assert_eq!(config(&[argument]).wire_format(), expected);
}

#[test]
fn flags_override_defaults() {
    let config = config(&[
        "msgpack",
        "--chunk-size",
        "4096",
        "--max-transport-failures",
        "2",
        "--attributes",
        "simplified",
        "--log-format",
        "compact",
    ]);
    assert_eq!(config.codec_options().chunk_size, 4096);
    assert_eq!(config.max_transport_failures(), 2);
    assert_eq!(config.attributes(), AttributeMode::Simplified);
    assert_eq!(config.log_format(), LogFormat::Compact);
}

#[rstest]
#[case::zero_chunk(&["--chunk-size", "0"])]
#[case::negative_limit(&["--max-record-bytes", "-1"])]
#[case::unknown_attributes(&["--attributes", "loud"])]
#[case::unknown_log_format(&["--log-format", "xml"])]
fn invalid_flags_are_rejected(#[case] args: &[&str]) {
    let result = Config::try_parse_from(std::iter::once("phpast-driver").chain(args.iter().copied()));
    assert!(result.is_err());
}

#[test]
fn invalid_log_filter_is_reported() {
    let error = parse_filter("phpast=loudest").expect_err("invalid filter");
    assert!(matches!(error, TelemetryError::Filter(_)));
}

#[test]
fn first_installed_log_format_wins() {
    let first = crate::telemetry::initialise(&config(&["--log-format", "compact"]))
        .expect("telemetry installs");
    let second = crate::telemetry::initialise(&config(&["--log-format", "json"]))
        .expect("repeat call succeeds");

    assert_eq!(first.log_format(), LogFormat::Compact);
    assert_eq!(second, first);
    second.announce(&config(&["msgpack"]));
}

#[test]
fn run_answers_each_request() {
    let input = concat!(
        "{\"content\":\"<?php echo 1;\",\"metadata\":{\"name\":\"ok.php\"}}\n",
        "{\"content\":1}\n",
        "{\"content\":\"<?php echo (1;\",\"metadata\":{\"name\":\"bad.php\"}}\n",
    );
    let mut output = Vec::new();

    let summary = run(&config(&[]), &mut Cursor::new(input), &mut output).expect("run succeeds");

    assert_eq!(summary, RunSummary { ok: 1, error: 1, fatal: 1 });
    let statuses: Vec<String> = String::from_utf8(output)
        .expect("utf-8 output")
        .lines()
        .map(|line| {
            let response: Value = serde_json::from_str(line).expect("response is json");
            response
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned()
        })
        .collect();
    assert_eq!(statuses, ["ok", "fatal", "error"]);
}

fn nested_request(levels: usize) -> String {
    let source = format!("<?php {}1{};", "(".repeat(levels), ")".repeat(levels));
    let request = serde_json::json!({"content": source, "metadata": {"name": "deep.php"}});
    format!("{request}\n")
}

#[rstest]
#[case::within_limit(200, "ok")]
#[case::past_limit(400, "error")]
fn nested_source_is_answered_without_a_fatal(#[case] levels: usize, #[case] expected: &str) {
    let mut output = Vec::new();

    run(
        &config(&[]),
        &mut Cursor::new(nested_request(levels)),
        &mut output,
    )
    .expect("run succeeds");

    let response: Value = serde_json::from_slice(&output).expect("response is json");
    assert_eq!(response.get("status").and_then(Value::as_str), Some(expected));
    assert_eq!(
        response.pointer("/metadata/name").and_then(Value::as_str),
        Some("deep.php")
    );
    if expected == "error" {
        let message = response
            .pointer("/errors/0")
            .and_then(Value::as_str)
            .unwrap_or_default();
        assert!(message.contains("nesting exceeds"), "got {message}");
    }
}
