//! Crate-level integration and BDD tests.

use std::io::Cursor;

use serde_json::{Value, json};

use crate::codec::{Codec, CodecOptions, Pull, WireFormat};
use crate::driver::{Driver, RunSummary};
use crate::extractor::{Extractor, SyntaxFailure};
use crate::protocol::Ast;


/// Accepts any source except text containing `broken(`.
struct StubExtractor;

impl Extractor for StubExtractor {
    fn extract(&self, source: &str) -> Result<Ast, SyntaxFailure> {
        if source.contains("broken(") {
            return Err(
                SyntaxFailure::new("Syntax error, unexpected end of file on line 1").at_line(1),
            );
        }
        Ok(json!({
            "nodeType": "Module",
            "children": [{"nodeType": "Stmt_Echo", "value": source}],
        }))
    }
}

/// Decodes every response the driver wrote in `format`.
fn read_responses(format: WireFormat, output: Vec<u8>) -> Vec<Value> {
    let mut codec = Codec::new(format, CodecOptions::default());
    let mut reader = Cursor::new(output);
    let mut responses = Vec::new();
    while let Pull::Records(batch) = codec.pull(&mut reader).expect("output is readable") {
        responses.extend(batch.into_iter().map(|item| item.expect("response decodes")));
    }
    responses
}

#[test]
fn borrowed_extractor_drives_the_loop() {
    let extractor = StubExtractor;
    let mut driver = Driver::new(
        Codec::new(WireFormat::Json, CodecOptions::default()),
        &extractor,
    );
    let mut output = Vec::new();

    let summary = driver
        .run(
            &mut Cursor::new("{\"content\":\"a\"}\n{\"content\":\"broken(\"}\n"),
            &mut output,
        )
        .expect("run succeeds");

    assert_eq!(summary, RunSummary { ok: 1, error: 1, fatal: 0 });
    assert_eq!(read_responses(WireFormat::Json, output).len(), 2);
}

#[test]
fn both_formats_answer_the_same_request_alike() {
    let request = json!({"id": "r1", "content": "echo 1;", "metadata": {"name": "a.php"}});
    let mut answers = Vec::new();
    for format in [WireFormat::Json, WireFormat::Msgpack] {
        let codec = Codec::new(format, CodecOptions::default());
        let mut input = codec.encode(&request).expect("encode request");
        input.push(b'\n');
        let mut output = Vec::new();
        Driver::new(codec, StubExtractor)
            .run(&mut Cursor::new(input), &mut output)
            .expect("run succeeds");
        answers.push(read_responses(format, output));
    }

    let [json_answer, msgpack_answer] = answers.as_slice() else {
        panic!("expected two answers");
    };
    assert_eq!(json_answer, msgpack_answer);
}
