use serde::Serialize;

use kusto_ingest::records::{encode_line, encode_lines};

#[derive(Serialize)]
struct Event<'a> {
    pipeline_path: &'a str,
    what: f64,
}

#[test]
fn heterogeneous_records_become_one_line_each() {
    let records = vec![
        serde_json::json!({"a": 1}),
        serde_json::json!("plain text"),
        serde_json::json!(42),
        serde_json::json!(true),
    ];
    let payload = String::from_utf8(encode_lines(&records).unwrap()).unwrap();
    assert_eq!(payload, "{\"a\":1}\nplain text\n42\ntrue\n");
}

#[test]
fn struct_lines_keep_field_order() {
    let line = encode_line(&Event {
        pipeline_path: "/usr/share/logstash/input/Simple.json",
        what: 0.5,
    })
    .unwrap();
    assert_eq!(
        line,
        "{\"pipeline_path\":\"/usr/share/logstash/input/Simple.json\",\"what\":0.5}\n"
    );
}

#[test]
fn string_with_newline_is_left_raw() {
    // The caller owns the line structure of plain strings.
    let line = encode_line("first\nsecond").unwrap();
    assert_eq!(line, "first\nsecond\n");
}
