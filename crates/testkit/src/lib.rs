mod server;

use chrono::{Duration, Local, TimeZone};
use iclogs_core::model::log::LogRecord;
use serde_json::{Value, json};

pub use server::MockServer;

pub const GOOD_TOKEN: &str = "Good_Token";
pub const GOOD_API_KEY: &str = "Good_Key";
/// API key for which the mock token endpoint answers with a non-JSON body.
pub const GARBAGE_API_KEY: &str = "Garbage_Key";
pub const GOOD_QUERY: &str = "Good Query";

/// Messages of [`response_logs`] in chronological order.
pub const EXPECTED_MESSAGES: [&str; 4] = [
    "2025-01-11 18:52:23.025, Debug, Example message first",
    "2025-01-11 18:52:23.026, Information, second message",
    "2025-01-11 18:52:23.025, Information, Example message",
    "2025-01-11 18:52:23.026, Information, Next message",
];

/// A container log payload with the message stored under `field`
/// (`message`, `log` or `message_obj`, the latter nesting it under `msg`).
pub fn user_data(field: &str, message: &str) -> String {
    let msg = Value::from(message).to_string();
    let body = if field == "message_obj" {
        format!(r#"{{"msg":{msg},"level":"debug","caller":"runtime/runtime.go:83"}}"#)
    } else {
        msg
    };
    format!(
        r#"{{"node_name":"10.10.10.10","kubernetes":{{"container_name":"some-agent","namespace_name":"some-observe","pod_name":"some-agent-c7gz7"}},"stream":"stdout", "logtag":"F","{field}":{body},"file":"/var/log/containers/some-agent-c7gz7.log"}}"#
    )
}

pub fn labels() -> Value {
    json!([
        {"key": "applicationname", "value": "some-observe"},
        {"key": "subsystemname", "value": "some-agent"},
        {"key": "computername", "value": ""}
    ])
}

pub fn expected_labels() -> Vec<String> {
    vec![
        "applicationname:\"some-observe\"".to_string(),
        "subsystemname:\"some-agent\"".to_string(),
        "computername:\"\"".to_string(),
    ]
}

pub fn result_entry(timestamp: &str, severity: &str, user_data: &str) -> Value {
    json!({
        "metadata": [
            {"key": "timestamp", "value": timestamp},
            {"key": "severity", "value": severity},
            {"key": "priorityclass", "value": "low"}
        ],
        "labels": labels(),
        "user_data": user_data
    })
}

pub fn data_line(entries: Vec<Value>) -> String {
    format!("data: {}\n", json!({"result": {"results": entries}}))
}

fn query_id_line() -> String {
    "data: {\"query_id\":{\"query_id\":\"6f2c1c0e-3f4b-4c55-9a40-0b8a7e6f1d2a\"}}\n".to_string()
}

/// Four records over two data lines, deliberately out of chronological order.
pub fn response_logs() -> String {
    [
        query_id_line(),
        data_line(vec![
            result_entry(
                "2025-01-11T18:52:23.026304",
                "Info",
                &user_data("message_obj", EXPECTED_MESSAGES[2]),
            ),
            result_entry(
                "2025-01-11T18:52:23.02636",
                "Info",
                &user_data("message", EXPECTED_MESSAGES[3]),
            ),
        ]),
        ": success\n".to_string(),
        "\n".to_string(),
        data_line(vec![
            result_entry(
                "2025-01-11T18:52:21.026304",
                "Debug",
                &user_data("message", EXPECTED_MESSAGES[0]),
            ),
            result_entry(
                "2025-01-11T18:52:21.02636",
                "Info",
                &user_data("log", EXPECTED_MESSAGES[1]),
            ),
        ]),
        ": success\n".to_string(),
    ]
    .concat()
}

pub fn response_no_logs() -> String {
    [query_id_line(), ": success\n".to_string(), "\n".to_string()].concat()
}

pub const EXPECTED_WARNINGS: [&str; 2] = [
    "keypath does not exist\n'w.e' in line 0 at column 0",
    "tokens less than 4 bytes or more than 64 bytes in UTF-8 are not indexed and will likely be excluded from the query\n'12' in line 0 at column 22",
];

pub fn response_warnings() -> String {
    let warning = |message: &str| {
        format!(
            "data: {}\n",
            json!({"warning": {"compile_warning": {"warning_message": message}}})
        )
    };
    [
        query_id_line(),
        warning(EXPECTED_WARNINGS[0]),
        warning(EXPECTED_WARNINGS[1]),
        ": success\n".to_string(),
    ]
    .concat()
}

/// Records as the front end receives them, for formatting tests.
pub fn sample_records() -> Vec<LogRecord> {
    let base = Local.with_ymd_and_hms(2025, 1, 11, 18, 52, 21).unwrap();
    vec![
        LogRecord {
            time: base + Duration::microseconds(26_304),
            severity: "Debug".to_string(),
            user_data: r#"{"message":"some_message"}"#.to_string(),
            labels: vec!["label:\"value-of-label\"".to_string()],
        },
        LogRecord {
            time: base + Duration::microseconds(26_360),
            severity: "Info".to_string(),
            user_data: r#"{"unrelated":true}"#.to_string(),
            labels: vec![
                "label:\"value-of-label\"".to_string(),
                "other:\"x\"".to_string(),
            ],
        },
    ]
}
