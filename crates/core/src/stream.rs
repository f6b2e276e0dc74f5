//! Parser for the line-oriented event stream returned by the query endpoint.
//!
//! Only lines starting with `data: ` carry payloads. Blank lines, `: success`
//! markers and any other annotations are skipped. Records are sorted by time
//! once the stream ends, since the service does not emit them in order.

use std::io::{ErrorKind, Read};

use serde_json::Value;

use crate::error::{IclogsError, Result};
use crate::model::log::QueryResult;
use crate::model::wire::{DataEvent, ResultEntry};
use crate::record::reconstruct;

pub const DATA_PREFIX: &[u8] = b"data: ";

/// Upper bound for a single line, terminator excluded.
pub const MAX_LINE_BYTES: usize = 2048 * 1024;

const READ_CHUNK_BYTES: usize = 64 * 1024;

/// Decoding of one stream line.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    Ignored,
    Batch {
        entries: Vec<ResultEntry>,
        warnings: Vec<String>,
    },
}

/// Decodes a single line (without its `\n`). `line_no` is only used for errors.
pub fn parse_line(line_no: usize, line: &[u8]) -> Result<ParsedLine> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(ParsedLine::Ignored);
    };

    let event: DataEvent =
        serde_json::from_slice(payload).map_err(|source| IclogsError::LineDecode {
            line: line_no,
            source,
        })?;

    if let Some(query_id) = &event.query_id {
        tracing::debug!(query_id = %query_id, "query acknowledged");
    }

    let warnings = event.warning.map(warning_messages).unwrap_or_default();
    let entries = event.result.and_then(|r| r.results).unwrap_or_default();
    if entries.is_empty() && warnings.is_empty() {
        return Ok(ParsedLine::Ignored);
    }

    Ok(ParsedLine::Batch { entries, warnings })
}

/// Warnings are keyed by kind. Shapes other than an object are kept as text
/// so an unexpected warning never fails the stream.
fn warning_messages(warning: Value) -> Vec<String> {
    match warning {
        Value::Object(kinds) => kinds
            .into_iter()
            .map(
                |(kind, body)| match body.get("warning_message").and_then(Value::as_str) {
                    Some(message) => message.to_string(),
                    None => format!("{kind}: {body}"),
                },
            )
            .collect(),
        Value::Null => Vec::new(),
        Value::String(message) => vec![message],
        other => vec![other.to_string()],
    }
}

/// Incremental stream parser. Feed it chunks as they arrive and call
/// [`StreamParser::finish`] at end of stream. Any error is fatal: the parser
/// must be dropped afterwards.
#[derive(Debug)]
pub struct StreamParser {
    pending: Vec<u8>,
    scanned: usize,
    line_no: usize,
    max_line_bytes: usize,
    result: QueryResult,
}

impl Default for StreamParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamParser {
    pub fn new() -> Self {
        Self::with_max_line_bytes(MAX_LINE_BYTES)
    }

    pub fn with_max_line_bytes(max_line_bytes: usize) -> Self {
        Self {
            pending: Vec::new(),
            scanned: 0,
            line_no: 0,
            max_line_bytes,
            result: QueryResult::default(),
        }
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Result<()> {
        let mut pending = std::mem::take(&mut self.pending);
        pending.extend_from_slice(chunk);

        let mut start = 0;
        let mut search_from = self.scanned;
        while let Some(pos) = pending[search_from..].iter().position(|b| *b == b'\n') {
            let end = search_from + pos;
            self.consume_line(&pending[start..end])?;
            start = end + 1;
            search_from = start;
        }
        pending.drain(..start);

        // The unterminated tail is already too long: fail now rather than buffer more.
        let tail = pending.strip_suffix(b"\r").unwrap_or(&pending[..]);
        if tail.len() > self.max_line_bytes {
            return Err(IclogsError::LineTooLong {
                line: self.line_no + 1,
                limit: self.max_line_bytes,
            });
        }

        self.scanned = pending.len();
        self.pending = pending;
        Ok(())
    }

    pub fn finish(mut self) -> Result<QueryResult> {
        let tail = std::mem::take(&mut self.pending);
        if !tail.is_empty() {
            self.consume_line(&tail)?;
        }

        let mut result = self.result;
        result.records.sort_by_key(|r| r.time);

        tracing::debug!(
            lines = self.line_no,
            records = result.records.len(),
            warnings = result.warnings.len(),
            "response stream parsed"
        );
        Ok(result)
    }

    /// Drains `reader` through the parser in fixed-size chunks.
    pub fn read_to_end<R: Read>(mut self, mut reader: R) -> Result<QueryResult> {
        let mut buf = vec![0u8; READ_CHUNK_BYTES];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            self.feed(&buf[..n])?;
        }
        self.finish()
    }

    fn consume_line(&mut self, line: &[u8]) -> Result<()> {
        self.line_no += 1;
        let line_no = self.line_no;

        let content = line.strip_suffix(b"\r").unwrap_or(line);
        if content.len() > self.max_line_bytes {
            return Err(IclogsError::LineTooLong {
                line: line_no,
                limit: self.max_line_bytes,
            });
        }

        let ParsedLine::Batch { entries, warnings } = parse_line(line_no, content)? else {
            return Ok(());
        };

        for entry in entries {
            let record = reconstruct(&entry.metadata, &entry.labels, entry.user_data).map_err(
                |e| IclogsError::Record {
                    line: line_no,
                    source: Box::new(e),
                },
            )?;
            self.result.records.push(record);
        }
        self.result.warnings.extend(warnings);
        Ok(())
    }
}

pub fn parse_reader<R: Read>(reader: R) -> Result<QueryResult> {
    StreamParser::new().read_to_end(reader)
}

pub fn parse_str(input: &str) -> Result<QueryResult> {
    parse_reader(input.as_bytes())
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Local, TimeZone};

    use super::*;

    fn data_line(ts: &str, severity: &str, user_data: &str) -> String {
        let event = serde_json::json!({
            "result": {
                "results": [{
                    "metadata": [
                        {"key": "timestamp", "value": ts},
                        {"key": "severity", "value": severity}
                    ],
                    "labels": [{"key": "applicationname", "value": "app"}],
                    "user_data": user_data
                }]
            }
        });
        format!("data: {event}\n")
    }

    fn at(h: u32, m: u32, s: u32, micros: i64) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 1, 11, h, m, s).unwrap() + Duration::microseconds(micros)
    }

    #[test]
    fn single_result_scenario() {
        let input = "data: {\"result\":{\"results\":[{\"metadata\":[{\"key\":\"timestamp\",\"value\":\"2025-01-11T18:52:23.025000\"},{\"key\":\"severity\",\"value\":\"Info\"}],\"labels\":[],\"user_data\":\"{\\\"message\\\":\\\"hello\\\"}\"}]}}\n";
        let result = parse_str(input).unwrap();

        assert_eq!(result.records.len(), 1);
        let record = &result.records[0];
        assert_eq!(record.time, at(18, 52, 23, 25_000));
        assert_eq!(record.severity, "Info");
        assert_eq!(record.user_data, r#"{"message":"hello"}"#);
        assert!(record.labels.is_empty());
        assert_eq!(record.message(&["message"]).unwrap(), "hello");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn sorts_records_chronologically() {
        let input = [
            ": success\n".to_string(),
            data_line("2025-01-11T18:52:23.026304", "Info", r#"{"message":"third"}"#),
            "\n".to_string(),
            data_line("2025-01-11T18:52:21.026304", "Debug", r#"{"message":"first"}"#),
            data_line("2025-01-11T18:52:21.02636", "Info", r#"{"message":"second"}"#),
        ]
        .concat();

        let result = parse_str(&input).unwrap();
        let messages: Vec<String> = result
            .records
            .iter()
            .map(|r| r.message(&["message"]).unwrap())
            .collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
        assert_eq!(result.records[0].time, at(18, 52, 21, 26_304));
        assert_eq!(result.records[1].time, at(18, 52, 21, 26_360));
    }

    #[test]
    fn equal_timestamps_keep_arrival_order() {
        let input = [
            data_line("2025-01-11T18:52:23", "Info", r#"{"message":"b"}"#),
            data_line("2025-01-11T18:52:22", "Info", r#"{"message":"a"}"#),
            data_line("2025-01-11T18:52:23", "Info", r#"{"message":"c"}"#),
        ]
        .concat();

        let result = parse_str(&input).unwrap();
        let order: Vec<&str> = result.records.iter().map(|r| r.user_data.as_str()).collect();
        assert_eq!(
            order,
            vec![r#"{"message":"a"}"#, r#"{"message":"b"}"#, r#"{"message":"c"}"#]
        );
    }

    #[test]
    fn empty_stream_is_empty_result() {
        assert!(parse_str("").unwrap().is_empty());
    }

    #[test]
    fn non_data_lines_are_skipped() {
        let input = ": success\n\nevent: ping\nid: 7\n: success\n";
        let result = parse_str(input).unwrap();
        assert!(result.records.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn data_lines_without_results_are_ignored() {
        let input = "data: {\"query_id\":{\"query_id\":\"abc\"}}\ndata: {\"result\":{\"results\":[]}}\ndata: {}\n";
        assert!(parse_str(input).unwrap().is_empty());
    }

    #[test]
    fn collects_warnings_in_arrival_order() {
        let input = concat!(
            "data: {\"warning\":{\"compile_warning\":{\"warning_message\":\"keypath does not exist\"}}}\n",
            ": success\n",
            "data: {\"warning\":{\"time_range_warning\":{\"start_date\":\"x\"}}}\n",
        );
        let result = parse_str(input).unwrap();
        assert!(result.records.is_empty());
        assert_eq!(
            result.warnings,
            vec![
                "keypath does not exist".to_string(),
                "time_range_warning: {\"start_date\":\"x\"}".to_string()
            ]
        );
    }

    #[test]
    fn warning_kinds_keep_stream_order() {
        let input = "data: {\"warning\":{\"zeta\":{\"warning_message\":\"first\"},\"alpha\":{\"warning_message\":\"second\"}}}\n";
        let result = parse_str(input).unwrap();
        assert_eq!(result.warnings, vec!["first", "second"]);
    }

    #[test]
    fn unusual_warning_shapes_are_kept_as_text() {
        let input = concat!(
            "data: {\"warning\":\"slow query\"}\n",
            "data: {\"warning\":[1,2]}\n",
            "data: {\"warning\":null}\n",
        );
        let result = parse_str(input).unwrap();
        assert!(result.records.is_empty());
        assert_eq!(result.warnings, vec!["slow query", "[1,2]"]);
    }

    #[test]
    fn null_results_are_empty() {
        let input = "data: {\"result\":{\"results\":null}}\ndata: {\"result\":null}\n";
        assert!(parse_str(input).unwrap().is_empty());
    }

    #[test]
    fn handles_crlf_and_missing_final_newline() {
        let line = data_line("2025-01-11T18:52:23", "Info", "{}");
        let input = format!(": success\r\n{}", line.trim_end().to_string() + "\r");
        let result = parse_str(&input).unwrap();
        assert_eq!(result.records.len(), 1);
    }

    #[test]
    fn lines_split_across_chunks() {
        let input = [
            data_line("2025-01-11T18:52:23", "Info", r#"{"message":"b"}"#),
            data_line("2025-01-11T18:52:22", "Info", r#"{"message":"a"}"#),
        ]
        .concat();

        let mut parser = StreamParser::new();
        for byte in input.as_bytes() {
            parser.feed(std::slice::from_ref(byte)).unwrap();
        }
        let result = parser.finish().unwrap();
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].user_data, r#"{"message":"a"}"#);
    }

    #[test]
    fn long_line_aborts_parse() {
        let valid = data_line("2025-01-11T18:52:23", "Info", "{}");
        let input = format!("{valid}: success\n{}\n", " ".repeat(valid.len() + 10));

        let err = StreamParser::with_max_line_bytes(valid.len())
            .read_to_end(input.as_bytes())
            .unwrap_err();
        assert!(matches!(err, IclogsError::LineTooLong { line: 3, .. }));
    }

    #[test]
    fn long_partial_line_fails_before_newline_arrives() {
        let mut parser = StreamParser::with_max_line_bytes(8);
        parser.feed(b"data: {}\n").unwrap();
        parser.feed(b"123456").unwrap();
        let err = parser.feed(b"789").unwrap_err();
        assert!(matches!(err, IclogsError::LineTooLong { line: 2, limit: 8 }));
    }

    #[test]
    fn default_limit_accepts_one_megabyte_line() {
        let input = format!(
            "{}: success\n{}",
            data_line("2025-01-11T18:52:23", "Info", "{}"),
            " ".repeat(1024 * 1024)
        );
        assert_eq!(parse_str(&input).unwrap().records.len(), 1);
    }

    #[test]
    fn default_limit_rejects_oversized_line() {
        let input = format!("{}\n", "x".repeat(MAX_LINE_BYTES + 1));
        assert!(matches!(
            parse_str(&input),
            Err(IclogsError::LineTooLong { line: 1, .. })
        ));
    }

    #[test]
    fn malformed_json_reports_line() {
        let input = ": success\ndata: {\"result\": [\n";
        let err = parse_str(input).unwrap_err();
        assert!(matches!(err, IclogsError::LineDecode { line: 2, .. }));
    }

    #[test]
    fn broken_entry_fails_whole_parse() {
        let broken = "data: {\"result\":{\"results\":[{\"metadata\":[{\"key\":\"severity\",\"value\":\"Info\"}],\"labels\":[],\"user_data\":\"{}\"}]}}\n";
        let input = format!(
            "{}{broken}",
            data_line("2025-01-11T18:52:23", "Info", "{}")
        );
        let err = parse_str(&input).unwrap_err();
        match err {
            IclogsError::Record { line, source } => {
                assert_eq!(line, 2);
                assert!(matches!(source.as_ref(), IclogsError::MissingField(k) if k == "timestamp"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn parse_line_classifies_lines() {
        assert_eq!(parse_line(1, b": success").unwrap(), ParsedLine::Ignored);
        assert_eq!(parse_line(1, b"data:{}").unwrap(), ParsedLine::Ignored);
        match parse_line(1, data_line("2025-01-11T18:52:23", "Info", "{}").trim_end().as_bytes())
            .unwrap()
        {
            ParsedLine::Batch { entries, warnings } => {
                assert_eq!(entries.len(), 1);
                assert!(warnings.is_empty());
            }
            ParsedLine::Ignored => panic!("expected batch"),
        }
    }
}
