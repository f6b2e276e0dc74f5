use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

use crate::error::{IclogsError, Result};
use crate::model::log::LogRecord;
use crate::model::wire::KeyValue;

pub const TIMESTAMP_FIELD: &str = "timestamp";
pub const SEVERITY_FIELD: &str = "severity";

const TIMESTAMP_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const MAX_FRACTION_DIGITS: usize = 6;

/// Builds a [`LogRecord`] from one result entry. `raw_user_data` is kept as is.
pub fn reconstruct(
    metadata: &[KeyValue],
    labels: &[KeyValue],
    raw_user_data: String,
) -> Result<LogRecord> {
    let timestamp = lookup(metadata, TIMESTAMP_FIELD)?;
    let severity = lookup(metadata, SEVERITY_FIELD)?;
    let time = parse_timestamp(timestamp)?;

    Ok(LogRecord {
        time,
        severity: severity.to_string(),
        user_data: raw_user_data,
        labels: labels.iter().map(render_label).collect(),
    })
}

pub fn render_label(label: &KeyValue) -> String {
    format!("{}:\"{}\"", label.key, label.value)
}

/// Parses `YYYY-MM-DDTHH:MM:SS[.ffffff]` as a local wall-clock time.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Local>> {
    let bad = |reason: &str| IclogsError::TimestampParse {
        value: input.to_string(),
        reason: reason.to_string(),
    };

    if !matches_layout(input.as_bytes()) {
        return Err(bad("expected layout YYYY-MM-DDTHH:MM:SS[.ffffff]"));
    }
    if let Some((_, fraction)) = input.get(19..).and_then(|rest| rest.split_once('.')) {
        if fraction.is_empty() || fraction.len() > MAX_FRACTION_DIGITS {
            return Err(bad("fractional seconds must have 1 to 6 digits"));
        }
    }

    let naive = NaiveDateTime::parse_from_str(input, TIMESTAMP_LAYOUT)
        .map_err(|e| bad(&e.to_string()))?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| bad("time does not exist in the local time zone"))
}

/// Fixed-width check of the `YYYY-MM-DDTHH:MM:SS` head. chrono alone accepts
/// unpadded and space-padded fields.
fn matches_layout(bytes: &[u8]) -> bool {
    const HEAD: &[u8; 19] = b"dddd-dd-ddTdd:dd:dd";
    bytes.len() >= HEAD.len()
        && HEAD.iter().zip(bytes).all(|(&expected, &actual)| match expected {
            b'd' => actual.is_ascii_digit(),
            sep => actual == sep,
        })
}

fn lookup<'a>(pairs: &'a [KeyValue], key: &str) -> Result<&'a str> {
    pairs
        .iter()
        .find(|kv| kv.key == key)
        .map(|kv| kv.value.as_str())
        .ok_or_else(|| IclogsError::MissingField(key.to_string()))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Timelike};

    use super::*;

    fn metadata(ts: &str, severity: &str) -> Vec<KeyValue> {
        vec![
            KeyValue::new("timestamp", ts),
            KeyValue::new("severity", severity),
        ]
    }

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32, micros: i64) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap() + Duration::microseconds(micros)
    }

    #[test]
    fn builds_record_from_entry() {
        let labels = vec![
            KeyValue::new("applicationname", "some-observe"),
            KeyValue::new("computername", ""),
        ];
        let record = reconstruct(
            &metadata("2025-01-11T18:52:23.025000", "Info"),
            &labels,
            r#"{"message":"hello"}"#.to_string(),
        )
        .unwrap();

        assert_eq!(record.time, local(2025, 1, 11, 18, 52, 23, 25_000));
        assert_eq!(record.severity, "Info");
        assert_eq!(record.user_data, r#"{"message":"hello"}"#);
        assert_eq!(
            record.labels,
            vec![
                "applicationname:\"some-observe\"".to_string(),
                "computername:\"\"".to_string()
            ]
        );
    }

    #[test]
    fn keeps_user_data_verbatim() {
        let raw = "{ \"b\" : 1,\n  \"a\":[ ] }".to_string();
        let record = reconstruct(&metadata("2025-01-11T18:52:23", "Debug"), &[], raw.clone())
            .unwrap();
        assert_eq!(record.user_data, raw);
    }

    #[test]
    fn keeps_duplicate_labels_in_order() {
        let labels = vec![KeyValue::new("k", "1"), KeyValue::new("k", "1")];
        let record =
            reconstruct(&metadata("2025-01-11T18:52:23", "Info"), &labels, "{}".into()).unwrap();
        assert_eq!(record.labels, vec!["k:\"1\"", "k:\"1\""]);
    }

    #[test]
    fn first_metadata_occurrence_wins() {
        let mut meta = metadata("2025-01-11T18:52:23", "Info");
        meta.push(KeyValue::new("severity", "Error"));
        let record = reconstruct(&meta, &[], "{}".into()).unwrap();
        assert_eq!(record.severity, "Info");
    }

    #[test]
    fn missing_timestamp_is_reported() {
        let meta = vec![KeyValue::new("severity", "Info")];
        let err = reconstruct(&meta, &[], "{}".into()).unwrap_err();
        assert!(matches!(err, IclogsError::MissingField(k) if k == "timestamp"));
    }

    #[test]
    fn missing_severity_is_reported() {
        let meta = vec![KeyValue::new("timestamp", "2025-01-11T18:52:23")];
        let err = reconstruct(&meta, &[], "{}".into()).unwrap_err();
        assert!(matches!(err, IclogsError::MissingField(k) if k == "severity"));
    }

    #[test]
    fn parses_fraction_lengths() {
        assert_eq!(
            parse_timestamp("2025-01-11T18:52:21.026304").unwrap(),
            local(2025, 1, 11, 18, 52, 21, 26_304)
        );
        assert_eq!(
            parse_timestamp("2025-01-11T18:52:21.5").unwrap(),
            local(2025, 1, 11, 18, 52, 21, 500_000)
        );
        let whole = parse_timestamp("2025-01-11T18:52:21").unwrap();
        assert_eq!(whole.nanosecond(), 0);
    }

    #[test]
    fn rejects_malformed_timestamps() {
        for input in [
            "",
            "2025-01-11",
            "25-01-11T18:52:21",
            "2025-01-11 18:52:21",
            "2025-01-11T18:52:21.",
            "2025-01-11T18:52:21.1234567",
            "2025-01-11T18:52:21Z",
            "2025-13-11T18:52:21",
            "2025-1-11T18:52:21.5",
            "2025-01-11T 8:52:21.5",
            "2025-01-11T18:5:21.50",
            "2025/01/11T18:52:21",
            "2025-01-11T18-52-21",
            "2025-01-11t18:52:21",
        ] {
            let err = parse_timestamp(input).unwrap_err();
            assert!(
                matches!(err, IclogsError::TimestampParse { .. }),
                "expected parse error for {input:?}"
            );
        }
    }
}
