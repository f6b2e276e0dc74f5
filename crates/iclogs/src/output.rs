use std::io::{self, Write};

use iclogs_core::model::log::LogRecord;
use owo_colors::OwoColorize;

pub const DISPLAY_TIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S%.6f";

#[derive(Debug, Clone)]
pub struct DisplayOptions {
    pub message_fields: Vec<String>,
    pub show_json: bool,
    pub show_labels: bool,
    pub show_severity: bool,
    pub show_timestamp: bool,
    pub color: bool,
}

pub fn write_records<W: Write>(
    out: &mut W,
    records: &[LogRecord],
    opts: &DisplayOptions,
) -> io::Result<()> {
    for record in records {
        if let Some(line) = render_record(record, opts) {
            writeln!(out, "{line}")?;
        }
    }
    out.flush()
}

pub fn write_warnings<W: Write>(out: &mut W, warnings: &[String]) -> io::Result<()> {
    for warning in warnings {
        writeln!(out, "warning: {warning}")?;
    }
    Ok(())
}

/// `None` when the message cannot be resolved and no prefix was requested.
pub fn render_record(record: &LogRecord, opts: &DisplayOptions) -> Option<String> {
    let mut prefix = String::new();
    if opts.show_timestamp {
        prefix.push_str(&format!("{}: ", record.time.format(DISPLAY_TIME_LAYOUT)));
    }
    if opts.show_severity {
        prefix.push_str(&format!(
            "[{}] ",
            severity_label(&record.severity, opts.color)
        ));
    }
    if opts.show_labels {
        prefix.push_str(&format!("<{}> ", record.labels.join(", ")));
    }

    if opts.show_json {
        return Some(format!("{prefix}{}", record.user_data));
    }

    match record.message(&opts.message_fields) {
        Ok(message) => Some(format!("{prefix}{message}")),
        Err(err) => {
            tracing::debug!(error = %err, time = %record.time, "no message in record");
            let prefix = prefix.trim_end();
            (!prefix.is_empty()).then(|| prefix.to_string())
        }
    }
}

fn severity_label(severity: &str, color: bool) -> String {
    if !color {
        return severity.to_string();
    }
    match severity.to_ascii_lowercase().as_str() {
        "debug" | "verbose" => severity.bright_black().to_string(),
        "info" | "information" => severity.green().to_string(),
        "warning" | "warn" => severity.yellow().to_string(),
        "error" => severity.red().to_string(),
        "critical" => severity.magenta().to_string(),
        _ => severity.to_string(),
    }
}
