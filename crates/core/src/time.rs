use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

use crate::error::{IclogsError, Result};

/// Minute-precision layout accepted by `--from` / `--to`.
pub const CLI_TIME_LAYOUT: &str = "%Y-%m-%dT%H:%M";

/// Source of "now". Passed explicitly so tests can pin the clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Local>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

/// Accepts `YYYY-MM-DDTHH:MM` (local), RFC3339, or a duration meaning "that long ago".
pub fn parse_time_or_relative(input: &str, clock: &dyn Clock) -> Result<DateTime<Local>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, CLI_TIME_LAYOUT) {
        return Local.from_local_datetime(&naive).earliest().ok_or_else(|| {
            IclogsError::Parse(format!("{input} does not exist in the local time zone"))
        });
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(ts.with_timezone(&Local));
    }

    if let Ok(duration) = humantime::parse_duration(input) {
        return subtract(clock.now(), duration);
    }

    Err(IclogsError::Parse(format!(
        "expected {CLI_TIME_LAYOUT}, RFC3339 time or duration, got {input}"
    )))
}

pub fn parse_duration_str(input: &str) -> Result<Duration> {
    humantime::parse_duration(input)
        .map_err(|e| IclogsError::Parse(format!("invalid duration {input}: {e}")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
}

impl TimeWindow {
    /// `end` defaults to now and `start` to `end - range`.
    pub fn resolve(
        start: Option<DateTime<Local>>,
        end: Option<DateTime<Local>>,
        range: Duration,
        clock: &dyn Clock,
    ) -> Result<Self> {
        let end = end.unwrap_or_else(|| clock.now());
        let start = match start {
            Some(start) => start,
            None => subtract(end, range)?,
        };
        if start > end {
            return Err(IclogsError::InvalidArgument(format!(
                "start time {start} is after end time {end}"
            )));
        }
        Ok(Self { start, end })
    }
}

fn subtract(ts: DateTime<Local>, duration: Duration) -> Result<DateTime<Local>> {
    ts.checked_sub_signed(to_chrono(duration)?).ok_or_else(|| {
        IclogsError::InvalidArgument(format!(
            "{} before {ts} is out of range",
            humantime::format_duration(duration)
        ))
    })
}

fn to_chrono(duration: Duration) -> Result<chrono::Duration> {
    chrono::Duration::from_std(duration)
        .map_err(|e| IclogsError::Parse(format!("failed to parse duration to chrono: {e}")))
}
