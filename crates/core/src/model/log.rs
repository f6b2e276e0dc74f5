use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::keypath;

/// One log occurrence reported by the query service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogRecord {
    pub time: DateTime<Local>,
    pub severity: String,
    /// Raw `user_data` JSON exactly as received.
    pub user_data: String,
    /// Labels rendered as `key:"value"`, in source order.
    pub labels: Vec<String>,
}

impl LogRecord {
    /// Resolves the human-readable message from `user_data`, trying `paths` in order.
    pub fn message<S: AsRef<str>>(&self, paths: &[S]) -> Result<String> {
        keypath::message_from_user_data(&self.user_data, paths)
    }
}

/// Everything one query produced: records in chronological order plus any
/// warnings the service streamed alongside them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    pub records: Vec<LogRecord>,
    pub warnings: Vec<String>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.warnings.is_empty()
    }
}
