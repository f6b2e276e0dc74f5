use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{IclogsError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Syntax {
    Lucene,
    Dataprime,
    Unspecified,
}

impl Syntax {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lucene => "lucene",
            Self::Dataprime => "dataprime",
            Self::Unspecified => "unspecified",
        }
    }
}

impl FromStr for Syntax {
    type Err = IclogsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lucene" => Ok(Self::Lucene),
            "dataprime" => Ok(Self::Dataprime),
            "unspecified" => Ok(Self::Unspecified),
            _ => Err(IclogsError::Parse(format!("unknown query syntax: {s}"))),
        }
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage class searched by a query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Archive,
    FrequentSearch,
    Unspecified,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::FrequentSearch => "frequent_search",
            Self::Unspecified => "unspecified",
        }
    }

    /// Largest result count the service accepts for this tier.
    pub fn max_limit(self) -> Option<u32> {
        match self {
            Self::Archive => Some(50_000),
            Self::FrequentSearch => Some(12_000),
            Self::Unspecified => None,
        }
    }
}

impl FromStr for Tier {
    type Err = IclogsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "archive" => Ok(Self::Archive),
            "frequent_search" | "frequent-search" | "frequent" => Ok(Self::FrequentSearch),
            "unspecified" => Ok(Self::Unspecified),
            _ => Err(IclogsError::Parse(format!("unknown tier: {s}"))),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional shape of a query. Unset fields are left off the wire entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySpec {
    pub syntax: Option<Syntax>,
    pub limit: Option<u32>,
    pub tier: Option<Tier>,
    pub start_date: Option<DateTime<Local>>,
    pub end_date: Option<DateTime<Local>>,
}

impl QuerySpec {
    /// Sparse `metadata` object for the query request, `None` when nothing is set.
    pub fn to_metadata(&self) -> Option<Map<String, Value>> {
        let mut meta = Map::new();
        if let Some(syntax) = self.syntax {
            meta.insert("syntax".into(), Value::from(syntax.as_str()));
        }
        if let Some(limit) = self.limit {
            meta.insert("limit".into(), Value::from(limit));
        }
        if let Some(tier) = self.tier {
            meta.insert("tier".into(), Value::from(tier.as_str()));
        }
        if let Some(start) = self.start_date {
            meta.insert("start_date".into(), Value::from(format_wire_time(&start)));
        }
        if let Some(end) = self.end_date {
            meta.insert("end_date".into(), Value::from(format_wire_time(&end)));
        }

        if meta.is_empty() { None } else { Some(meta) }
    }
}

fn format_wire_time(ts: &DateTime<Local>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Body of `POST /v1/query`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QueryRequest<'a> {
    pub query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl<'a> QueryRequest<'a> {
    pub fn new(query: &'a str, spec: &QuerySpec) -> Self {
        Self {
            query,
            metadata: spec.to_metadata(),
        }
    }
}
