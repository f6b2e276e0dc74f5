use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One element of `result.results[]` on a data line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultEntry {
    #[serde(default = "empty_object")]
    pub user_data: String,
    #[serde(default)]
    pub metadata: Vec<KeyValue>,
    #[serde(default)]
    pub labels: Vec<KeyValue>,
}

fn empty_object() -> String {
    "{}".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ResultBatch {
    /// `null` and absent both mean no entries.
    #[serde(default)]
    pub results: Option<Vec<ResultEntry>>,
}

/// The JSON document carried by a `data: ` line. Every member is optional:
/// acknowledgment and warning events carry no `result`.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct DataEvent {
    #[serde(default)]
    pub result: Option<ResultBatch>,
    #[serde(default)]
    pub warning: Option<serde_json::Value>,
    #[serde(default)]
    pub query_id: Option<serde_json::Value>,
}
