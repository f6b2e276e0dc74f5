//! Dotted key-path lookup over schema-free JSON payloads.
//!
//! Log producers put the human-readable message under different members
//! (`message`, `message_obj.msg`, `log`, ...). Callers pass an ordered list of
//! candidate paths and the first one that resolves wins.

use serde_json::Value;

use crate::error::{IclogsError, Result};

pub const DEFAULT_KEY_PATHS: [&str; 3] = ["message", "message_obj.msg", "log"];

pub fn default_key_paths() -> Vec<String> {
    DEFAULT_KEY_PATHS.iter().map(|p| p.to_string()).collect()
}

/// Walks `path` through nested objects and stringifies the value it ends on.
pub fn resolve(tree: &Value, path: &str) -> Result<String> {
    let mut current = tree;
    for segment in path.split('.') {
        current = current
            .as_object()
            .and_then(|obj| obj.get(segment))
            .ok_or_else(|| IclogsError::KeyNotFound(path.to_string()))?;
    }
    Ok(value_to_text(current))
}

/// Tries every path in order. When none resolves the last failure is returned.
pub fn resolve_first<S: AsRef<str>>(tree: &Value, paths: &[S]) -> Result<String> {
    let mut last_err = IclogsError::KeyNotFound(String::new());
    for path in paths {
        match resolve(tree, path.as_ref()) {
            Ok(text) => return Ok(text),
            Err(err) => last_err = err,
        }
    }
    Err(last_err)
}

pub fn message_from_user_data<S: AsRef<str>>(raw: &str, paths: &[S]) -> Result<String> {
    let tree: Value = serde_json::from_str(raw).map_err(IclogsError::UserDataDecode)?;
    resolve_first(&tree, paths)
}

/// Splits a comma separated `--message-fields` value.
pub fn parse_key_paths(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
