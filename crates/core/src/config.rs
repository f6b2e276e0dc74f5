use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{IclogsError, Result};
use crate::keypath::{default_key_paths, parse_key_paths};

pub const DEFAULT_AUTH_ENDPOINT: &str = "https://iam.cloud.ibm.com";
pub const DEFAULT_TIME_RANGE: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(3 * 60);

pub const ENV_API_KEY: &str = "LOGS_API_KEY";
pub const ENV_LOGS_ENDPOINT: &str = "LOGS_ENDPOINT";
pub const ENV_AUTH_ENDPOINT: &str = "ICLOGS_AUTH_URL";
pub const ENV_MESSAGE_FIELDS: &str = "ICLOGS_MESSAGE_FIELDS";
pub const ENV_TIME_RANGE: &str = "ICLOGS_TIME_RANGE";
pub const ENV_QUERY_TIMEOUT: &str = "ICLOGS_QUERY_TIMEOUT";
pub const ENV_CONFIG_PATH: &str = "ICLOGS_CONFIG";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_key: Option<String>,
    pub logs_endpoint: Option<String>,
    pub auth_endpoint: String,
    pub message_fields: Vec<String>,
    pub time_range: Duration,
    pub query_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            logs_endpoint: None,
            auth_endpoint: DEFAULT_AUTH_ENDPOINT.to_string(),
            message_fields: default_key_paths(),
            time_range: DEFAULT_TIME_RANGE,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }
}

impl Config {
    /// Defaults, then the config file, then the process environment.
    pub fn load() -> Result<Self> {
        Self::load_with(|key| env::var(key).ok())
    }

    pub fn load_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let config_path = config_file_path(&lookup);
        if let Some(file_overrides) = load_file_overrides(&config_path)? {
            apply_overrides(&mut cfg, file_overrides, "config file")?;
        }
        apply_overrides(&mut cfg, load_env_overrides(&lookup), "environment")?;
        Ok(cfg)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigOverrides {
    api_key: Option<String>,
    logs_endpoint: Option<String>,
    auth_endpoint: Option<String>,
    message_fields: Option<String>,
    time_range: Option<String>,
    query_timeout: Option<String>,
}

fn config_file_path<F>(lookup: &F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = lookup(ENV_CONFIG_PATH) {
        return PathBuf::from(path);
    }

    let home = lookup("HOME").unwrap_or_else(|| ".".to_string());
    let config_home = lookup("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(home).join(".config"));
    config_home.join("iclogs/config.toml")
}

fn load_file_overrides(path: &Path) -> Result<Option<ConfigOverrides>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| IclogsError::Config(format!("failed reading {}: {e}", path.display())))?;
    let parsed: ConfigOverrides = toml::from_str(&raw)
        .map_err(|e| IclogsError::Config(format!("failed parsing {}: {e}", path.display())))?;
    Ok(Some(parsed))
}

fn load_env_overrides<F>(lookup: &F) -> ConfigOverrides
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.is_empty());
    ConfigOverrides {
        api_key: var(ENV_API_KEY),
        logs_endpoint: var(ENV_LOGS_ENDPOINT),
        auth_endpoint: var(ENV_AUTH_ENDPOINT),
        message_fields: var(ENV_MESSAGE_FIELDS),
        time_range: var(ENV_TIME_RANGE),
        query_timeout: var(ENV_QUERY_TIMEOUT),
    }
}

fn apply_overrides(cfg: &mut Config, overrides: ConfigOverrides, source: &str) -> Result<()> {
    if let Some(v) = overrides.api_key {
        cfg.api_key = Some(v);
    }
    if let Some(v) = overrides.logs_endpoint {
        cfg.logs_endpoint = Some(v);
    }
    if let Some(v) = overrides.auth_endpoint {
        cfg.auth_endpoint = v;
    }
    if let Some(v) = overrides.message_fields {
        let fields = parse_key_paths(&v);
        if fields.is_empty() {
            return Err(IclogsError::Config(format!(
                "bad message_fields in {source}: no key paths (value={v})"
            )));
        }
        cfg.message_fields = fields;
    }
    if let Some(v) = overrides.time_range {
        cfg.time_range = humantime::parse_duration(&v).map_err(|e| {
            IclogsError::Config(format!("bad time_range in {source}: {e} (value={v})"))
        })?;
    }
    if let Some(v) = overrides.query_timeout {
        cfg.query_timeout = humantime::parse_duration(&v).map_err(|e| {
            IclogsError::Config(format!("bad query_timeout in {source}: {e} (value={v})"))
        })?;
    }
    Ok(())
}
