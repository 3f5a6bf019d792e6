// SPDX-License-Identifier: Apache-2.0

//! Gateway configuration.
//!
//! Values come from an optional `KEY=VALUE` file named by
//! `QUERYGATE_CONFIG_PATH`, overridden by the process environment.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::cache::{DEFAULT_MAX_ENTRIES, DEFAULT_TTL};
use crate::execution::executor::DEFAULT_FETCH_TIMEOUT;

pub const CONFIG_PATH_KEY: &str = "QUERYGATE_CONFIG_PATH";

const DEFAULT_TENANT: &str = "default";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config line {line} ({reason})")]
    FileParse { line: usize, reason: &'static str },

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

impl ConfigError {
    fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    pub policy_path: Option<PathBuf>,
    pub policy_watch: bool,
    pub cache_max_entries: usize,
    pub cache_ttl: Duration,
    pub fetch_timeout: Duration,
    /// Per-source overrides of connector-declared rate limits; 0 disables
    pub rate_limits: HashMap<String, u32>,
    pub default_tenant: String,
    pub log_dir: Option<PathBuf>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
            policy_path: None,
            policy_watch: true,
            cache_max_entries: DEFAULT_MAX_ENTRIES,
            cache_ttl: DEFAULT_TTL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            rate_limits: HashMap::new(),
            default_tenant: DEFAULT_TENANT.to_string(),
            log_dir: None,
        }
    }
}

impl GatewayConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let mut merged = HashMap::new();

        if let Ok(config_path) = std::env::var(CONFIG_PATH_KEY) {
            let config_path = config_path.trim();
            if !config_path.is_empty() {
                merged.extend(parse_env_file(config_path)?);
            }
        }

        merged.extend(std::env::vars());

        Self::from_kv(&merged)
    }

    pub fn from_kv(kv: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bind_addr = match non_empty(kv.get("QUERYGATE_BIND_ADDR")) {
            Some(raw) => raw
                .parse::<SocketAddr>()
                .map_err(|_| ConfigError::invalid("QUERYGATE_BIND_ADDR", "must be host:port"))?,
            None => defaults.bind_addr,
        };

        let policy_path = non_empty(kv.get("QUERYGATE_POLICY_PATH")).map(PathBuf::from);
        let policy_watch = match non_empty(kv.get("QUERYGATE_POLICY_WATCH")) {
            Some(raw) => parse_bool(raw).ok_or_else(|| {
                ConfigError::invalid("QUERYGATE_POLICY_WATCH", "must be a boolean")
            })?,
            None => defaults.policy_watch,
        };

        let cache_max_entries = parse_positive(
            kv.get("QUERYGATE_CACHE_MAX_ENTRIES"),
            defaults.cache_max_entries as u64,
            "QUERYGATE_CACHE_MAX_ENTRIES",
        )?;
        let cache_max_entries = usize::try_from(cache_max_entries)
            .map_err(|_| ConfigError::invalid("QUERYGATE_CACHE_MAX_ENTRIES", "too large"))?;

        let cache_ttl_ms = parse_positive(
            kv.get("QUERYGATE_CACHE_TTL_MS"),
            defaults.cache_ttl.as_millis() as u64,
            "QUERYGATE_CACHE_TTL_MS",
        )?;
        let fetch_timeout_ms = parse_positive(
            kv.get("QUERYGATE_FETCH_TIMEOUT_MS"),
            defaults.fetch_timeout.as_millis() as u64,
            "QUERYGATE_FETCH_TIMEOUT_MS",
        )?;

        let rate_limits = match non_empty(kv.get("QUERYGATE_RATE_LIMITS")) {
            Some(raw) => parse_rate_limits(raw)?,
            None => HashMap::new(),
        };

        let default_tenant = non_empty(kv.get("QUERYGATE_DEFAULT_TENANT"))
            .map(str::to_string)
            .unwrap_or(defaults.default_tenant);

        let log_dir = non_empty(kv.get("QUERYGATE_LOG_DIR")).map(PathBuf::from);

        Ok(Self {
            bind_addr,
            policy_path,
            policy_watch,
            cache_max_entries,
            cache_ttl: Duration::from_millis(cache_ttl_ms),
            fetch_timeout: Duration::from_millis(fetch_timeout_ms),
            rate_limits,
            default_tenant,
            log_dir,
        })
    }
}

fn parse_env_file(path: &str) -> Result<HashMap<String, String>, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.to_string(),
        source,
    })?;

    let mut kv = HashMap::new();

    for (idx, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (key, value) = line.split_once('=').ok_or(ConfigError::FileParse {
            line: idx + 1,
            reason: "expected KEY=VALUE",
        })?;

        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::FileParse {
                line: idx + 1,
                reason: "empty key",
            });
        }

        kv.insert(key.to_string(), strip_quotes(value.trim()).to_string());
    }

    Ok(kv)
}

fn strip_quotes(s: &str) -> &str {
    let quoted = s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')));
    if quoted {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
        _ => None,
    }
}

fn parse_positive(
    value: Option<&String>,
    default: u64,
    key: &'static str,
) -> Result<u64, ConfigError> {
    let Some(raw) = non_empty(value) else {
        return Ok(default);
    };
    match raw.parse::<u64>() {
        Ok(0) => Err(ConfigError::invalid(key, "must be > 0")),
        Ok(n) => Ok(n),
        Err(_) => Err(ConfigError::invalid(key, "must be an unsigned integer")),
    }
}

/// Parses `github=5,jira=10`.
fn parse_rate_limits(raw: &str) -> Result<HashMap<String, u32>, ConfigError> {
    const KEY: &str = "QUERYGATE_RATE_LIMITS";
    let mut limits = HashMap::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (source, rate) = entry
            .split_once('=')
            .ok_or_else(|| ConfigError::invalid(KEY, format!("'{entry}' is not source=N")))?;
        let source = source.trim();
        if source.is_empty() {
            return Err(ConfigError::invalid(KEY, format!("'{entry}' has an empty source")));
        }
        let rate = rate
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigError::invalid(KEY, format!("'{entry}' has a bad rate")))?;
        limits.insert(source.to_lowercase(), rate);
    }

    Ok(limits)
}
