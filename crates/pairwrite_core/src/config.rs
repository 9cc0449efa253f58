//! Process configuration loaded once from the environment.
//!
//! # Responsibility
//! - Parse listen address, database and logging settings at startup.
//! - Hand explicit config values to the writer and server; no globals.
//!
//! # Invariants
//! - Unset variables fall back to documented defaults.
//! - Set-but-invalid variables are rejected, never silently replaced.

use crate::db::tx::{parse_tx_behavior, tx_behavior_name};
use crate::logging::default_log_level;
use rusqlite::TransactionBehavior;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_BIND: &str = "PAIRWRITE_BIND";
pub const ENV_DB_DATABASE: &str = "DB_DATABASE";
pub const ENV_DB_BUSY_TIMEOUT_MS: &str = "DB_BUSY_TIMEOUT_MS";
pub const ENV_DB_TX_BEHAVIOR: &str = "DB_TX_BEHAVIOR";
pub const ENV_DB_MISSING_PAIR: &str = "DB_MISSING_PAIR";
pub const ENV_LOG_LEVEL: &str = "PAIRWRITE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "PAIRWRITE_LOG_DIR";

const DEFAULT_BIND: &str = "127.0.0.1:3000";
const DEFAULT_DB_FILE: &str = "pairwrite.sqlite3";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const MAX_BUSY_TIMEOUT_MS: u64 = 600_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid { key, value, reason } => {
                write!(f, "invalid value `{value}` for {key}: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

/// What edit/delete report when the first statement matches no row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingPairPolicy {
    /// Zero affected rows is a successful write.
    #[default]
    Succeed,
    /// Zero affected rows rolls back and surfaces `WriteError::NotFound`.
    NotFound,
}

impl MissingPairPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "succeed" | "success" => Some(Self::Succeed),
            "not_found" | "not-found" | "notfound" => Some(Self::NotFound),
            _ => None,
        }
    }
}

/// Settings used for every connection the writer opens.
#[derive(Clone)]
pub struct DbConfig {
    /// SQLite database file.
    pub path: PathBuf,
    /// Busy handler timeout applied per connection.
    pub busy_timeout: Duration,
    /// Lock mode used by `BEGIN`; SQLite's `Deferred` unless configured.
    pub tx_behavior: TransactionBehavior,
    pub missing_pair: MissingPairPolicy,
}

impl DbConfig {
    /// Creates a config for `path` with default timeout, behavior and policy.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            tx_behavior: TransactionBehavior::Deferred,
            missing_pair: MissingPairPolicy::default(),
        }
    }
}

impl Debug for DbConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("path", &self.path)
            .field("busy_timeout", &self.busy_timeout)
            .field("tx_behavior", &tx_behavior_name(self.tx_behavior))
            .field("missing_pair", &self.missing_pair)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub db: DbConfig,
    pub log_level: String,
    /// Rotating file logs go here; stderr when `None`.
    pub log_dir: Option<String>,
}

impl AppConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, treating blank values as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bind_text = get(ENV_BIND).unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_text
            .parse::<SocketAddr>()
            .map_err(|err| invalid(ENV_BIND, &bind_text, err.to_string()))?;

        let path = get(ENV_DB_DATABASE)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE));

        let busy_timeout = match get(ENV_DB_BUSY_TIMEOUT_MS) {
            Some(text) => {
                let millis = text
                    .parse::<u64>()
                    .map_err(|err| invalid(ENV_DB_BUSY_TIMEOUT_MS, &text, err.to_string()))?;
                if millis > MAX_BUSY_TIMEOUT_MS {
                    return Err(invalid(
                        ENV_DB_BUSY_TIMEOUT_MS,
                        &text,
                        format!("must be at most {MAX_BUSY_TIMEOUT_MS}"),
                    ));
                }
                Duration::from_millis(millis)
            }
            None => Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        };

        let tx_behavior = match get(ENV_DB_TX_BEHAVIOR) {
            Some(text) => parse_tx_behavior(&text).ok_or_else(|| {
                invalid(
                    ENV_DB_TX_BEHAVIOR,
                    &text,
                    "expected deferred|immediate|exclusive".to_string(),
                )
            })?,
            None => TransactionBehavior::Deferred,
        };

        let missing_pair = match get(ENV_DB_MISSING_PAIR) {
            Some(text) => MissingPairPolicy::parse(&text).ok_or_else(|| {
                invalid(
                    ENV_DB_MISSING_PAIR,
                    &text,
                    "expected succeed|not_found".to_string(),
                )
            })?,
            None => MissingPairPolicy::default(),
        };

        let log_level = get(ENV_LOG_LEVEL).unwrap_or_else(|| default_log_level().to_string());

        Ok(Self {
            server: ServerConfig { bind },
            db: DbConfig {
                path,
                busy_timeout,
                tx_behavior,
                missing_pair,
            },
            log_level,
            log_dir: get(ENV_LOG_DIR),
        })
    }
}

fn invalid(key: &'static str, value: &str, reason: String) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, MissingPairPolicy, ENV_DB_BUSY_TIMEOUT_MS};
    use rusqlite::TransactionBehavior;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = load(&[]).expect("empty environment should load");
        assert_eq!(config.server.bind.port(), 3000);
        assert_eq!(config.db.path, PathBuf::from("pairwrite.sqlite3"));
        assert_eq!(config.db.busy_timeout, Duration::from_secs(5));
        assert!(matches!(
            config.db.tx_behavior,
            TransactionBehavior::Deferred
        ));
        assert_eq!(config.db.missing_pair, MissingPairPolicy::Succeed);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = load(&[
            ("PAIRWRITE_BIND", "0.0.0.0:8081"),
            ("DB_DATABASE", "/tmp/pairs.db"),
            ("DB_BUSY_TIMEOUT_MS", "250"),
            ("DB_TX_BEHAVIOR", "IMMEDIATE"),
            ("DB_MISSING_PAIR", "not_found"),
            ("PAIRWRITE_LOG_LEVEL", "warn"),
            ("PAIRWRITE_LOG_DIR", "/var/log/pairwrite"),
        ])
        .expect("explicit environment should load");

        assert_eq!(config.server.bind.port(), 8081);
        assert_eq!(config.db.path, PathBuf::from("/tmp/pairs.db"));
        assert_eq!(config.db.busy_timeout, Duration::from_millis(250));
        assert!(matches!(
            config.db.tx_behavior,
            TransactionBehavior::Immediate
        ));
        assert_eq!(config.db.missing_pair, MissingPairPolicy::NotFound);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir.as_deref(), Some("/var/log/pairwrite"));
    }

    #[test]
    fn blank_values_are_treated_as_unset() {
        let config = load(&[("DB_DATABASE", "   "), ("PAIRWRITE_LOG_DIR", "")])
            .expect("blank values should fall back");
        assert_eq!(config.db.path, PathBuf::from("pairwrite.sqlite3"));
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn invalid_values_are_rejected_with_key() {
        let err = load(&[("DB_BUSY_TIMEOUT_MS", "soon")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == ENV_DB_BUSY_TIMEOUT_MS));

        let err = load(&[("DB_TX_BEHAVIOR", "serializable")]).unwrap_err();
        assert!(err.to_string().contains("DB_TX_BEHAVIOR"));

        let err = load(&[("DB_MISSING_PAIR", "maybe")]).unwrap_err();
        assert!(err.to_string().contains("succeed|not_found"));

        assert!(load(&[("PAIRWRITE_BIND", "localhost")]).is_err());
        assert!(load(&[("DB_BUSY_TIMEOUT_MS", "600001")]).is_err());
    }
}
