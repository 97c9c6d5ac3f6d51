//! EngineConfig - 起動時の設定
//!
//! 既定値 → JSON ファイル → `FOREMAN_*` 環境変数 の順に上書きする。
//! 値の検査は `validate()` で起動時にまとめて行う（Fail-fast）。

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::worker_loop::{TransformFailurePolicy, WorkerSettings};

pub const ENV_LEASE_SECS: &str = "FOREMAN_LEASE_SECS";
pub const ENV_WORKERS: &str = "FOREMAN_WORKERS";
pub const ENV_BACKOFF_MS: &str = "FOREMAN_BACKOFF_MS";
pub const ENV_CALL_TIMEOUT_MS: &str = "FOREMAN_CALL_TIMEOUT_MS";
pub const ENV_TRANSFORM_FAILURE: &str = "FOREMAN_TRANSFORM_FAILURE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// How long a leased task may stay unfinished before it is reclaimed.
    pub lease_duration_secs: u64,

    /// Number of workers in the pool.
    pub workers: usize,

    pub backoff_ms: u64,

    /// Upper bound on every worker-side remote call.
    pub call_timeout_ms: u64,

    pub transform_failure: TransformFailurePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lease_duration_secs: 120,
            workers: 8,
            backoff_ms: 2_000,
            call_timeout_ms: 5_000,
            transform_failure: TransformFailurePolicy::ReportEmpty,
        }
    }
}

impl EngineConfig {
    /// Read a JSON file; missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `FOREMAN_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `FOREMAN_*` overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_LEASE_SECS) {
            self.lease_duration_secs = parse_number(ENV_LEASE_SECS, &v)?;
        }
        if let Some(v) = lookup(ENV_WORKERS) {
            self.workers = parse_number(ENV_WORKERS, &v)?;
        }
        if let Some(v) = lookup(ENV_BACKOFF_MS) {
            self.backoff_ms = parse_number(ENV_BACKOFF_MS, &v)?;
        }
        if let Some(v) = lookup(ENV_CALL_TIMEOUT_MS) {
            self.call_timeout_ms = parse_number(ENV_CALL_TIMEOUT_MS, &v)?;
        }
        if let Some(v) = lookup(ENV_TRANSFORM_FAILURE) {
            self.transform_failure = match v.trim() {
                "report_empty" => TransformFailurePolicy::ReportEmpty,
                "await_reclaim" => TransformFailurePolicy::AwaitReclaim,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: ENV_TRANSFORM_FAILURE,
                        value: v,
                    });
                }
            };
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lease_duration_secs == 0 {
            return Err(ConfigError::Invalid(
                "lease_duration_secs must be positive".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be positive".to_string()));
        }
        if self.backoff_ms == 0 {
            return Err(ConfigError::Invalid("backoff_ms must be positive".to_string()));
        }
        if self.call_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "call_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn lease_duration(&self) -> Duration {
        Duration::from_secs(self.lease_duration_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            backoff: self.backoff(),
            call_timeout: self.call_timeout(),
            transform_failure: self.transform_failure,
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}
