//! Fetcher configuration
//!
//! Two filtering strategies share one fetcher. Each strategy presets a row
//! cap and a base predicate; both can be overridden independently.
//!
//! Environment variables read by [`FetcherConfig::from_env`]:
//! - `INSIGHT_API_ENDPOINT`: dataset URL
//! - `INSIGHT_APP_TOKEN` (or `VITE_API_KEY`): SODA app token
//! - `INSIGHT_FILTER_STRATEGY`: `remote` or `local`
//! - `INSIGHT_ROW_LIMIT`: rows shown per selection
//! - `INSIGHT_BASE_FILTER`: `true` to keep only complaint/follow-up inspections
//! - `INSIGHT_DATASET_LIMIT`: rows pulled by the local strategy
//! - `INSIGHT_HTTP_TIMEOUT_MS`: per-request timeout

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::query::BasePredicate;

pub const DEFAULT_ENDPOINT: &str = "https://data.delaware.gov/resource/384s-wygj.json";
pub const REMOTE_ROW_LIMIT: usize = 200;
pub const LOCAL_ROW_LIMIT: usize = 250;
pub const DEFAULT_DATASET_LIMIT: usize = 50_000;
pub const CITY_LIMIT: usize = 1000;
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

/// Where filtering happens
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterStrategy {
    /// Every selection becomes a `$where` clause on the server
    #[default]
    Remote,
    /// Pull the dataset once and filter in memory
    Local,
}

impl FromStr for FilterStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "remote" | "server" => Ok(FilterStrategy::Remote),
            "local" | "client" => Ok(FilterStrategy::Local),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for FilterStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterStrategy::Remote => f.write_str("remote"),
            FilterStrategy::Local => f.write_str("local"),
        }
    }
}

/// SODA application token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct AppToken(String);

impl AppToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Only for writing into the outgoing request
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AppToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AppToken(<redacted>)")
    }
}

/// Fetcher configuration
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub endpoint: String,
    pub app_token: Option<AppToken>,
    pub strategy: FilterStrategy,
    pub row_limit: usize,
    pub base_predicate: BasePredicate,
    pub dataset_limit: usize,
    pub city_limit: usize,
    pub timeout: Duration,
}

impl FetcherConfig {
    /// Server-side filtering: 200 rows, complaint/follow-up only
    pub fn remote() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            app_token: None,
            strategy: FilterStrategy::Remote,
            row_limit: REMOTE_ROW_LIMIT,
            base_predicate: BasePredicate::ComplaintFollowUp,
            dataset_limit: DEFAULT_DATASET_LIMIT,
            city_limit: CITY_LIMIT,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    /// Client-side filtering: 250 rows, every inspection type
    pub fn local() -> Self {
        Self {
            strategy: FilterStrategy::Local,
            row_limit: LOCAL_ROW_LIMIT,
            base_predicate: BasePredicate::None,
            ..Self::remote()
        }
    }

    pub fn for_strategy(strategy: FilterStrategy) -> Self {
        match strategy {
            FilterStrategy::Remote => Self::remote(),
            FilterStrategy::Local => Self::local(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_app_token(mut self, token: AppToken) -> Self {
        self.app_token = Some(token);
        self
    }

    pub fn with_row_limit(mut self, limit: usize) -> Self {
        self.row_limit = limit;
        self
    }

    pub fn with_base_predicate(mut self, base: BasePredicate) -> Self {
        self.base_predicate = base;
        self
    }

    pub fn with_dataset_limit(mut self, limit: usize) -> Self {
        self.dataset_limit = limit;
        self
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let strategy = match lookup("INSIGHT_FILTER_STRATEGY") {
            Some(raw) => raw.parse()?,
            None => FilterStrategy::default(),
        };
        let mut config = Self::for_strategy(strategy);

        if let Some(endpoint) = lookup("INSIGHT_API_ENDPOINT").filter(|e| !e.trim().is_empty()) {
            config.endpoint = endpoint.trim().to_string();
        }

        config.app_token = lookup("INSIGHT_APP_TOKEN")
            .or_else(|| lookup("VITE_API_KEY"))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .map(AppToken);

        if let Some(limit) = parse_var(&lookup, "INSIGHT_ROW_LIMIT")? {
            config.row_limit = limit;
        }
        if let Some(limit) = parse_var(&lookup, "INSIGHT_DATASET_LIMIT")? {
            config.dataset_limit = limit;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "INSIGHT_HTTP_TIMEOUT_MS")? {
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(raw) = lookup("INSIGHT_BASE_FILTER") {
            config.base_predicate = match raw.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => BasePredicate::ComplaintFollowUp,
                "0" | "false" | "no" | "off" => BasePredicate::None,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "INSIGHT_BASE_FILTER",
                        value: raw,
                    })
                }
            };
        }

        if config.row_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "INSIGHT_ROW_LIMIT",
                value: "0".to_string(),
            });
        }

        Ok(config)
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self::remote()
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}
