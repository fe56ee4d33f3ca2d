//! Configuration module for Phone Sentry
//!
//! All tunables come from environment variables with defaults taken from
//! `utils/constants.rs`. No other module reads the environment.
//!
//! | Variable                          | Default |
//! |-----------------------------------|---------|
//! | `SENTRY_CACHE_TTL_SECS`           | 300     |
//! | `SENTRY_CALLER_RATE_LIMIT`        | 30      |
//! | `SENTRY_CALLER_RATE_PERIOD_SECS`  | 60      |
//! | `SENTRY_MODULE_RATE_LIMIT`        | 10      |
//! | `SENTRY_MODULE_RATE_PERIOD_SECS`  | 60      |
//! | `SENTRY_MODULE_RATE_OVERRIDES`    | (none), e.g. `spam_risk=5/60,web_search=2/60` |
//! | `SENTRY_MODULE_TIMEOUT_SECS`      | 30      |
//! | `SENTRY_RULES_PATH`               | `config/reasoning_rules.json` |
//! | `SENTRY_STATS_DIR`                | `stats` |
//! | `NUMVERIFY_API_KEY`               | (none)  |
//! | `SENTRY_HOST`                     | `0.0.0.0` |
//! | `PORT` / `SENTRY_PORT`            | 3000    |

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use super::errors::{AppError, AppResult, ErrorCode};
use crate::utils::constants::{
    DEFAULT_CACHE_TTL_SECS, DEFAULT_CALLER_RATE_LIMIT, DEFAULT_CALLER_RATE_PERIOD_SECS,
    DEFAULT_MODULE_RATE_LIMIT, DEFAULT_MODULE_RATE_PERIOD_SECS, DEFAULT_MODULE_TIMEOUT_SECS,
};
use crate::utils::rate_limiter::RateLimitConfig;

pub const DEFAULT_RULES_PATH: &str = "config/reasoning_rules.json";
pub const DEFAULT_STATS_DIR: &str = "stats";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Default TTL for investigation bundles and cached API responses
    pub cache_ttl: Duration,
    /// Inbound limit, keyed by caller identity
    pub caller_rate: RateLimitConfig,
    /// Default limit for every module, keyed by module name
    pub module_rate: RateLimitConfig,
    /// Per-module replacements for `module_rate`
    pub module_rate_overrides: HashMap<String, RateLimitConfig>,
    /// Upper bound on a single module call
    pub module_timeout: Duration,
    /// Rule table file; defaults are used when the file does not exist
    pub rules_path: Option<PathBuf>,
    /// Where telemetry is exported on shutdown
    pub stats_dir: PathBuf,
    pub numverify_api_key: Option<String>,
    pub host: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            caller_rate: RateLimitConfig::new(
                DEFAULT_CALLER_RATE_LIMIT,
                Duration::from_secs(DEFAULT_CALLER_RATE_PERIOD_SECS),
            ),
            module_rate: RateLimitConfig::new(
                DEFAULT_MODULE_RATE_LIMIT,
                Duration::from_secs(DEFAULT_MODULE_RATE_PERIOD_SECS),
            ),
            module_rate_overrides: HashMap::new(),
            module_timeout: Duration::from_secs(DEFAULT_MODULE_TIMEOUT_SECS),
            rules_path: Some(PathBuf::from(DEFAULT_RULES_PATH)),
            stats_dir: PathBuf::from(DEFAULT_STATS_DIR),
            numverify_api_key: None,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (the environment in production, a map in tests)
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let cache_ttl_secs = parse_or(&get, "SENTRY_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?;
        let caller_rate = RateLimitConfig::new(
            parse_or(&get, "SENTRY_CALLER_RATE_LIMIT", DEFAULT_CALLER_RATE_LIMIT)?,
            Duration::from_secs(parse_or(
                &get,
                "SENTRY_CALLER_RATE_PERIOD_SECS",
                DEFAULT_CALLER_RATE_PERIOD_SECS,
            )?),
        );
        let module_rate = RateLimitConfig::new(
            parse_or(&get, "SENTRY_MODULE_RATE_LIMIT", DEFAULT_MODULE_RATE_LIMIT)?,
            Duration::from_secs(parse_or(
                &get,
                "SENTRY_MODULE_RATE_PERIOD_SECS",
                DEFAULT_MODULE_RATE_PERIOD_SECS,
            )?),
        );
        let module_rate_overrides = match get("SENTRY_MODULE_RATE_OVERRIDES") {
            Some(raw) => parse_overrides(&raw)?,
            None => HashMap::new(),
        };
        let module_timeout_secs =
            parse_or(&get, "SENTRY_MODULE_TIMEOUT_SECS", DEFAULT_MODULE_TIMEOUT_SECS)?;
        if module_timeout_secs == 0 {
            return Err(invalid("SENTRY_MODULE_TIMEOUT_SECS", "0", "must be at least 1"));
        }

        let numverify_api_key = get("NUMVERIFY_API_KEY");
        if numverify_api_key.is_some() {
            info!("🔑 NUMVERIFY_API_KEY configured (key hidden for security)");
        }

        let port = match get("PORT").or_else(|| get("SENTRY_PORT")) {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| invalid("PORT", &raw, "expected a port number"))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            caller_rate,
            module_rate,
            module_rate_overrides,
            module_timeout: Duration::from_secs(module_timeout_secs),
            rules_path: get("SENTRY_RULES_PATH")
                .map(PathBuf::from)
                .or(defaults.rules_path),
            stats_dir: get("SENTRY_STATS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.stats_dir),
            numverify_api_key,
            host: get("SENTRY_HOST").unwrap_or(defaults.host),
            port,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> AppError {
    AppError::new(
        ErrorCode::ConfigInvalidValue,
        format!("{}={:?}: {}", key, value, reason),
    )
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| invalid(key, &raw, "not a valid number")),
        None => Ok(default),
    }
}

/// `name=limit/period_secs` pairs separated by commas
fn parse_overrides(raw: &str) -> AppResult<HashMap<String, RateLimitConfig>> {
    let mut overrides = HashMap::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let bad = || invalid("SENTRY_MODULE_RATE_OVERRIDES", item, "expected name=limit/period");
        let (name, rate) = item.split_once('=').ok_or_else(bad)?;
        let (limit, period) = rate.split_once('/').ok_or_else(bad)?;
        let limit: u32 = limit.trim().parse().map_err(|_| bad())?;
        let period: u64 = period.trim().parse().map_err(|_| bad())?;
        overrides.insert(
            name.trim().to_string(),
            RateLimitConfig::new(limit, Duration::from_secs(period)),
        );
    }
    Ok(overrides)
}
