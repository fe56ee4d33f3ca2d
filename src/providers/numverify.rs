//! NumVerify API Client
//!
//! Optional carrier / line-type enrichment for the phone_info module.
//! Only constructed when `NUMVERIFY_API_KEY` is configured; every failure
//! here is swallowed by the caller, which keeps its offline result.
//!
//! API: http://apilayer.net/api/validate?access_key=...&number=...
//! Free tier: 100 lookups per hour (enforced locally before each request)

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::DataProvider;
use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::types::PhoneNumber;
use crate::utils::constants::{
    NUMVERIFY_BASE_URL, NUMVERIFY_RATE_LIMIT, NUMVERIFY_RATE_PERIOD_SECS, NUMVERIFY_TIMEOUT_SECS,
};
use crate::utils::rate_limiter::{RateLimitConfig, RateLimiter};

const LIMITER_KEY: &str = "numverify";

/// Validation payload returned by NumVerify
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NumVerifyResponse {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub local_format: Option<String>,
    #[serde(default)]
    pub international_format: Option<String>,
    #[serde(default)]
    pub country_prefix: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub country_name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub carrier: Option<String>,
    #[serde(default)]
    pub line_type: Option<String>,
}

/// Error envelope NumVerify uses for bad keys and exhausted quotas
#[derive(Debug, Deserialize)]
struct NumVerifyFailure {
    error: NumVerifyErrorInfo,
}

#[derive(Debug, Deserialize)]
struct NumVerifyErrorInfo {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    info: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// NumVerify HTTP client with its own hourly quota
pub struct NumVerifyClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    limiter: RateLimiter,
}

impl NumVerifyClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: NUMVERIFY_BASE_URL.to_string(),
            limiter: RateLimiter::new(RateLimitConfig::new(
                NUMVERIFY_RATE_LIMIT,
                Duration::from_secs(NUMVERIFY_RATE_PERIOD_SECS),
            )),
        }
    }

    /// Point at a different endpoint (self-hosted proxy, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.limiter = RateLimiter::new(config);
        self
    }

    /// Validate a number against NumVerify
    pub async fn validate(&self, phone: &PhoneNumber) -> AppResult<NumVerifyResponse> {
        if !self.limiter.allow(LIMITER_KEY) {
            return Err(AppError::new(
                ErrorCode::ProviderRateLimited,
                "NumVerify hourly quota exhausted",
            ));
        }

        debug!("📞 NumVerify: validating {}", phone.masked());

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("access_key", self.api_key.as_str()),
                ("number", phone.as_str()),
                ("format", "1"),
            ])
            .timeout(Duration::from_secs(NUMVERIFY_TIMEOUT_SECS))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::provider(format!(
                "NumVerify API error: {}",
                response.status()
            )));
        }

        let body: Value = response.json().await?;

        if let Ok(failure) = serde_json::from_value::<NumVerifyFailure>(body.clone()) {
            warn!(
                code = failure.error.code,
                kind = failure.error.kind.as_deref().unwrap_or("unknown"),
                "⚠️ NumVerify rejected the request"
            );
            return Err(AppError::provider(format!(
                "NumVerify API error: {}",
                failure.error.info.unwrap_or_else(|| "unknown error".to_string())
            )));
        }

        let parsed: NumVerifyResponse = serde_json::from_value(body)?;
        info!(
            "📞 NumVerify: {} valid={} carrier={}",
            phone.masked(),
            parsed.valid,
            parsed.carrier.as_deref().unwrap_or("-")
        );
        Ok(parsed)
    }
}

impl DataProvider for NumVerifyClient {
    fn name(&self) -> &'static str {
        LIMITER_KEY
    }

    fn lookup<'a>(&'a self, phone: &'a PhoneNumber) -> BoxFuture<'a, AppResult<Value>> {
        Box::pin(async move {
            let response = self.validate(phone).await?;
            Ok(serde_json::to_value(response)?)
        })
    }
}
