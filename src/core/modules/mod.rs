//! Investigation modules
//!
//! The set of modules is closed: [`InvestigationModule`] has one variant per
//! built-in module. Every call goes through [`ModuleHandle::execute`], which
//! adds the cross-cutting behavior in a fixed order:
//!
//! 1. rate-limit check keyed by module name (fails fast, nothing else runs)
//! 2. the module body under a per-call timeout
//! 3. one telemetry event per call, success or failure
//!
//! `execute` never returns `Err`: every failure is folded into the
//! [`ModuleResult`] so that siblings are never affected.

pub mod phone_info;
pub mod social_media;
pub mod spam_risk;
pub mod web_search;

pub use phone_info::*;
pub use social_media::*;
pub use spam_risk::*;
pub use web_search::*;

use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::models::errors::{AppError, AppResult};
use crate::models::types::{ModuleResult, PhoneNumber};
use crate::providers::DataProvider;
use crate::utils::constants::{
    DEFAULT_MODULE_TIMEOUT_SECS, MODULE_PHONE_INFO, MODULE_SOCIAL_MEDIA, MODULE_SPAM_RISK,
    MODULE_WEB_SEARCH,
};
use crate::utils::rate_limiter::RateLimiter;
use crate::utils::telemetry::{TelemetryCollector, TelemetryEvent};

/// Closed set of module variants
pub enum InvestigationModule {
    PhoneInfo(PhoneInfoModule),
    SocialMedia(SocialMediaModule),
    SpamRisk(SpamRiskModule),
    WebSearch(WebSearchModule),
}

impl InvestigationModule {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PhoneInfo(_) => MODULE_PHONE_INFO,
            Self::SocialMedia(_) => MODULE_SOCIAL_MEDIA,
            Self::SpamRisk(_) => MODULE_SPAM_RISK,
            Self::WebSearch(_) => MODULE_WEB_SEARCH,
        }
    }

    /// Raw module body, without rate limiting, timeout or telemetry
    pub async fn run(&self, phone: &PhoneNumber) -> AppResult<Value> {
        match self {
            Self::PhoneInfo(m) => m.run(phone).await,
            Self::SocialMedia(m) => m.run(phone).await,
            Self::SpamRisk(m) => m.run(phone).await,
            Self::WebSearch(m) => m.run(phone).await,
        }
    }

    /// The four built-in modules in registration order
    pub fn defaults(enrichment: Option<Arc<dyn DataProvider>>) -> Vec<Self> {
        let phone_info = match enrichment {
            Some(provider) => PhoneInfoModule::with_enrichment(provider),
            None => PhoneInfoModule::new(),
        };
        vec![
            Self::PhoneInfo(phone_info),
            Self::SocialMedia(SocialMediaModule::default()),
            Self::SpamRisk(SpamRiskModule),
            Self::WebSearch(WebSearchModule::default()),
        ]
    }
}

/// Shared collaborators handed to every module handle
#[derive(Clone)]
pub struct ModuleContext {
    pub limiter: Arc<RateLimiter>,
    pub telemetry: Arc<TelemetryCollector>,
    pub timeout: Duration,
}

impl ModuleContext {
    pub fn new(limiter: Arc<RateLimiter>, telemetry: Arc<TelemetryCollector>) -> Self {
        Self {
            limiter,
            telemetry,
            timeout: Duration::from_secs(DEFAULT_MODULE_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Cheaply clonable, instrumented module
#[derive(Clone)]
pub struct ModuleHandle {
    module: Arc<InvestigationModule>,
    ctx: ModuleContext,
}

impl ModuleHandle {
    pub fn new(module: InvestigationModule, ctx: ModuleContext) -> Self {
        Self {
            module: Arc::new(module),
            ctx,
        }
    }

    pub fn name(&self) -> &'static str {
        self.module.name()
    }

    pub async fn execute(&self, phone: &PhoneNumber) -> ModuleResult {
        let name = self.name();
        let subject = phone.masked();
        let start = Instant::now();

        let outcome = if !self.ctx.limiter.allow(name) {
            Err(AppError::module_rate_limited(name))
        } else {
            match tokio::time::timeout(self.ctx.timeout, self.module.run(phone)).await {
                Ok(result) => result,
                Err(_) => Err(AppError::provider_timeout(
                    name,
                    self.ctx.timeout.as_secs_f64(),
                )),
            }
        };

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(data) => {
                self.ctx
                    .telemetry
                    .record(TelemetryEvent::success(subject, name, duration_ms));
                debug!("✅ {} finished in {:.2}ms", name, duration_ms);
                ModuleResult::ok(name, data, duration_ms)
            }
            Err(err) => {
                self.ctx.telemetry.record(TelemetryEvent::failure(
                    subject,
                    name,
                    duration_ms,
                    err.to_string(),
                ));
                warn!(module = name, code = err.code_str(), "❌ {}", err.message);
                ModuleResult::failed(name, &err, duration_ms)
            }
        }
    }
}
