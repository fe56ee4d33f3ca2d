//! Module Manager - registry and fan-out
//!
//! Runs each module in its own tokio task so that a panicking module is
//! reported as that module's `MODULE_CRASHED` result instead of taking the
//! whole investigation down. Results are merged by module name and the
//! rule engine adds the `ai_analysis` summary.

use chrono::Utc;
use futures_util::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinError;
use tracing::{error, info, warn};

use crate::core::modules::{InvestigationModule, ModuleContext, ModuleHandle};
use crate::core::rules::{RuleEngine, RuleTable};
use crate::models::config::AppConfig;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::{AiAnalysis, InvestigationBundle, ModuleResult, PhoneNumber};
use crate::providers::{DataProvider, NumVerifyClient};
use crate::utils::constants::ALL_MODULES;
use crate::utils::rate_limiter::RateLimiter;
use crate::utils::telemetry::{TelemetryCollector, TelemetryEvent};

/// Token accepted by [`ModuleManager::execute_selected`] for "every module"
pub const ALL_MODULES_TOKEN: &str = "all";

pub struct ModuleManager {
    /// Registration order is preserved for listing and fan-out
    modules: Vec<ModuleHandle>,
    rule_engine: Arc<RuleEngine>,
    ctx: ModuleContext,
}

impl ModuleManager {
    pub fn new(
        modules: Vec<InvestigationModule>,
        ctx: ModuleContext,
        rule_engine: Arc<RuleEngine>,
    ) -> Self {
        let modules = modules
            .into_iter()
            .map(|m| ModuleHandle::new(m, ctx.clone()))
            .collect();
        Self {
            modules,
            rule_engine,
            ctx,
        }
    }

    /// Built-in modules wired from configuration.
    ///
    /// Loads the rule table, builds the shared module limiter and attaches
    /// NumVerify enrichment when an API key is configured.
    pub fn from_config(
        config: &AppConfig,
        telemetry: Arc<TelemetryCollector>,
    ) -> AppResult<Self> {
        let rules = RuleTable::load(config.rules_path.as_deref())?;

        let mut limiter = RateLimiter::new(config.module_rate);
        for (name, rate) in &config.module_rate_overrides {
            if !ALL_MODULES.contains(&name.as_str()) {
                warn!("⚠️ Rate override for unknown module '{}'", name);
            }
            limiter = limiter.with_override(name.clone(), *rate);
        }

        let enrichment = config.numverify_api_key.as_ref().map(|key| {
            let client: Arc<dyn DataProvider> = Arc::new(NumVerifyClient::new(key.clone()));
            client
        });

        let ctx =
            ModuleContext::new(Arc::new(limiter), telemetry).with_timeout(config.module_timeout);
        Ok(Self::new(
            InvestigationModule::defaults(enrichment),
            ctx,
            Arc::new(RuleEngine::new(rules)),
        ))
    }

    pub fn module_names(&self) -> Vec<&'static str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ModuleHandle> {
        self.modules.iter().find(|m| m.name() == name)
    }

    pub fn rule_engine(&self) -> &RuleEngine {
        &self.rule_engine
    }

    pub fn context(&self) -> &ModuleContext {
        &self.ctx
    }

    /// Rule-engine summary over the number's digit sequence
    pub fn analyze(&self, phone: &PhoneNumber) -> AiAnalysis {
        self.rule_engine.analyze(&phone.digits())
    }

    /// Run one module by name
    pub async fn execute_module(
        &self,
        name: &str,
        phone: &PhoneNumber,
    ) -> AppResult<ModuleResult> {
        let handle = self
            .get(name)
            .ok_or_else(|| AppError::module_not_found(name))?;
        self.spawn_isolated(vec![handle.clone()], phone)
            .await
            .pop()
            .ok_or_else(|| AppError::internal(format!("Module {} produced no result", name)))
    }

    /// Run the named modules (or every module when `names` contains "all").
    ///
    /// Unknown names are reported in place as `MODULE_NOT_FOUND` results.
    pub async fn execute_selected(
        &self,
        names: &[String],
        phone: &PhoneNumber,
    ) -> BTreeMap<String, ModuleResult> {
        let run_all = names.iter().any(|n| n == ALL_MODULES_TOKEN);
        let mut handles = Vec::new();
        let mut results = BTreeMap::new();

        if run_all {
            handles = self.modules.clone();
        } else {
            for name in names {
                match self.get(name) {
                    Some(handle) => {
                        if !handles.iter().any(|h: &ModuleHandle| h.name() == handle.name()) {
                            handles.push(handle.clone());
                        }
                    }
                    None => {
                        let err = AppError::module_not_found(name);
                        results.insert(name.clone(), ModuleResult::failed(name, &err, 0.0));
                    }
                }
            }
        }

        for result in self.spawn_isolated(handles, phone).await {
            results.insert(result.module.clone(), result);
        }
        results
    }

    /// Run every module and attach the rule-engine summary
    pub async fn execute_all(&self, phone: &PhoneNumber) -> InvestigationBundle {
        let started_at = Utc::now();
        let results: BTreeMap<String, ModuleResult> = self
            .spawn_isolated(self.modules.clone(), phone)
            .await
            .into_iter()
            .map(|r| (r.module.clone(), r))
            .collect();

        let bundle =
            InvestigationBundle::complete(phone, results, self.analyze(phone), started_at);
        info!("🔎 {}", bundle.summary());
        bundle
    }

    /// One task per module; output order follows `handles`
    async fn spawn_isolated(
        &self,
        handles: Vec<ModuleHandle>,
        phone: &PhoneNumber,
    ) -> Vec<ModuleResult> {
        let names: Vec<&'static str> = handles.iter().map(|h| h.name()).collect();
        let started = Instant::now();

        let tasks = handles.into_iter().map(|handle| {
            let phone = phone.clone();
            tokio::spawn(async move { handle.execute(&phone).await })
        });

        join_all(tasks)
            .await
            .into_iter()
            .zip(names)
            .map(|(joined, name)| match joined {
                Ok(result) => result,
                Err(join_err) => {
                    let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
                    self.crashed(name, phone, join_err, duration_ms)
                }
            })
            .collect()
    }

    /// `duration_ms` runs from the fan-out start to the join
    fn crashed(
        &self,
        name: &str,
        phone: &PhoneNumber,
        join_err: JoinError,
        duration_ms: f64,
    ) -> ModuleResult {
        let reason = panic_message(join_err);
        let err = AppError::module_crashed(name, reason);
        error!(module = name, "💥 {}", err.message);
        self.ctx.telemetry.record(TelemetryEvent::failure(
            phone.masked(),
            name,
            duration_ms,
            err.to_string(),
        ));
        ModuleResult::failed(name, &err, duration_ms)
    }
}

/// Best-effort text of a task panic
pub(crate) fn panic_message(join_err: JoinError) -> String {
    if join_err.is_cancelled() {
        return "task cancelled".to_string();
    }
    match join_err.try_into_panic() {
        Ok(payload) => {
            if let Some(s) = payload.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "panic".to_string()
            }
        }
        Err(e) => e.to_string(),
    }
}
