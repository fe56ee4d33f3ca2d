//! API Request Handlers

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

use super::middleware::{ApiKeyValidator, PrefixKeyValidator};
use super::types::*;
use crate::core::manager::ModuleManager;
use crate::core::orchestrator::InvestigationOrchestrator;
use crate::models::config::AppConfig;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::{InvestigationPoll, ModuleResult, PhoneNumber};
use crate::providers::store::{InvestigationStore, MemoryStore, RecordFilter, RecordStatus};
use crate::utils::cache::TtlCache;
use crate::utils::rate_limiter::RateLimiter;
use crate::utils::telemetry::TelemetryCollector;

/// Shared application state
pub struct AppState {
    pub config: AppConfig,
    pub orchestrator: Arc<InvestigationOrchestrator>,
    pub telemetry: Arc<TelemetryCollector>,
    /// Single-module results keyed by `module:phone`
    pub response_cache: TtlCache<ModuleResult>,
    pub caller_limiter: Arc<RateLimiter>,
    pub store: Arc<dyn InvestigationStore>,
    pub auth: Arc<dyn ApiKeyValidator>,
    pub start_time: Instant,
}

impl AppState {
    /// Wire the full engine from configuration
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let telemetry = Arc::new(TelemetryCollector::new());
        let manager = ModuleManager::from_config(&config, telemetry.clone())?;
        Ok(Self::with_manager(config, manager, telemetry))
    }

    /// Wire around an already-built manager (custom providers, tests)
    pub fn with_manager(
        config: AppConfig,
        manager: ModuleManager,
        telemetry: Arc<TelemetryCollector>,
    ) -> Self {
        let store: Arc<dyn InvestigationStore> = Arc::new(MemoryStore::new());
        let orchestrator = InvestigationOrchestrator::new(
            Arc::new(manager),
            TtlCache::with_ttl(config.cache_ttl),
        )
        .with_store(store.clone());

        Self {
            response_cache: TtlCache::with_ttl(config.cache_ttl),
            caller_limiter: Arc::new(RateLimiter::new(config.caller_rate)),
            orchestrator: Arc::new(orchestrator),
            telemetry,
            store,
            auth: Arc::new(PrefixKeyValidator),
            start_time: Instant::now(),
            config,
        }
    }

    /// Background task: purge expired cache entries every 60 seconds
    pub fn spawn_cache_cleanup(&self) {
        let results = self.orchestrator.results().clone();
        let responses = self.response_cache.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                let removed = results.cleanup_expired() + responses.cleanup_expired();
                if removed > 0 {
                    info!("🧹 Cache cleanup: {} expired entries removed", removed);
                }
            }
        });
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn parse_phone(raw: &str, start: Instant) -> Result<PhoneNumber, ApiFailure> {
    PhoneNumber::new(raw).map_err(|e| failure(&e, elapsed_ms(start)))
}

// ============================================
// Health Check
// ============================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthData>> {
    let start = Instant::now();

    let data = HealthData {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        modules: state.orchestrator.manager().module_names(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

// ============================================
// Investigations (async start/poll)
// ============================================

pub async fn start_investigation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StartInvestigationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<StartInvestigationData>>), ApiFailure> {
    let start = Instant::now();
    let phone = parse_phone(&req.phone_number, start)?;

    let outcome = state.orchestrator.start(phone.clone());
    let data = StartInvestigationData {
        status_url: status_url(&phone),
        phone_number: phone.to_string(),
        outcome,
    };

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(data, elapsed_ms(start))),
    ))
}

/// Poll URL for a number; the query is form-encoded so `+` survives
pub fn status_url(phone: &PhoneNumber) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("phone_number", phone.as_str())
        .finish();
    format!("/v1/investigations/status?{}", query)
}

pub async fn investigation_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PhoneQuery>,
) -> Result<Json<ApiResponse<InvestigationStatusData>>, ApiFailure> {
    let start = Instant::now();
    let phone = parse_phone(&query.phone_number, start)?;

    let poll = state.orchestrator.poll(&phone);
    let data = InvestigationStatusData {
        phone_number: phone.to_string(),
        status: poll.status_str().to_string(),
        results: match poll {
            InvestigationPoll::Complete(bundle) => Some((*bundle).clone()),
            InvestigationPoll::Pending => None,
        },
    };

    Ok(Json(ApiResponse::success(data, elapsed_ms(start))))
}

pub async fn list_investigations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<ApiResponse<RecordsData>>, ApiFailure> {
    let start = Instant::now();

    let phone_number = match query.phone_number.as_deref() {
        Some(raw) => Some(parse_phone(raw, start)?.to_string()),
        None => None,
    };
    let status = match query.status.as_deref() {
        Some(raw) => Some(RecordStatus::parse(raw).ok_or_else(|| {
            failure(
                &AppError::bad_request(format!("Unknown status filter: {}", raw)),
                elapsed_ms(start),
            )
        })?),
        None => None,
    };

    let records = state
        .store
        .query(&RecordFilter {
            phone_number,
            status,
        })
        .map_err(|e| failure(&e, elapsed_ms(start)))?;

    Ok(Json(ApiResponse::success(
        RecordsData {
            total: records.len(),
            records,
        },
        elapsed_ms(start),
    )))
}

// ============================================
// Modules (synchronous)
// ============================================

pub async fn list_modules(State(state): State<Arc<AppState>>) -> Json<ApiResponse<ModuleListData>> {
    let start = Instant::now();
    let data = ModuleListData {
        modules: state.orchestrator.manager().module_names(),
    };
    Json(ApiResponse::success(data, elapsed_ms(start)))
}

pub async fn run_module(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(req): Json<ModuleRequest>,
) -> Result<Json<ApiResponse<ModuleRunData>>, ApiFailure> {
    let start = Instant::now();
    let phone = parse_phone(&req.phone_number, start)?;

    let cache_key = format!("{}:{}", name, phone.as_str());
    if let Some(result) = state.response_cache.get(&cache_key) {
        return Ok(Json(ApiResponse::success(
            ModuleRunData {
                result,
                cached: true,
            },
            elapsed_ms(start),
        )));
    }

    let result = state
        .orchestrator
        .manager()
        .execute_module(&name, &phone)
        .await
        .map_err(|e| failure(&e, elapsed_ms(start)))?;

    if result.is_rate_limited() {
        let err = AppError::module_rate_limited(&name);
        return Err(failure(&err, elapsed_ms(start)));
    }
    if result.success {
        state.response_cache.insert(&cache_key, result.clone());
    }

    Ok(Json(ApiResponse::success(
        ModuleRunData {
            result,
            cached: false,
        },
        elapsed_ms(start),
    )))
}

pub async fn investigate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InvestigateRequest>,
) -> Result<Json<ApiResponse<InvestigateData>>, ApiFailure> {
    let start = Instant::now();
    let phone = parse_phone(&req.phone_number, start)?;
    if req.modules.is_empty() {
        return Err(failure(
            &AppError::bad_request("At least one module is required"),
            elapsed_ms(start),
        ));
    }

    let manager = state.orchestrator.manager();
    let results = manager.execute_selected(&req.modules, &phone).await;

    info!(
        "🔎 Synchronous investigation of {}: {} module(s)",
        phone.masked(),
        results.len()
    );

    Ok(Json(ApiResponse::success(
        InvestigateData {
            phone_number: phone.to_string(),
            results,
            ai_analysis: manager.analyze(&phone),
        },
        elapsed_ms(start),
    )))
}

// ============================================
// Stats / Cache
// ============================================

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatsQuery>,
) -> Json<ApiResponse<StatsData>> {
    let start = Instant::now();

    let data = StatsData {
        telemetry: state.telemetry.get_stats(query.hours),
        result_cache: state.orchestrator.results().stats(),
        response_cache: state.response_cache.stats(),
        investigations_in_flight: state.orchestrator.in_flight_count(),
        uptime_seconds: state.uptime_seconds(),
        api_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

pub async fn cache_keys(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CacheKeysQuery>,
) -> Result<Json<ApiResponse<CacheKeysData>>, ApiFailure> {
    let start = Instant::now();
    let pattern = query.pattern.unwrap_or_else(|| "*".to_string());

    let results = state
        .orchestrator
        .results()
        .keys(&pattern)
        .map_err(|e| failure(&e, elapsed_ms(start)))?;
    let responses = state
        .response_cache
        .keys(&pattern)
        .map_err(|e| failure(&e, elapsed_ms(start)))?;

    Ok(Json(ApiResponse::success(
        CacheKeysData {
            pattern,
            results,
            responses,
        },
        elapsed_ms(start),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_url_encodes_plus() {
        let phone = PhoneNumber::new("+18005551234").unwrap();
        assert_eq!(
            status_url(&phone),
            "/v1/investigations/status?phone_number=%2B18005551234"
        );
    }
}
