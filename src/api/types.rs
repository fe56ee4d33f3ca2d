//! API Request/Response Types

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::manager::ALL_MODULES_TOKEN;
use crate::models::errors::AppError;
use crate::models::types::{AiAnalysis, InvestigationBundle, ModuleResult, StartOutcome};
use crate::providers::store::InvestigationRecord;
use crate::utils::cache::CacheStats;
use crate::utils::telemetry::TelemetryStats;

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub latency_ms: f64,
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, latency_ms: f64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(error: ApiError, latency_ms: f64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// API Error
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn unauthorized() -> Self {
        Self {
            code: "API_UNAUTHORIZED".to_string(),
            message: "Invalid API key".to_string(),
            details: None,
        }
    }

    pub fn rate_limited(retry_after: u64) -> Self {
        let err = AppError::api_rate_limited(retry_after);
        Self {
            code: err.code_str().to_string(),
            message: err.message,
            details: Some(format!("retry_after: {}", retry_after)),
        }
    }
}

impl From<&AppError> for ApiError {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code_str().to_string(),
            message: err.message.clone(),
            details: None,
        }
    }
}

/// Error half of every fallible handler
pub type ApiFailure = (StatusCode, Json<ApiResponse<()>>);

/// Map an `AppError` to its HTTP status and error envelope
pub fn failure(err: &AppError, latency_ms: f64) -> ApiFailure {
    let status =
        StatusCode::from_u16(err.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ApiResponse::error(err.into(), latency_ms)))
}

// ============================================
// Investigations (async start/poll)
// ============================================

#[derive(Debug, Deserialize)]
pub struct StartInvestigationRequest {
    pub phone_number: String,
}

#[derive(Debug, Serialize)]
pub struct StartInvestigationData {
    pub phone_number: String,
    pub outcome: StartOutcome,
    pub status_url: String,
}

/// `?phone_number=...`
#[derive(Debug, Deserialize)]
pub struct PhoneQuery {
    pub phone_number: String,
}

#[derive(Debug, Serialize)]
pub struct InvestigationStatusData {
    pub phone_number: String,
    /// "pending" | "complete" | "failed"
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<InvestigationBundle>,
}

#[derive(Debug, Deserialize)]
pub struct RecordsQuery {
    pub phone_number: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecordsData {
    pub total: usize,
    pub records: Vec<InvestigationRecord>,
}

// ============================================
// Modules (synchronous)
// ============================================

#[derive(Debug, Deserialize)]
pub struct ModuleRequest {
    pub phone_number: String,
}

#[derive(Debug, Serialize)]
pub struct ModuleRunData {
    pub result: ModuleResult,
    /// Served from the response cache
    pub cached: bool,
}

#[derive(Debug, Serialize)]
pub struct ModuleListData {
    pub modules: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
pub struct InvestigateRequest {
    pub phone_number: String,
    /// Module names, or `["all"]`
    #[serde(default = "default_modules")]
    pub modules: Vec<String>,
}

fn default_modules() -> Vec<String> {
    vec![ALL_MODULES_TOKEN.to_string()]
}

#[derive(Debug, Serialize)]
pub struct InvestigateData {
    pub phone_number: String,
    pub results: BTreeMap<String, ModuleResult>,
    pub ai_analysis: AiAnalysis,
}

// ============================================
// Stats / Cache / Health
// ============================================

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    /// Reporting period; everything buffered when absent
    pub hours: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct StatsData {
    pub telemetry: TelemetryStats,
    pub result_cache: CacheStats,
    pub response_cache: CacheStats,
    pub investigations_in_flight: usize,
    pub uptime_seconds: u64,
    pub api_version: String,
}

#[derive(Debug, Deserialize)]
pub struct CacheKeysQuery {
    pub pattern: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CacheKeysData {
    pub pattern: String,
    pub results: Vec<String>,
    pub responses: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub modules: Vec<&'static str>,
}
