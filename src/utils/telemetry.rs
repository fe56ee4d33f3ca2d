//! Telemetry Module for Phone Sentry
//!
//! Bounded, in-memory record of module invocations:
//! - request ring buffer (every module call, success or failure)
//! - error ring buffer (failures only, with error text)
//!
//! Both buffers evict their oldest entry first once full. The data is pure
//! observability and never feeds back into control decisions.
//!
//! Privacy-first: subjects are masked phone numbers (last four digits only).

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::utils::constants::{
    TELEMETRY_ERROR_CAPACITY, TELEMETRY_RECENT_ERRORS, TELEMETRY_REQUEST_CAPACITY,
};

/// Single telemetry event (anonymized)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetryEvent {
    pub timestamp: DateTime<Utc>,
    /// Masked phone number, or "system"
    pub subject: String,
    pub module: String,
    pub success: bool,
    pub duration_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TelemetryEvent {
    pub fn success(subject: impl Into<String>, module: impl Into<String>, duration_ms: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            subject: subject.into(),
            module: module.into(),
            success: true,
            duration_ms,
            error: None,
        }
    }

    pub fn failure(
        subject: impl Into<String>,
        module: impl Into<String>,
        duration_ms: f64,
        error: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            subject: subject.into(),
            module: module.into(),
            success: false,
            duration_ms,
            error: Some(error.into()),
        }
    }
}

/// Per-module slice of the report
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModuleStats {
    pub requests: u64,
    pub failures: u64,
    pub avg_response_time_ms: f64,
}

/// Aggregated statistics for one reporting period
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Percent, 0-100
    pub success_rate: f64,
    /// Percent, 0-100
    pub error_rate: f64,
    pub avg_response_time_ms: f64,
    pub modules: BTreeMap<String, ModuleStats>,
    pub recent_errors: Vec<TelemetryEvent>,
    /// None means "everything still buffered"
    pub period_hours: Option<u32>,
    pub session_start: Option<DateTime<Utc>>,
    pub generated_at: Option<DateTime<Utc>>,
}

impl TelemetryStats {
    /// Export as JSON for API
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Short human-readable report for shutdown logs
    pub fn summary(&self) -> String {
        format!(
            "Requests: {} | OK: {} | Errors: {:.2}% | Avg: {:.2}ms",
            self.total_requests, self.successful_requests, self.error_rate, self.avg_response_time_ms
        )
    }
}

/// Ring-buffered telemetry store, shared by every module
pub struct TelemetryCollector {
    requests: Mutex<VecDeque<TelemetryEvent>>,
    errors: Mutex<VecDeque<TelemetryEvent>>,
    request_capacity: usize,
    error_capacity: usize,
    session_start: DateTime<Utc>,
}

impl TelemetryCollector {
    /// Collector with the standard capacities (1000 requests, 100 errors)
    pub fn new() -> Self {
        Self::with_capacity(TELEMETRY_REQUEST_CAPACITY, TELEMETRY_ERROR_CAPACITY)
    }

    pub fn with_capacity(request_capacity: usize, error_capacity: usize) -> Self {
        Self {
            requests: Mutex::new(VecDeque::with_capacity(request_capacity)),
            errors: Mutex::new(VecDeque::with_capacity(error_capacity)),
            request_capacity,
            error_capacity,
            session_start: Utc::now(),
        }
    }

    /// Record one module invocation; failures also land in the error buffer
    pub fn record(&self, event: TelemetryEvent) {
        if !event.success {
            push_bounded(&self.errors, event.clone(), self.error_capacity);
        }
        push_bounded(&self.requests, event, self.request_capacity);
    }

    /// Record an error that is not tied to a module call (e.g. a crashed run)
    pub fn record_error(&self, subject: &str, module: &str, message: &str) {
        push_bounded(
            &self.errors,
            TelemetryEvent::failure(subject, module, 0.0, message),
            self.error_capacity,
        );
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Aggregate over events newer than `period_hours` (all buffered events when None)
    pub fn get_stats(&self, period_hours: Option<u32>) -> TelemetryStats {
        let now = Utc::now();
        let cutoff = period_hours.map(|h| now - ChronoDuration::hours(i64::from(h)));
        let in_period = |e: &TelemetryEvent| cutoff.map(|c| e.timestamp >= c).unwrap_or(true);

        let requests: Vec<TelemetryEvent> = {
            let guard = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
            guard.iter().filter(|e| in_period(*e)).cloned().collect()
        };

        let recent_errors: Vec<TelemetryEvent> = {
            let guard = self.errors.lock().unwrap_or_else(PoisonError::into_inner);
            let matching: Vec<&TelemetryEvent> = guard.iter().filter(|e| in_period(*e)).collect();
            let skip = matching.len().saturating_sub(TELEMETRY_RECENT_ERRORS);
            matching.into_iter().skip(skip).cloned().collect()
        };

        let total = requests.len() as u64;
        let successful = requests.iter().filter(|e| e.success).count() as u64;
        let failed = total - successful;
        let total_ms: f64 = requests.iter().map(|e| e.duration_ms).sum();

        let mut modules: BTreeMap<String, ModuleStats> = BTreeMap::new();
        let mut module_ms: BTreeMap<String, f64> = BTreeMap::new();
        for event in &requests {
            let stats = modules.entry(event.module.clone()).or_default();
            stats.requests += 1;
            if !event.success {
                stats.failures += 1;
            }
            *module_ms.entry(event.module.clone()).or_insert(0.0) += event.duration_ms;
        }
        for (name, stats) in modules.iter_mut() {
            let ms = module_ms.get(name).copied().unwrap_or(0.0);
            stats.avg_response_time_ms = ms / stats.requests as f64;
        }

        let (success_rate, error_rate, avg_ms) = if total > 0 {
            (
                successful as f64 / total as f64 * 100.0,
                failed as f64 / total as f64 * 100.0,
                total_ms / total as f64,
            )
        } else {
            (0.0, 0.0, 0.0)
        };

        TelemetryStats {
            total_requests: total,
            successful_requests: successful,
            failed_requests: failed,
            success_rate,
            error_rate,
            avg_response_time_ms: avg_ms,
            modules,
            recent_errors,
            period_hours,
            session_start: Some(self.session_start),
            generated_at: Some(now),
        }
    }

    /// Write the current full report to `<dir>/stats_<unix>.json`
    pub fn export_stats_json(&self, dir: &Path) -> Result<PathBuf, std::io::Error> {
        fs::create_dir_all(dir)?;
        let stats = self.get_stats(None);
        let path = dir.join(format!("stats_{}.json", Utc::now().timestamp()));
        let json = serde_json::to_string_pretty(&stats)?;
        fs::write(&path, json)?;
        Ok(path)
    }

    /// Drop all buffered events
    pub fn reset(&self) {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clear();
        self.errors.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Append and trim under one lock acquisition
fn push_bounded(buffer: &Mutex<VecDeque<TelemetryEvent>>, event: TelemetryEvent, capacity: usize) {
    let mut guard = buffer.lock().unwrap_or_else(PoisonError::into_inner);
    guard.push_back(event);
    while guard.len() > capacity {
        guard.pop_front();
    }
}
