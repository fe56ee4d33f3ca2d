//! Type definitions for Phone Sentry
//! Core data structures shared by modules, the orchestrator and the API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::errors::{AppError, AppResult};

/// Longest raw input accepted before normalization
const MAX_INPUT_LEN: usize = 32;

// ============================================
// Phone Number
// ============================================

/// Normalized phone number input.
///
/// Only the canonical string is stored. The digit sequence is derived from it
/// on every call to [`PhoneNumber::digits`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Normalize raw user input.
    ///
    /// Whitespace and the usual separators (`-`, `.`, `(`, `)`, `/`) are
    /// dropped. Anything else is kept so that later parsing can flag it.
    /// Fails only when the input is blank, oversized, or has no digits.
    pub fn new(raw: &str) -> AppResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::invalid_phone("Phone number is required"));
        }
        if trimmed.len() > MAX_INPUT_LEN {
            return Err(AppError::invalid_phone(format!(
                "Phone number longer than {} characters",
                MAX_INPUT_LEN
            )));
        }

        let canonical: String = trimmed
            .chars()
            .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '.' | '(' | ')' | '/'))
            .collect();

        if !canonical.chars().any(|c| c.is_ascii_digit()) {
            return Err(AppError::invalid_phone("Phone number contains no digits"));
        }

        Ok(Self(canonical))
    }

    /// Canonical form, also used as the cache key
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// All non-digit characters stripped
    pub fn digits(&self) -> String {
        self.0.chars().filter(|c| c.is_ascii_digit()).collect()
    }

    /// Privacy mask used for telemetry subjects: only the last four digits survive
    pub fn masked(&self) -> String {
        let digits = self.digits();
        let tail = &digits[digits.len().saturating_sub(4)..];
        format!("***{}", tail)
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================
// Risk
// ============================================

/// Coarse risk tier. Ordering is `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            RiskLevel::Low => "🟢",
            RiskLevel::Medium => "🟠",
            RiskLevel::High => "🔴",
        }
    }
}

/// Rule-engine summary attached to every bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub insights: Vec<String>,
    pub entropy: f64,
    pub risk_level: RiskLevel,
    pub pattern_analysis: Vec<String>,
}

// ============================================
// Module Results
// ============================================

/// Structured error payload of a failed module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleError {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl From<&AppError> for ModuleError {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code_str().to_string(),
            message: err.message.clone(),
            retryable: err.code.is_retryable(),
        }
    }
}

/// Outcome of one module invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleResult {
    pub module: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ModuleError>,
    pub duration_ms: f64,
    pub timestamp: i64,
}

impl ModuleResult {
    pub fn ok(module: &str, data: Value, duration_ms: f64) -> Self {
        Self {
            module: module.to_string(),
            success: true,
            data: Some(data),
            error: None,
            duration_ms,
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn failed(module: &str, err: &AppError, duration_ms: f64) -> Self {
        Self {
            module: module.to_string(),
            success: false,
            data: None,
            error: Some(err.into()),
            duration_ms,
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.error
            .as_ref()
            .map(|e| e.code.ends_with("RATE_LIMITED"))
            .unwrap_or(false)
    }
}

// ============================================
// Investigation Bundle
// ============================================

/// Terminal state of an investigation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvestigationStatus {
    Complete,
    Failed,
}

/// Merged results of every module plus the rule-engine summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestigationBundle {
    pub phone_number: String,
    pub status: InvestigationStatus,
    pub results: BTreeMap<String, ModuleResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<AiAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl InvestigationBundle {
    /// Bundle for a run that finished with every module reported
    pub fn complete(
        phone: &PhoneNumber,
        results: BTreeMap<String, ModuleResult>,
        ai_analysis: AiAnalysis,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            phone_number: phone.to_string(),
            status: InvestigationStatus::Complete,
            results,
            ai_analysis: Some(ai_analysis),
            error: None,
            started_at,
            completed_at: Utc::now(),
        }
    }

    /// Error bundle for a run that failed unexpectedly
    pub fn failed(phone: &PhoneNumber, err: &AppError, started_at: DateTime<Utc>) -> Self {
        Self {
            phone_number: phone.to_string(),
            status: InvestigationStatus::Failed,
            results: BTreeMap::new(),
            ai_analysis: None,
            error: Some(err.to_string()),
            started_at,
            completed_at: Utc::now(),
        }
    }

    pub fn successful_modules(&self) -> usize {
        self.results.values().filter(|r| r.success).count()
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        let risk = self
            .ai_analysis
            .as_ref()
            .map(|a| format!("{} {}", a.risk_level.emoji(), a.risk_level.as_str()))
            .unwrap_or_else(|| "n/a".to_string());
        format!(
            "Phone: {} | Modules: {}/{} ok | Risk: {} | Took: {}ms",
            self.phone_number,
            self.successful_modules(),
            self.results.len(),
            risk,
            (self.completed_at - self.started_at).num_milliseconds()
        )
    }
}

// ============================================
// Orchestrator contract
// ============================================

/// What `start` did with the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    /// A new background run was spawned
    Started,
    /// A run for this number is already in flight
    AlreadyRunning,
    /// A fresh bundle is already cached
    Cached,
}

/// Answer to a poll: never blocks, only samples the cache
#[derive(Debug, Clone)]
pub enum InvestigationPoll {
    Pending,
    Complete(Arc<InvestigationBundle>),
}

impl InvestigationPoll {
    pub fn status_str(&self) -> &'static str {
        match self {
            InvestigationPoll::Pending => "pending",
            InvestigationPoll::Complete(b) if b.status == InvestigationStatus::Failed => "failed",
            InvestigationPoll::Complete(_) => "complete",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, InvestigationPoll::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_normalization() {
        let phone = PhoneNumber::new(" +1 (800) 555-1234 ").unwrap();
        assert_eq!(phone.as_str(), "+18005551234");
        assert_eq!(phone.digits(), "18005551234");
    }

    #[test]
    fn test_phone_keeps_unexpected_characters() {
        let phone = PhoneNumber::new("+1800FLOWERS1").unwrap();
        assert_eq!(phone.as_str(), "+1800FLOWERS1");
        assert_eq!(phone.digits(), "18001");
    }

    #[test]
    fn test_phone_rejects_blank_and_digitless() {
        assert!(PhoneNumber::new("   ").is_err());
        assert!(PhoneNumber::new("call me").is_err());
        assert!(PhoneNumber::new(&"9".repeat(40)).is_err());
    }

    #[test]
    fn test_masked_subject() {
        let phone = PhoneNumber::new("+442071838750").unwrap();
        assert_eq!(phone.masked(), "***8750");
        let short = PhoneNumber::new("12").unwrap();
        assert_eq!(short.masked(), "***12");
    }

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert_eq!(
            [RiskLevel::Medium, RiskLevel::Low].iter().max(),
            Some(&RiskLevel::Medium)
        );
    }

    #[test]
    fn test_failed_bundle_carries_error() {
        let phone = PhoneNumber::new("+15550001111").unwrap();
        let bundle =
            InvestigationBundle::failed(&phone, &AppError::internal("cache poisoned"), Utc::now());
        assert_eq!(bundle.status, InvestigationStatus::Failed);
        assert!(bundle.error.as_deref().unwrap_or("").contains("cache poisoned"));
        assert!(bundle.ai_analysis.is_none());
        let poll = InvestigationPoll::Complete(Arc::new(bundle));
        assert_eq!(poll.status_str(), "failed");
    }
}
