//! Phone Sentry - phone number investigation engine
//!
//! Runs a set of independent investigation modules against a phone number:
//! - Offline parsing and validation (country, line type, timezones)
//! - Spam / virtual-number risk scoring
//! - Social media and web search lookups through pluggable providers
//! - Rule-based risk inference over the digit pattern
//!
//! Each module is rate limited, time bounded and isolated from the others.
//! Full investigations run in the background and are polled from a TTL cache.

pub mod api;
pub mod core;
pub mod models;
pub mod providers;
pub mod utils;

pub use crate::core::manager::ModuleManager;
pub use crate::core::orchestrator::InvestigationOrchestrator;
pub use crate::core::rules::{RuleEngine, RuleTable};
pub use models::config::AppConfig;
pub use models::errors::{AppError, AppResult, ErrorCode};
pub use models::types::{
    AiAnalysis, InvestigationBundle, InvestigationPoll, ModuleResult, PhoneNumber, RiskLevel,
    StartOutcome,
};
pub use providers::{DataProvider, InvestigationStore, MemoryStore};
pub use utils::cache::{CacheStats, TtlCache};
pub use utils::rate_limiter::{RateLimitConfig, RateLimiter};
pub use utils::telemetry::{TelemetryCollector, TelemetryEvent, TelemetryStats};
