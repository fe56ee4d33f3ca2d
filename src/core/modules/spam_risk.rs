//! spam_risk: additive heuristic score.
//!
//! | Signal                         | Points |
//! |--------------------------------|--------|
//! | unparsable number              | +50    |
//! | parses but invalid for its plan| +30    |
//! | digits start with a spam prefix| +20    |
//! | virtual 4-digit run            | +15    |
//!
//! The two format penalties are mutually exclusive. A total of zero is
//! floored to 10, and the score is clamped to 0..=100.

use serde::Serialize;
use serde_json::Value;

use crate::core::phone;
use crate::models::errors::AppResult;
use crate::models::types::{PhoneNumber, RiskLevel};
use crate::utils::constants::{KNOWN_SPAM_PREFIXES, VIRTUAL_NUMBER_PATTERNS_4};

const UNPARSABLE_PENALTY: u32 = 50;
const INVALID_PENALTY: u32 = 30;
const SPAM_PREFIX_PENALTY: u32 = 20;
const VIRTUAL_PATTERN_PENALTY: u32 = 15;
const BASELINE_SCORE: u32 = 10;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SpamAssessment {
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub reasons: Vec<String>,
    pub description: String,
}

pub fn risk_level(score: u32) -> RiskLevel {
    if score < 20 {
        RiskLevel::Low
    } else if score < 50 {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

pub fn risk_description(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Low => "This number appears to be low risk.",
        RiskLevel::Medium => "This number shows some risk factors. Exercise caution.",
        RiskLevel::High => "This number appears to be high risk. Avoid if possible.",
    }
}

/// Score a number. Pure: no I/O, same input same answer.
pub fn assess(phone: &PhoneNumber) -> SpamAssessment {
    let digits = phone.digits();
    let mut score = 0u32;
    let mut reasons = Vec::new();

    match phone::parse(phone) {
        Ok(parsed) if !parsed.is_valid() => {
            score += INVALID_PENALTY;
            reasons.push("Invalid phone number format".to_string());
        }
        Ok(_) => {}
        Err(_) => {
            score += UNPARSABLE_PENALTY;
            reasons.push("Cannot parse phone number".to_string());
        }
    }

    // Full digit string, calling code included
    if let Some(prefix) = KNOWN_SPAM_PREFIXES.iter().find(|p| digits.starts_with(*p)) {
        score += SPAM_PREFIX_PENALTY;
        reasons.push(format!("Matches known spam prefix: {}", prefix));
    }

    if VIRTUAL_NUMBER_PATTERNS_4.iter().any(|p| digits.contains(p)) {
        score += VIRTUAL_PATTERN_PENALTY;
        reasons.push("Virtual number pattern detected".to_string());
    }

    if score == 0 {
        score = BASELINE_SCORE;
    }
    let score = score.min(100);
    let level = risk_level(score);

    SpamAssessment {
        risk_score: score,
        risk_level: level,
        reasons,
        description: risk_description(level).to_string(),
    }
}

#[derive(Debug, Default)]
pub struct SpamRiskModule;

impl SpamRiskModule {
    pub async fn run(&self, phone: &PhoneNumber) -> AppResult<Value> {
        Ok(serde_json::to_value(assess(phone))?)
    }
}
