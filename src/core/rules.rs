//! Rule-based risk reasoning
//!
//! The rule table is configuration data: it is loaded once at startup from an
//! optional JSON file and falls back to built-in defaults for any rule the
//! file leaves out. Evaluation is deterministic: the same table and digit
//! sequence always produce the same analysis.
//!
//! Evaluation order (fixed):
//! 1. entropy threshold
//! 2. toll-free patterns (first matching pattern wins)
//! 3. premium-rate patterns (first matching pattern wins)
//!
//! Insights appear in that order. The overall risk is the highest tier among
//! the matched rules, or `low` when nothing matched.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::core::pattern::PatternAnalyzer;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::{AiAnalysis, RiskLevel};

/// Fires when the digit entropy is strictly above `threshold`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRule {
    pub threshold: f64,
    pub message: String,
    pub risk: RiskLevel,
}

/// Fires when any pattern occurs in the digit sequence.
///
/// Digit sequences carry the country calling code, so patterns are matched
/// anywhere in the sequence rather than only at its start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefixRule {
    pub patterns: Vec<String>,
    pub message: String,
    pub risk: RiskLevel,
}

impl PrefixRule {
    /// First pattern (in table order) contained in `digits`
    pub fn first_match(&self, digits: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|p| !p.is_empty() && digits.contains(p.as_str()))
            .map(String::as_str)
    }
}

/// Complete rule table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    #[serde(default = "default_high_entropy")]
    pub high_entropy: ThresholdRule,
    #[serde(default = "default_toll_free")]
    pub toll_free: PrefixRule,
    #[serde(default = "default_premium_rate")]
    pub premium_rate: PrefixRule,
}

fn default_high_entropy() -> ThresholdRule {
    ThresholdRule {
        threshold: 3.5,
        message: "High entropy detected - may be a generated or virtual number".to_string(),
        risk: RiskLevel::Medium,
    }
}

fn default_toll_free() -> PrefixRule {
    PrefixRule {
        patterns: ["800", "888", "877", "866", "855", "844", "833"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        message: "Toll-free number detected".to_string(),
        risk: RiskLevel::Low,
    }
}

fn default_premium_rate() -> PrefixRule {
    PrefixRule {
        patterns: vec!["900".to_string(), "976".to_string()],
        message: "Premium rate number detected".to_string(),
        risk: RiskLevel::High,
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self {
            high_entropy: default_high_entropy(),
            toll_free: default_toll_free(),
            premium_rate: default_premium_rate(),
        }
    }
}

impl RuleTable {
    /// Parse a JSON rule table; missing rules take their defaults
    pub fn from_json(json: &str) -> AppResult<Self> {
        let table: RuleTable = serde_json::from_str(json)
            .map_err(|e| AppError::invalid_rules(format!("Rule table is not valid: {}", e)))?;
        if !table.high_entropy.threshold.is_finite() || table.high_entropy.threshold < 0.0 {
            return Err(AppError::invalid_rules(
                "high_entropy.threshold must be a non-negative number",
            ));
        }
        Ok(table)
    }

    /// Load from `path` if the file exists, otherwise use defaults.
    ///
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        match path {
            Some(p) if p.exists() => {
                let raw = fs::read_to_string(p).map_err(|e| {
                    AppError::invalid_rules(format!("Cannot read {}: {}", p.display(), e))
                })?;
                let table = Self::from_json(&raw)?;
                info!("📜 Loaded reasoning rules from {}", p.display());
                Ok(table)
            }
            Some(p) => {
                info!("📜 No rule file at {}, using default rules", p.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }
}

/// Evaluates a [`RuleTable`] against digit sequences
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    rules: RuleTable,
}

impl RuleEngine {
    pub fn new(rules: RuleTable) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn analyze(&self, digits: &str) -> AiAnalysis {
        let mut insights = Vec::new();
        let mut tiers = Vec::new();

        let entropy = PatternAnalyzer::entropy(digits);
        let entropy_rule = &self.rules.high_entropy;
        if entropy > entropy_rule.threshold {
            insights.push(entropy_rule.message.clone());
            tiers.push(entropy_rule.risk);
        }

        for rule in [&self.rules.toll_free, &self.rules.premium_rate] {
            if let Some(pattern) = rule.first_match(digits) {
                debug!(pattern = %pattern, "rule matched: {}", rule.message);
                insights.push(rule.message.clone());
                tiers.push(rule.risk);
            }
        }

        let risk_level = tiers.into_iter().max().unwrap_or(RiskLevel::Low);

        AiAnalysis {
            insights,
            entropy,
            risk_level,
            pattern_analysis: PatternAnalyzer::patterns(digits),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_threshold(threshold: f64) -> RuleTable {
        let mut table = RuleTable::default();
        table.high_entropy.threshold = threshold;
        table
    }

    #[test]
    fn test_no_match_is_low_with_no_insights() {
        let analysis = RuleEngine::default().analyze("2069408251");
        assert_eq!(analysis.risk_level, RiskLevel::Low);
        assert!(analysis.insights.is_empty());
    }

    #[test]
    fn test_max_tier_wins_over_first_match() {
        // Toll-free (low) and entropy (medium) both match
        let engine = RuleEngine::new(table_with_threshold(2.5));
        let analysis = engine.analyze("18005551234");
        assert!(analysis.entropy > 2.5);
        assert_eq!(analysis.risk_level, RiskLevel::Medium);
        assert_eq!(
            analysis.insights,
            vec![
                "High entropy detected - may be a generated or virtual number".to_string(),
                "Toll-free number detected".to_string(),
            ]
        );
    }

    #[test]
    fn test_premium_rate_is_high() {
        let analysis = RuleEngine::default().analyze("19005550000");
        assert_eq!(analysis.risk_level, RiskLevel::High);
        assert_eq!(analysis.insights, vec!["Premium rate number detected".to_string()]);
    }

    #[test]
    fn test_prefix_rule_contributes_once() {
        // Contains 800, 888 and 877: still a single toll-free insight
        let analysis = RuleEngine::default().analyze("8008888770");
        assert_eq!(analysis.insights.len(), 1);
        assert_eq!(
            RuleTable::default().toll_free.first_match("8778888000"),
            Some("800")
        );
    }

    #[test]
    fn test_default_threshold_unreachable_for_digits() {
        let analysis = RuleEngine::default().analyze("0123456789");
        assert!(analysis.entropy < 3.5);
        assert!(analysis.insights.is_empty());
    }

    #[test]
    fn test_analysis_is_reproducible() {
        let engine = RuleEngine::new(table_with_threshold(1.0));
        assert_eq!(engine.analyze("19765551234"), engine.analyze("19765551234"));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let table = RuleTable::from_json(
            r#"{"premium_rate": {"patterns": ["909"], "message": "Premium", "risk": "medium"}}"#,
        )
        .unwrap();
        assert_eq!(table.premium_rate.patterns, vec!["909".to_string()]);
        assert_eq!(table.premium_rate.risk, RiskLevel::Medium);
        assert_eq!(table.toll_free, RuleTable::default().toll_free);
        assert_eq!(table.high_entropy.threshold, 3.5);
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(RuleTable::from_json("{not json").is_err());
        assert!(RuleTable::from_json(
            r#"{"high_entropy": {"threshold": -1.0, "message": "x", "risk": "low"}}"#
        )
        .is_err());
        assert!(RuleTable::from_json(
            r#"{"toll_free": {"patterns": [], "message": "x", "risk": "severe"}}"#
        )
        .is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let table = RuleTable::load(Some(Path::new("/nonexistent/reasoning_rules.json"))).unwrap();
        assert_eq!(table, RuleTable::default());
    }
}
