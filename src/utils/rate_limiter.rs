//! Sliding-window rate limiter
//!
//! One limiter instance serves many keys (module names, caller identities).
//! Each key owns an ordered window of admission instants. Stale instants are
//! pruned lazily, only when that key is checked again.
//!
//! The prune-check-record sequence runs while holding the DashMap shard
//! lock for the key, so concurrent callers on the same key can never be
//! admitted beyond the limit.

use dashmap::DashMap;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::warn;

/// Admissions allowed per trailing period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub limit: u32,
    pub period: Duration,
}

impl RateLimitConfig {
    pub fn new(limit: u32, period: Duration) -> Self {
        Self { limit, period }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: crate::utils::constants::DEFAULT_MODULE_RATE_LIMIT,
            period: Duration::from_secs(crate::utils::constants::DEFAULT_MODULE_RATE_PERIOD_SECS),
        }
    }
}

/// Result of a single admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// Admissions left in the current window after this call
    pub remaining: u32,
    /// Time until the oldest retained admission leaves the window
    pub reset_after: Duration,
}

/// Keyed sliding-window limiter
pub struct RateLimiter {
    windows: DashMap<String, VecDeque<Instant>>,
    default_config: RateLimitConfig,
    overrides: HashMap<String, RateLimitConfig>,
}

impl RateLimiter {
    pub fn new(default_config: RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            default_config,
            overrides: HashMap::new(),
        }
    }

    /// Give one key its own `(limit, period)`
    pub fn with_override(mut self, key: impl Into<String>, config: RateLimitConfig) -> Self {
        self.overrides.insert(key.into(), config);
        self
    }

    pub fn config_for(&self, key: &str) -> RateLimitConfig {
        self.overrides
            .get(key)
            .copied()
            .unwrap_or(self.default_config)
    }

    /// Admit or deny. Never blocks on time; only on the key's shard lock.
    pub fn allow(&self, key: &str) -> bool {
        self.check(key).allowed
    }

    /// Admission check with bookkeeping details for response headers
    pub fn check(&self, key: &str) -> RateDecision {
        let config = self.config_for(key);
        let now = Instant::now();

        let mut window = self.windows.entry(key.to_string()).or_default();

        while let Some(&oldest) = window.front() {
            if now.duration_since(oldest) >= config.period {
                window.pop_front();
            } else {
                break;
            }
        }

        let limit = config.limit as usize;
        let allowed = window.len() < limit;
        if allowed {
            window.push_back(now);
        }

        let reset_after = window
            .front()
            .map(|&oldest| config.period.saturating_sub(now.duration_since(oldest)))
            .unwrap_or(Duration::ZERO);
        let remaining = limit.saturating_sub(window.len()) as u32;

        if !allowed {
            warn!(
                key = %key,
                limit = config.limit,
                period_secs = config.period.as_secs(),
                "🚦 Rate limit exceeded"
            );
        }

        RateDecision {
            allowed,
            remaining,
            reset_after,
        }
    }

    /// Admissions currently retained for a key (stale ones included until the next check)
    pub fn in_window(&self, key: &str) -> usize {
        self.windows.get(key).map(|w| w.len()).unwrap_or(0)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_admits_up_to_limit() {
        let limiter = RateLimiter::new(RateLimitConfig::new(3, Duration::from_secs(60)));
        assert!(limiter.allow("spam_risk"));
        assert!(limiter.allow("spam_risk"));
        assert!(limiter.allow("spam_risk"));
        assert!(!limiter.allow("spam_risk"));
        // Denials are not recorded
        assert_eq!(limiter.in_window("spam_risk"), 3);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new(RateLimitConfig::new(1, Duration::from_secs(60)));
        assert!(limiter.allow("phone_info"));
        assert!(!limiter.allow("phone_info"));
        assert!(limiter.allow("web_search"));
    }

    #[test]
    fn test_window_slides() {
        let limiter = RateLimiter::new(RateLimitConfig::new(2, Duration::from_millis(50)));
        assert!(limiter.allow("k"));
        assert!(limiter.allow("k"));
        assert!(!limiter.allow("k"));
        std::thread::sleep(Duration::from_millis(70));
        assert!(limiter.allow("k"));
        assert_eq!(limiter.in_window("k"), 1);
    }

    #[test]
    fn test_decision_details() {
        let limiter = RateLimiter::new(RateLimitConfig::new(2, Duration::from_secs(60)));
        let first = limiter.check("caller");
        assert!(first.allowed);
        assert_eq!(first.remaining, 1);
        assert!(first.reset_after <= Duration::from_secs(60));

        limiter.check("caller");
        let denied = limiter.check("caller");
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert!(denied.reset_after > Duration::ZERO);
    }

    #[test]
    fn test_zero_limit_denies_everything() {
        let limiter = RateLimiter::new(RateLimitConfig::new(0, Duration::from_secs(1)));
        assert!(!limiter.allow("k"));
    }

    #[test]
    fn test_override_applies_to_single_key() {
        let limiter = RateLimiter::new(RateLimitConfig::new(1, Duration::from_secs(60)))
            .with_override("numverify", RateLimitConfig::new(3, Duration::from_secs(3600)));
        assert_eq!(limiter.config_for("numverify").limit, 3);
        assert!(limiter.allow("numverify"));
        assert!(limiter.allow("numverify"));
        assert!(limiter.allow("numverify"));
        assert!(!limiter.allow("numverify"));
        assert!(limiter.allow("other"));
        assert!(!limiter.allow("other"));
    }

    #[test]
    fn test_concurrent_callers_never_exceed_limit() {
        let limiter = Arc::new(RateLimiter::new(RateLimitConfig::new(25, Duration::from_secs(60))));
        let admitted = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                let admitted = admitted.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        if limiter.allow("shared") {
                            admitted.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(admitted.load(Ordering::SeqCst), 25);
        assert_eq!(limiter.in_window("shared"), 25);
    }
}
