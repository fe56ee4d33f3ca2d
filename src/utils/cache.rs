//! High-Performance In-Memory TTL Cache
//!
//! Thread-safe expiring key/value store used for investigation bundles and
//! for API responses. Backed by DashMap so concurrent investigations only
//! contend on the shard that holds their key.
//!
//! Features:
//! - Per-entry TTL, reset on every `set`
//! - Expiry-on-read: an expired entry is reported absent and removed
//! - Glob-style key listing over live entries
//! - HIT/MISS counters for monitoring

use dashmap::DashMap;
use regex::Regex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::DEFAULT_CACHE_TTL_SECS;

/// Cache entry with creation and expiry instants
#[derive(Clone, Debug)]
pub struct CacheEntry<V> {
    pub value: V,
    pub created_at: Instant,
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Visible iff `now < expires_at`
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Time left before the entry disappears
    pub fn remaining_ttl(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

/// Generic TTL cache. Cloning shares the underlying store.
#[derive(Clone)]
pub struct TtlCache<V> {
    store: Arc<DashMap<String, CacheEntry<V>>>,
    default_ttl: Duration,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> TtlCache<V> {
    /// Cache with the default TTL (5 minutes)
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(DEFAULT_CACHE_TTL_SECS))
    }

    /// Cache with a custom default TTL
    pub fn with_ttl(default_ttl: Duration) -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            default_ttl,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Get a live value. Expired entries are removed as a side effect.
    pub fn get(&self, key: &str) -> Option<V> {
        if let Some(entry) = self.store.get(key) {
            if !entry.is_expired() {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "✅ CACHE HIT: {} (TTL: {}s remaining)",
                    key,
                    entry.remaining_ttl().as_secs()
                );
                return Some(entry.value.clone());
            }
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!("📭 CACHE MISS: {}", key);
            return None;
        }

        // Expired: only remove if no writer refreshed the entry in between
        self.store.remove_if(key, |_, entry| entry.is_expired());
        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("📭 CACHE MISS (expired): {}", key);
        None
    }

    /// Insert with the default TTL
    pub fn insert(&self, key: &str, value: V) {
        self.set(key, value, self.default_ttl);
    }

    /// Unconditional overwrite; the expiry clock restarts now
    pub fn set(&self, key: &str, value: V, ttl: Duration) {
        self.store
            .insert(key.to_string(), CacheEntry::new(value, ttl));
        debug!("💾 CACHE SET: {} (TTL: {}s)", key, ttl.as_secs());
    }

    /// Remove an entry, returning whether a live one was present
    pub fn delete(&self, key: &str) -> bool {
        let removed = self
            .store
            .remove(key)
            .map(|(_, entry)| !entry.is_expired())
            .unwrap_or(false);
        debug!("🗑️ CACHE DELETE: {}", key);
        removed
    }

    /// True if a live entry exists. Does not touch the hit counters.
    pub fn contains(&self, key: &str) -> bool {
        self.store
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false)
    }

    /// Keys of live entries matching `pattern`.
    ///
    /// `*` matches any run of characters and `?` exactly one; a pattern
    /// without wildcards is a literal match. Results are sorted.
    pub fn keys(&self, pattern: &str) -> AppResult<Vec<String>> {
        let matcher = glob_to_regex(pattern)?;
        let mut keys: Vec<String> = self
            .store
            .iter()
            .filter(|entry| !entry.value().is_expired() && matcher.is_match(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Drop every expired entry. Optional: correctness never depends on it.
    pub fn cleanup_expired(&self) -> usize {
        let before = self.store.len();
        self.store.retain(|_, entry| !entry.is_expired());
        let removed = before.saturating_sub(self.store.len());
        if removed > 0 {
            info!("🧹 CACHE CLEANUP: {} expired entries removed", removed);
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        CacheStats {
            entries: self.store.len(),
            hits,
            misses,
            hit_rate,
            ttl_secs: self.default_ttl.as_secs(),
        }
    }

    pub fn clear(&self) {
        self.store.clear();
        info!("🗑️ CACHE CLEARED");
    }
}

/// Translate a glob into an anchored regex
fn glob_to_regex(pattern: &str) -> AppResult<Regex> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr).map_err(|e| AppError::bad_request(format!("Invalid key pattern: {}", e)))
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub ttl_secs: u64,
}
