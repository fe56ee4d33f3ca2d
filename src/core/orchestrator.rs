//! Investigation Orchestrator
//!
//! Turns `ModuleManager::execute_all` into a start/poll contract:
//!
//! ```text
//! NotStarted --start--> Running --all modules reported--> Complete
//!                          \--unexpected failure-------> Failed (error bundle)
//! ```
//!
//! A run's bundle becomes visible only through the result cache. The
//! in-flight map guarantees at most one run per number; the bundle is
//! written to the cache before the in-flight marker is removed, so a
//! concurrent `start` either sees the marker or sees the cached bundle.
//! The store record is updated last: a failing store cannot leave a
//! poller waiting on a run that already finished.

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::core::manager::{panic_message, ModuleManager};
use crate::models::errors::AppError;
use crate::models::types::{InvestigationBundle, InvestigationPoll, PhoneNumber, StartOutcome};
use crate::providers::store::InvestigationStore;
use crate::utils::cache::TtlCache;

pub type BundleCache = TtlCache<Arc<InvestigationBundle>>;

/// Produces the bundle for one run. Defaults to `ModuleManager::execute_all`.
pub type RunFn =
    Arc<dyn Fn(Arc<ModuleManager>, PhoneNumber) -> BoxFuture<'static, InvestigationBundle> + Send + Sync>;

fn execute_all_runner() -> RunFn {
    Arc::new(|manager: Arc<ModuleManager>, phone: PhoneNumber| {
        async move { manager.execute_all(&phone).await }.boxed()
    })
}

pub struct InvestigationOrchestrator {
    manager: Arc<ModuleManager>,
    results: BundleCache,
    /// number -> store record id (nil when no store is attached)
    in_flight: Arc<DashMap<String, Uuid>>,
    store: Option<Arc<dyn InvestigationStore>>,
    runner: RunFn,
}

impl InvestigationOrchestrator {
    pub fn new(manager: Arc<ModuleManager>, results: BundleCache) -> Self {
        Self {
            manager,
            results,
            in_flight: Arc::new(DashMap::new()),
            store: None,
            runner: execute_all_runner(),
        }
    }

    /// Record every run through a persistence provider
    pub fn with_store(mut self, store: Arc<dyn InvestigationStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace how a run produces its bundle (staged pipelines, fault injection)
    pub fn with_runner(mut self, runner: RunFn) -> Self {
        self.runner = runner;
        self
    }

    pub fn manager(&self) -> &Arc<ModuleManager> {
        &self.manager
    }

    pub fn results(&self) -> &BundleCache {
        &self.results
    }

    pub fn is_running(&self, phone: &PhoneNumber) -> bool {
        self.in_flight.contains_key(phone.as_str())
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Begin an investigation unless one is cached or already running.
    ///
    /// Returns immediately; must be called from within a Tokio runtime.
    pub fn start(&self, phone: PhoneNumber) -> StartOutcome {
        let key = phone.as_str().to_string();

        if self.results.contains(&key) {
            info!("📦 Investigation for {} already cached", phone.masked());
            return StartOutcome::Cached;
        }

        match self.in_flight.entry(key.clone()) {
            Entry::Occupied(_) => {
                info!("⏳ Investigation for {} already running", phone.masked());
                return StartOutcome::AlreadyRunning;
            }
            Entry::Vacant(slot) => {
                slot.insert(Uuid::nil());
            }
        }

        // A run may have finished between the cache check and the insert.
        if self.results.contains(&key) {
            self.in_flight.remove(&key);
            return StartOutcome::Cached;
        }

        let record_id = self.open_record(&phone);
        if let Some(id) = record_id {
            if let Some(mut marker) = self.in_flight.get_mut(&key) {
                *marker = id;
            }
        }

        info!("🚀 Starting investigation for {}", phone.masked());
        self.spawn_run(key, phone, record_id);
        StartOutcome::Started
    }

    /// Sample the result cache. Never blocks.
    pub fn poll(&self, phone: &PhoneNumber) -> InvestigationPoll {
        match self.results.get(phone.as_str()) {
            Some(bundle) => InvestigationPoll::Complete(bundle),
            None => InvestigationPoll::Pending,
        }
    }

    fn open_record(&self, phone: &PhoneNumber) -> Option<Uuid> {
        let store = self.store.as_ref()?;
        match store.create(phone) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("⚠️ Could not record investigation: {}", e);
                None
            }
        }
    }

    fn spawn_run(&self, key: String, phone: PhoneNumber, record_id: Option<Uuid>) {
        let manager = self.manager.clone();
        let results = self.results.clone();
        let in_flight = self.in_flight.clone();
        let store = self.store.clone();
        let runner = self.runner.clone();

        tokio::spawn(async move {
            let started_at = Utc::now();

            // Inner task: a panic anywhere in the run surfaces as a JoinError
            let run = tokio::spawn(runner(manager.clone(), phone.clone()));

            let bundle = match run.await {
                Ok(bundle) => bundle,
                Err(join_err) => {
                    let err = AppError::internal(format!(
                        "Investigation run failed: {}",
                        panic_message(join_err)
                    ));
                    error!("💥 {} ({})", err, phone.masked());
                    manager
                        .context()
                        .telemetry
                        .record_error(&phone.masked(), "orchestrator", &err.to_string());
                    InvestigationBundle::failed(&phone, &err, started_at)
                }
            };

            let bundle = Arc::new(bundle);
            results.insert(&key, bundle.clone());
            in_flight.remove(&key);

            if let (Some(store), Some(id)) = (store.as_ref(), record_id) {
                if let Err(e) = store.complete(id, &bundle) {
                    warn!("⚠️ Could not update investigation {}: {}", id, e);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::modules::{InvestigationModule, ModuleContext};
    use crate::core::rules::RuleEngine;
    use crate::models::types::InvestigationStatus;
    use crate::models::errors::AppResult;
    use crate::providers::store::{
        InvestigationRecord, MemoryStore, RecordFilter, RecordStatus,
    };
    use crate::utils::rate_limiter::{RateLimitConfig, RateLimiter};
    use crate::utils::telemetry::TelemetryCollector;
    use std::time::Duration;

    fn orchestrator() -> InvestigationOrchestrator {
        let ctx = ModuleContext::new(
            Arc::new(RateLimiter::new(RateLimitConfig::new(100, Duration::from_secs(60)))),
            Arc::new(TelemetryCollector::new()),
        );
        let manager = ModuleManager::new(
            InvestigationModule::defaults(None),
            ctx,
            Arc::new(RuleEngine::default()),
        );
        InvestigationOrchestrator::new(Arc::new(manager), TtlCache::new())
    }

    async fn wait_complete(
        orchestrator: &InvestigationOrchestrator,
        phone: &PhoneNumber,
    ) -> Arc<InvestigationBundle> {
        for _ in 0..200 {
            if let InvestigationPoll::Complete(bundle) = orchestrator.poll(phone) {
                return bundle;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("investigation did not complete");
    }

    #[tokio::test]
    async fn test_pending_then_complete() {
        let orchestrator = orchestrator();
        let phone = PhoneNumber::new("+18005551234").unwrap();
        assert!(orchestrator.poll(&phone).is_pending());

        assert_eq!(orchestrator.start(phone.clone()), StartOutcome::Started);
        let bundle = wait_complete(&orchestrator, &phone).await;

        assert_eq!(bundle.status, InvestigationStatus::Complete);
        assert_eq!(bundle.results.len(), 4);
        assert!(!orchestrator.is_running(&phone));
        assert_eq!(orchestrator.start(phone), StartOutcome::Cached);
    }

    #[tokio::test]
    async fn test_duplicate_start_while_running() {
        let orchestrator = orchestrator();
        let phone = PhoneNumber::new("+442071838750").unwrap();

        // Current-thread runtime: the run cannot progress until we yield
        assert_eq!(orchestrator.start(phone.clone()), StartOutcome::Started);
        assert_eq!(orchestrator.start(phone.clone()), StartOutcome::AlreadyRunning);
        assert_eq!(orchestrator.in_flight_count(), 1);

        wait_complete(&orchestrator, &phone).await;
        assert_eq!(orchestrator.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_store_records_lifecycle() {
        let store = Arc::new(MemoryStore::new());
        let orchestrator = orchestrator().with_store(store.clone());
        let phone = PhoneNumber::new("+19005550000").unwrap();

        orchestrator.start(phone.clone());
        let running = store.query(&RecordFilter::default()).unwrap();
        assert_eq!(running[0].status, RecordStatus::Running);

        wait_complete(&orchestrator, &phone).await;
        let done = store
            .query(&RecordFilter {
                phone_number: Some(phone.to_string()),
                status: Some(RecordStatus::Complete),
            })
            .unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].successful_modules, 4);
    }

    async fn exploding_run(_manager: Arc<ModuleManager>, _phone: PhoneNumber) -> InvestigationBundle {
        panic!("pipeline exploded")
    }

    #[tokio::test]
    async fn test_failed_run_is_cached_as_failed() {
        let runner: RunFn = Arc::new(|manager: Arc<ModuleManager>, phone: PhoneNumber| {
            exploding_run(manager, phone).boxed()
        });
        let orchestrator = orchestrator().with_runner(runner);
        let phone = PhoneNumber::new("+14158586273").unwrap();

        assert_eq!(orchestrator.start(phone.clone()), StartOutcome::Started);
        assert_eq!(orchestrator.poll(&phone).status_str(), "pending");

        let bundle = wait_complete(&orchestrator, &phone).await;
        assert_eq!(orchestrator.poll(&phone).status_str(), "failed");
        assert_eq!(bundle.status, InvestigationStatus::Failed);
        assert!(bundle.results.is_empty());
        assert!(bundle.error.as_deref().unwrap().contains("pipeline exploded"));
        assert_eq!(orchestrator.in_flight_count(), 0);

        let stats = orchestrator.manager().context().telemetry.get_stats(None);
        assert!(stats.recent_errors.iter().any(|e| e.module == "orchestrator"));

        // A failed bundle is served from the cache like any other
        assert_eq!(orchestrator.start(phone), StartOutcome::Cached);
    }

    /// Store whose completion update panics
    struct BrokenStore;

    impl InvestigationStore for BrokenStore {
        fn create(&self, _phone: &PhoneNumber) -> AppResult<Uuid> {
            Ok(Uuid::new_v4())
        }

        fn complete(&self, _id: Uuid, _bundle: &InvestigationBundle) -> AppResult<()> {
            panic!("store went away");
        }

        fn query(&self, _filter: &RecordFilter) -> AppResult<Vec<InvestigationRecord>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_broken_store_does_not_strand_pollers() {
        let orchestrator = orchestrator().with_store(Arc::new(BrokenStore));
        let phone = PhoneNumber::new("+18005551234").unwrap();

        assert_eq!(orchestrator.start(phone.clone()), StartOutcome::Started);
        let bundle = wait_complete(&orchestrator, &phone).await;

        assert_eq!(bundle.status, InvestigationStatus::Complete);
        assert_eq!(orchestrator.in_flight_count(), 0);
        assert!(!orchestrator.is_running(&phone));
    }
}
