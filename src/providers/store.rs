//! Investigation persistence
//!
//! The orchestrator records each run through [`InvestigationStore`]: one
//! record created when a run starts, updated by id when it finishes.
//! [`MemoryStore`] is the in-process implementation; nothing survives a
//! restart.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::types::{InvestigationBundle, InvestigationStatus, PhoneNumber, RiskLevel};

/// Lifecycle of a stored investigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Running,
    Complete,
    Failed,
}

impl RecordStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "running" => Some(Self::Running),
            "complete" => Some(Self::Complete),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl From<InvestigationStatus> for RecordStatus {
    fn from(status: InvestigationStatus) -> Self {
        match status {
            InvestigationStatus::Complete => Self::Complete,
            InvestigationStatus::Failed => Self::Failed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvestigationRecord {
    pub id: Uuid,
    pub phone_number: String,
    pub status: RecordStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    pub successful_modules: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Query filter; `None` fields match everything
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordFilter {
    pub phone_number: Option<String>,
    pub status: Option<RecordStatus>,
}

impl RecordFilter {
    pub fn matches(&self, record: &InvestigationRecord) -> bool {
        self.phone_number
            .as_deref()
            .map(|p| p == record.phone_number)
            .unwrap_or(true)
            && self.status.map(|s| s == record.status).unwrap_or(true)
    }
}

/// Persistence provider used by the orchestrator
pub trait InvestigationStore: Send + Sync {
    /// New `running` record; returns its id
    fn create(&self, phone: &PhoneNumber) -> AppResult<Uuid>;

    /// Mark a record finished with the bundle's outcome
    fn complete(&self, id: Uuid, bundle: &InvestigationBundle) -> AppResult<()>;

    /// Matching records, newest first
    fn query(&self, filter: &RecordFilter) -> AppResult<Vec<InvestigationRecord>>;
}

/// In-memory store keyed by record id
#[derive(Default)]
pub struct MemoryStore {
    records: DashMap<Uuid, InvestigationRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl InvestigationStore for MemoryStore {
    fn create(&self, phone: &PhoneNumber) -> AppResult<Uuid> {
        let now = Utc::now();
        let id = Uuid::new_v4();
        self.records.insert(
            id,
            InvestigationRecord {
                id,
                phone_number: phone.to_string(),
                status: RecordStatus::Running,
                risk_level: None,
                successful_modules: 0,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    fn complete(&self, id: Uuid, bundle: &InvestigationBundle) -> AppResult<()> {
        let mut record = self.records.get_mut(&id).ok_or_else(|| {
            AppError::new(ErrorCode::ApiNotFound, format!("Investigation {} not found", id))
        })?;
        record.status = bundle.status.into();
        record.risk_level = bundle.ai_analysis.as_ref().map(|a| a.risk_level);
        record.successful_modules = bundle.successful_modules();
        record.updated_at = Utc::now();
        Ok(())
    }

    fn query(&self, filter: &RecordFilter) -> AppResult<Vec<InvestigationRecord>> {
        let mut matching: Vec<InvestigationRecord> = self
            .records
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }
}
