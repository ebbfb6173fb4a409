//! Lead persistence
//!
//! Key-value store keyed by `(id, timestamp)` with secondary lookups by
//! phone and by email. The store enforces no uniqueness; duplicate
//! rejection is pipeline policy.

mod sqlite;

pub use sqlite::SqliteLeadStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leadgate_common::LeadRecord;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Records written per chunk by [`LeadStore::put_batch`]
pub const BATCH_WRITE_SIZE: usize = 25;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connectivity or query failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored record could not be encoded or decoded
    #[error("Record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Table name is not a plain SQL identifier
    #[error("Invalid table name: {0}")]
    InvalidTable(String),

    /// Unknown secondary index name
    #[error("Unknown index: {0}")]
    UnknownIndex(String),
}

/// Secondary indexes over stored leads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadIndex {
    Phone,
    Email,
}

impl LeadIndex {
    pub fn name(self) -> &'static str {
        match self {
            LeadIndex::Phone => "phone-index",
            LeadIndex::Email => "email-index",
        }
    }

    /// Record attribute the index is keyed on
    pub fn key_field(self) -> &'static str {
        match self {
            LeadIndex::Phone => "phone",
            LeadIndex::Email => "email",
        }
    }
}

impl fmt::Display for LeadIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LeadIndex {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "phone-index" => Ok(LeadIndex::Phone),
            "email-index" => Ok(LeadIndex::Email),
            other => Err(StoreError::UnknownIndex(other.to_string())),
        }
    }
}

/// Lead store contract
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Write unconditionally, replacing any record with the same key
    async fn put(&self, record: &LeadRecord) -> Result<(), StoreError>;

    /// Point read by primary key
    async fn get(
        &self,
        id: Uuid,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<LeadRecord>, StoreError>;

    /// Records whose indexed attribute equals `key`; empty when none match
    async fn query_by_index(
        &self,
        index: LeadIndex,
        key: &str,
    ) -> Result<Vec<LeadRecord>, StoreError>;

    /// Every stored record, unordered
    async fn scan_all(&self) -> Result<Vec<LeadRecord>, StoreError>;

    /// Bulk insert in chunks of [`BATCH_WRITE_SIZE`]
    async fn put_batch(&self, records: &[LeadRecord]) -> Result<(), StoreError> {
        for chunk in records.chunks(BATCH_WRITE_SIZE) {
            for record in chunk {
                self.put(record).await?;
            }
            tracing::debug!(written = chunk.len(), "Batch chunk written");
        }
        Ok(())
    }
}
