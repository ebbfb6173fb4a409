//! Fake providers and a counting store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leadgate_common::{AggregateFraudResult, ConsentResult, LeadRecord};
use leadgate_ingest::clients::fraud_signal::evaluate;
use leadgate_ingest::clients::{
    CheckKind, ConsentError, ConsentProvider, FraudSignalError, FraudSignalProvider,
};
use leadgate_ingest::store::{LeadIndex, LeadStore, SqliteLeadStore, StoreError};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

use super::payloads::{clean_email, clean_ip, clean_phone};

/// In-memory SQLite store that counts writes and can be told to fail
pub struct CountingStore {
    inner: SqliteLeadStore,
    puts: AtomicUsize,
    fail_writes: AtomicBool,
    fail_queries: AtomicBool,
}

impl CountingStore {
    pub async fn new() -> Self {
        Self {
            inner: SqliteLeadStore::in_memory("leads")
                .await
                .expect("Failed to create in-memory store"),
            puts: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
            fail_queries: AtomicBool::new(false),
        }
    }

    /// Successful and failed `put` calls alike
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn fail_queries(&self) {
        self.fail_queries.store(true, Ordering::SeqCst);
    }

    pub async fn stored(&self) -> Vec<LeadRecord> {
        self.inner.scan_all().await.expect("scan failed")
    }
}

#[async_trait]
impl LeadStore for CountingStore {
    async fn put(&self, record: &LeadRecord) -> Result<(), StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        self.inner.put(record).await
    }

    async fn get(
        &self,
        id: Uuid,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<LeadRecord>, StoreError> {
        self.inner.get(id, timestamp).await
    }

    async fn query_by_index(
        &self,
        index: LeadIndex,
        key: &str,
    ) -> Result<Vec<LeadRecord>, StoreError> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner.query_by_index(index, key).await
    }

    async fn scan_all(&self) -> Result<Vec<LeadRecord>, StoreError> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner.scan_all().await
    }
}

enum FraudBehavior {
    Respond {
        ip: Value,
        phone: Value,
        email: Value,
    },
    Unreachable,
}

/// Fraud provider answering with scripted raw responses
pub struct FakeFraud {
    behavior: FraudBehavior,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeFraud {
    pub fn clean() -> Self {
        Self::responding(clean_ip(), clean_phone(), clean_email())
    }

    pub fn responding(ip: Value, phone: Value, email: Value) -> Self {
        Self {
            behavior: FraudBehavior::Respond { ip, phone, email },
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            behavior: FraudBehavior::Unreachable,
            ..Self::clean()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FraudSignalProvider for FakeFraud {
    async fn validate_all(
        &self,
        _ip_address: &str,
        _phone: &str,
        _email: &str,
    ) -> Result<AggregateFraudResult, FraudSignalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;

        match &self.behavior {
            FraudBehavior::Respond { ip, phone, email } => Ok(AggregateFraudResult::new(
                evaluate(CheckKind::Ip, ip.clone())?,
                evaluate(CheckKind::Phone, phone.clone())?,
                evaluate(CheckKind::Email, email.clone())?,
            )),
            FraudBehavior::Unreachable => Err(FraudSignalError::Network {
                check: CheckKind::Ip,
                message: "connection refused".to_string(),
            }),
        }
    }
}

/// Consent provider answering with a fixed verdict or failure
pub struct FakeConsent {
    answer: Result<ConsentResult, ConsentError>,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeConsent {
    pub fn success() -> Self {
        Self::answering(Ok(ConsentResult::new("success", "certificate matches lead")))
    }

    pub fn answering(answer: Result<ConsentResult, ConsentError>) -> Self {
        Self {
            answer,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConsentProvider for FakeConsent {
    async fn validate(
        &self,
        _cert_id: Option<&str>,
        _phone: &str,
    ) -> Result<ConsentResult, ConsentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.answer.clone()
    }
}
