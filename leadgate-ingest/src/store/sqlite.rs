//! SQLite-backed lead store
//!
//! Each lead is stored as its full JSON record alongside the key and index
//! columns:
//!
//! | column      | role                         |
//! |-------------|------------------------------|
//! | `id`        | primary key (with timestamp) |
//! | `timestamp` | primary key, RFC 3339 UTC    |
//! | `phone`     | `phone-index`                |
//! | `email`     | `email-index`                |
//! | `record`    | LeadRecord JSON              |

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use leadgate_common::config::validate_table_name;
use leadgate_common::LeadRecord;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{LeadIndex, LeadStore, StoreError};

/// SQLite lead store
#[derive(Clone)]
pub struct SqliteLeadStore {
    pool: SqlitePool,
    table: String,
}

impl SqliteLeadStore {
    /// Connect to `database_url` and create the table if missing
    pub async fn connect(database_url: &str, table: &str) -> Result<Self, StoreError> {
        tracing::debug!(table = %table, "Connecting to lead store");
        let pool = SqlitePool::connect(database_url).await?;
        Self::from_pool(pool, table).await
    }

    /// Private in-memory database on a single pooled connection
    pub async fn in_memory(table: &str) -> Result<Self, StoreError> {
        // Every new connection would see a fresh empty database, so the one
        // connection must never be recycled.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool, table).await
    }

    pub async fn from_pool(pool: SqlitePool, table: &str) -> Result<Self, StoreError> {
        validate_table_name(table)
            .map_err(|_| StoreError::InvalidTable(table.to_string()))?;

        let store = Self {
            pool,
            table: table.to_string(),
        };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        let table = &self.table;

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                phone TEXT NOT NULL,
                email TEXT NOT NULL,
                record TEXT NOT NULL,
                PRIMARY KEY (id, timestamp)
            )
            "#
        ))
        .execute(&self.pool)
        .await?;

        for index in [LeadIndex::Phone, LeadIndex::Email] {
            let column = index.key_field();
            sqlx::query(&format!(
                "CREATE INDEX IF NOT EXISTS {table}_{column}_index ON {table} ({column})"
            ))
            .execute(&self.pool)
            .await?;
        }

        tracing::info!(table = %table, "Lead store schema initialized");
        Ok(())
    }

    fn decode_all(rows: Vec<String>) -> Result<Vec<LeadRecord>, StoreError> {
        rows.iter()
            .map(|json| serde_json::from_str(json).map_err(StoreError::from))
            .collect()
    }
}

/// Primary-key text form of a creation timestamp
fn timestamp_key(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

#[async_trait]
impl LeadStore for SqliteLeadStore {
    async fn put(&self, record: &LeadRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)?;

        sqlx::query(&format!(
            "INSERT OR REPLACE INTO {} (id, timestamp, phone, email, record) VALUES (?, ?, ?, ?, ?)",
            self.table
        ))
        .bind(record.id.to_string())
        .bind(timestamp_key(record.timestamp))
        .bind(&record.phone)
        .bind(&record.email)
        .bind(json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(
        &self,
        id: Uuid,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<LeadRecord>, StoreError> {
        let row: Option<String> = sqlx::query_scalar(&format!(
            "SELECT record FROM {} WHERE id = ? AND timestamp = ?",
            self.table
        ))
        .bind(id.to_string())
        .bind(timestamp_key(timestamp))
        .fetch_optional(&self.pool)
        .await?;

        row.map(|json| serde_json::from_str(&json).map_err(StoreError::from))
            .transpose()
    }

    async fn query_by_index(
        &self,
        index: LeadIndex,
        key: &str,
    ) -> Result<Vec<LeadRecord>, StoreError> {
        let rows: Vec<String> = sqlx::query_scalar(&format!(
            "SELECT record FROM {} WHERE {} = ?",
            self.table,
            index.key_field()
        ))
        .bind(key)
        .fetch_all(&self.pool)
        .await?;

        Self::decode_all(rows)
    }

    async fn scan_all(&self) -> Result<Vec<LeadRecord>, StoreError> {
        let rows: Vec<String> = sqlx::query_scalar(&format!("SELECT record FROM {}", self.table))
            .fetch_all(&self.pool)
            .await?;

        Self::decode_all(rows)
    }
}
