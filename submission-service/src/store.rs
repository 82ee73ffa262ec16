//! Persistence for wallet submissions.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;

use allowlist_common::Address;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::WalletSubmission;

const CREATE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS wallet_submissions (
        id SERIAL PRIMARY KEY,
        address TEXT NOT NULL UNIQUE,
        submitted_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )";

const UPSERT: &str = "
    INSERT INTO wallet_submissions (address)
    VALUES ($1)
    ON CONFLICT (address) DO UPDATE SET submitted_at = NOW()
    RETURNING submitted_at";

const LIST: &str = "
    SELECT address, submitted_at
    FROM wallet_submissions
    ORDER BY submitted_at DESC";

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Create the backing table when it does not exist yet.
    async fn initialize(&self) -> Result<()>;

    /// Insert `address`, or refresh its timestamp when already present.
    /// Returns the stored submission time.
    async fn upsert(&self, address: &Address) -> Result<DateTime<Utc>>;

    /// All submissions, newest first.
    async fn list(&self) -> Result<Vec<WalletSubmission>>;
}

pub struct PgSubmissionStore {
    pool: PgPool,
}

impl PgSubmissionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens the shared pool described by `config`. The pool connects
    /// lazily; the first query surfaces connection problems.
    pub fn connect(config: &Config) -> Result<Self> {
        let options = PgConnectOptions::from_str(&config.database_url)?.ssl_mode(config.ssl_mode);
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_lazy_with(options);
        Ok(Self::new(pool))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl SubmissionStore for PgSubmissionStore {
    async fn initialize(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    async fn upsert(&self, address: &Address) -> Result<DateTime<Utc>> {
        let submitted_at: DateTime<Utc> = sqlx::query_scalar(UPSERT)
            .bind(address.to_lower_hex())
            .fetch_one(&self.pool)
            .await?;
        Ok(submitted_at)
    }

    async fn list(&self) -> Result<Vec<WalletSubmission>> {
        let rows = sqlx::query_as::<_, WalletSubmission>(LIST)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

/// Process-local store with the same upsert semantics as the table.
#[derive(Default)]
pub struct MemorySubmissionStore {
    rows: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl MemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SubmissionStore for MemorySubmissionStore {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, address: &Address) -> Result<DateTime<Utc>> {
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| Error::InternalError("submission store lock poisoned".to_string()))?;
        let now = Utc::now();
        rows.insert(address.to_lower_hex(), now);
        Ok(now)
    }

    async fn list(&self) -> Result<Vec<WalletSubmission>> {
        let rows = self
            .rows
            .lock()
            .map_err(|_| Error::InternalError("submission store lock poisoned".to_string()))?;
        let mut submissions: Vec<WalletSubmission> = rows
            .iter()
            .map(|(address, submitted_at)| WalletSubmission {
                address: address.clone(),
                submitted_at: *submitted_at,
            })
            .collect();
        submissions.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(submissions)
    }
}
