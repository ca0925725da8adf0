//! Per-user spend accounting
//!
//! The ledger keeps a running total per user plus an append-only history of
//! billed provider calls. The authoritative cost of a generation is not
//! known synchronously; [`CostTracker`] asks the provider's billing endpoint
//! for it after settlement and writes the result here. Cost tracking is
//! best-effort by design: a failed lookup is logged and dropped, never
//! retried, and never surfaced to the end user.

mod schema;

pub use schema::{ChatUser, LedgerEntry, UserTotals, SCHEMA};

use crate::config::ConfigStore;
use chrono::Utc;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("cost lookup failed: {0}")]
    Lookup(String),
    #[error("billing endpoint not configured")]
    NotConfigured,
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Thread-safe ledger handle. The connection mutex plus a transaction per
/// write serializes concurrent updates to the same user row, so overlapping
/// requests from one user never lose an increment.
#[derive(Clone)]
pub struct Ledger {
    conn: Arc<Mutex<Connection>>,
}

impl Ledger {
    /// Open or create the ledger database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> LedgerResult<Self> {
        let conn = Connection::open(path)?;
        let ledger = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        ledger.run_migrations()?;
        Ok(ledger)
    }

    /// Open an in-memory ledger (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory()?;
        let ledger = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        ledger.run_migrations()?;
        Ok(ledger)
    }

    fn run_migrations(&self) -> LedgerResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Record one billed call: upsert the user's running totals and append
    /// the history row inside a single transaction so the two never diverge.
    pub fn record(&self, entry: &LedgerEntry) -> LedgerResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        let user = &entry.user;

        let exists = tx
            .query_row(
                "SELECT 1 FROM user_statistics WHERE user_id = ?1",
                params![user.id],
                |_| Ok(()),
            )
            .map(|()| true)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(false),
                other => Err(other),
            })?;

        if exists {
            tx.execute(
                "UPDATE user_statistics
                 SET username = ?1,
                     first_name = ?2,
                     last_name = ?3,
                     total_spent = total_spent + ?4,
                     total_requests = total_requests + 1,
                     last_request_date = ?5
                 WHERE user_id = ?6",
                params![
                    user.username,
                    user.first_name,
                    user.last_name,
                    entry.cost,
                    now,
                    user.id
                ],
            )?;
        } else {
            tx.execute(
                "INSERT INTO user_statistics
                 (user_id, username, first_name, last_name, total_spent, total_requests,
                  last_request_date, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6)",
                params![
                    user.id,
                    user.username,
                    user.first_name,
                    user.last_name,
                    entry.cost,
                    now
                ],
            )?;
        }

        tx.execute(
            "INSERT INTO request_history
             (user_id, generation_id, command, cost, model, tokens_prompt,
              tokens_completion, request_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                user.id,
                entry.generation_id,
                entry.command,
                entry.cost,
                entry.model,
                entry.tokens_prompt,
                entry.tokens_completion,
                now
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// All users ordered by spend, highest first.
    pub fn user_statistics(&self) -> LedgerResult<Vec<UserTotals>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT user_id, username, first_name, last_name, total_spent, total_requests
             FROM user_statistics
             ORDER BY total_spent DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(UserTotals {
                user_id: row.get(0)?,
                username: row.get(1)?,
                first_name: row.get(2)?,
                last_name: row.get(3)?,
                total_spent: row.get(4)?,
                total_requests: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Running totals for one user, if any call has been billed.
    #[allow(dead_code)] // Used in tests
    pub fn user_totals(&self, user_id: i64) -> LedgerResult<Option<UserTotals>> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT user_id, username, first_name, last_name, total_spent, total_requests
             FROM user_statistics WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(UserTotals {
                    user_id: row.get(0)?,
                    username: row.get(1)?,
                    first_name: row.get(2)?,
                    last_name: row.get(3)?,
                    total_spent: row.get(4)?,
                    total_requests: row.get(5)?,
                })
            },
        );
        match result {
            Ok(totals) => Ok(Some(totals)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// History row count for one user.
    #[allow(dead_code)] // Used in tests
    pub fn history_count(&self, user_id: i64) -> LedgerResult<i64> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM request_history WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?)
    }
}

/// Credits snapshot from the provider's billing endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct Balance {
    pub total_credits: f64,
    pub total_usage: f64,
    pub remaining: f64,
}

#[derive(Debug, Deserialize)]
struct LookupEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct GenerationData {
    #[serde(default)]
    total_cost: f64,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    tokens_prompt: i64,
    #[serde(default)]
    tokens_completion: i64,
}

#[derive(Debug, Deserialize)]
struct CreditsData {
    #[serde(default)]
    total_credits: f64,
    #[serde(default)]
    total_usage: f64,
}

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Looks up the billed cost of a settled generation and writes it to the
/// ledger. Invoked fire-and-forget after each call that yields a
/// generation id, including billed failures.
pub struct CostTracker {
    config: Arc<ConfigStore>,
    ledger: Ledger,
    client: reqwest::Client,
}

impl CostTracker {
    pub fn new(config: Arc<ConfigStore>, ledger: Ledger) -> Self {
        let client = reqwest::Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            config,
            ledger,
            client,
        }
    }

    /// Record the cost of one generation. Any failure is logged and
    /// dropped; a missed cost update is an accepted data-loss mode.
    pub async fn track(&self, generation_id: &str, user: &ChatUser, command: &str) {
        match self.try_track(generation_id, user, command).await {
            Ok(cost) => {
                tracing::info!(
                    generation_id,
                    user_id = user.id,
                    user = %user.display_name(),
                    command,
                    cost,
                    "cost recorded"
                );
            }
            Err(e) => {
                tracing::warn!(
                    generation_id,
                    user_id = user.id,
                    command,
                    error = %e,
                    "cost tracking dropped"
                );
            }
        }
    }

    async fn try_track(
        &self,
        generation_id: &str,
        user: &ChatUser,
        command: &str,
    ) -> LedgerResult<f64> {
        let billing = self.config.billing().ok_or(LedgerError::NotConfigured)?;

        let response = self
            .client
            .get(&billing.url)
            .query(&[("id", generation_id)])
            .header("Authorization", format!("Bearer {}", billing.key))
            .send()
            .await
            .map_err(|e| LedgerError::Lookup(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LedgerError::Lookup(format!("HTTP {status}")));
        }

        let lookup: LookupEnvelope<GenerationData> = response
            .json()
            .await
            .map_err(|e| LedgerError::Lookup(e.to_string()))?;

        let entry = LedgerEntry {
            user: user.clone(),
            generation_id: generation_id.to_string(),
            command: command.to_string(),
            cost: lookup.data.total_cost,
            model: lookup.data.model.unwrap_or_else(|| "unknown".to_string()),
            tokens_prompt: lookup.data.tokens_prompt,
            tokens_completion: lookup.data.tokens_completion,
        };
        self.ledger.record(&entry)?;
        Ok(entry.cost)
    }

    /// Remaining provider credits for the balance report.
    pub async fn balance(&self) -> LedgerResult<Balance> {
        let billing = self.config.billing().ok_or(LedgerError::NotConfigured)?;
        let credits_url = billing.credits_url.ok_or(LedgerError::NotConfigured)?;

        let response = self
            .client
            .get(&credits_url)
            .header("Authorization", format!("Bearer {}", billing.key))
            .send()
            .await
            .map_err(|e| LedgerError::Lookup(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LedgerError::Lookup(format!("HTTP {status}")));
        }

        let lookup: LookupEnvelope<CreditsData> = response
            .json()
            .await
            .map_err(|e| LedgerError::Lookup(e.to_string()))?;

        Ok(Balance {
            total_credits: lookup.data.total_credits,
            total_usage: lookup.data.total_usage,
            remaining: lookup.data.total_credits - lookup.data.total_usage,
        })
    }
}
