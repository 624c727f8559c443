//! Store port consumed by the orchestrator.
//!
//! The orchestrator holds value snapshots of transactions, never a live
//! handle into storage; every mutation goes through one of the conditional
//! single-row updates below.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{NewTransaction, Transaction, TransactionStatus};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence seam for transactions.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Assigns `id` and `created_at`, persists the draft with status
    /// `PENDING` and returns the stored row.
    async fn create(&self, draft: &NewTransaction) -> StoreResult<Transaction>;

    async fn find_by_merchant_reference(&self, reference: &str) -> StoreResult<Transaction>;

    /// Moves `PENDING -> SUBMITTED`. Returns whether the write applied;
    /// `false` means the row was no longer `PENDING`.
    async fn mark_submitted(&self, id: Uuid) -> StoreResult<bool>;

    /// Writes a terminal status, but only while the current status is
    /// non-terminal. Returns whether the write applied; `false` means a
    /// concurrent reconciler already finished the transaction. Callers
    /// must pass a terminal status.
    async fn finish_if_active(&self, id: Uuid, status: TransactionStatus) -> StoreResult<bool>;

    /// Records the gateway's tracking id. Write-once: a second call on the
    /// same row is a no-op.
    async fn set_gateway_tracking_id(&self, id: Uuid, tracking_id: &str) -> StoreResult<()>;

    /// All transactions, most recently created first.
    async fn list_all(&self) -> StoreResult<Vec<Transaction>>;
}
